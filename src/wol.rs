//! UDP broadcast transmitter for Wake-on-LAN magic packets.

use crate::machine::{self, MachineError};
use crate::packet;
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use thiserror::Error;

/// Discard port, the conventional WoL destination.
const WOL_PORT: u16 = 9;

#[derive(Error, Debug)]
pub enum WolError {
    #[error("invalid MAC address")]
    InvalidMac(#[source] MachineError),
    #[error("invalid broadcast address '{0}'")]
    InvalidBroadcast(String),
    #[error("failed to open UDP socket")]
    TransportUnavailable(#[source] io::Error),
    #[error("failed to send magic packet to {broadcast}")]
    SendFailed {
        broadcast: String,
        #[source]
        source: io::Error,
    },
}

/// Something that can emit a magic packet for a MAC on a broadcast
/// address. The UDP implementation is the only production one; tests
/// substitute recording fakes.
pub trait WolSender: Send + Sync {
    fn send(&self, mac: &str, broadcast: &str) -> Result<(), WolError>;
}

/// Sends magic packets as real UDP broadcasts from an ephemeral port.
#[derive(Debug, Default)]
pub struct UdpWolSender;

impl UdpWolSender {
    pub fn new() -> Self {
        UdpWolSender
    }
}

impl WolSender for UdpWolSender {
    /// Sends a single magic packet to `<broadcast>:9`. The MAC and
    /// broadcast address are re-validated here so the sender stays
    /// usable on its own, independent of registry validation.
    fn send(&self, mac: &str, broadcast: &str) -> Result<(), WolError> {
        let mac_bytes =
            machine::parse_mac(&machine::normalize_mac(mac)).map_err(WolError::InvalidMac)?;
        let dest_ip: Ipv4Addr = broadcast
            .parse()
            .map_err(|_| WolError::InvalidBroadcast(broadcast.to_string()))?;

        let data = packet::build_magic_packet(mac_bytes);

        // Unconnected socket on an ephemeral port; dropped on every
        // exit path.
        let socket =
            UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).map_err(WolError::TransportUnavailable)?;
        socket
            .set_broadcast(true)
            .map_err(WolError::TransportUnavailable)?;

        socket
            .send_to(&data, SocketAddrV4::new(dest_ip, WOL_PORT))
            .map_err(|e| WolError::SendFailed {
                broadcast: broadcast.to_string(),
                source: e,
            })?;
        Ok(())
    }
}
