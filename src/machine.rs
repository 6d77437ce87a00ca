use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use thiserror::Error;

/// A network machine that can be woken via WoL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub id: String,
    pub name: String,
    pub mac: String,
    pub broadcast: String,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MachineError {
    #[error("machine ID cannot be empty")]
    EmptyId,
    #[error("machine name cannot be empty")]
    EmptyName,
    #[error("MAC address '{0}' must be in XX:XX:XX:XX:XX:XX or XX-XX-XX-XX-XX-XX form")]
    InvalidMac(String),
    #[error("broadcast address '{0}' must be an IPv4 address")]
    InvalidBroadcast(String),
}

impl Machine {
    /// Checks that the machine is wakeable: non-empty identity and
    /// syntactically valid MAC and broadcast addresses.
    pub fn validate(&self) -> Result<(), MachineError> {
        if self.id.is_empty() {
            return Err(MachineError::EmptyId);
        }
        if self.name.is_empty() {
            return Err(MachineError::EmptyName);
        }
        validate_mac(&self.mac)?;
        validate_broadcast(&self.broadcast)?;
        Ok(())
    }

    /// Canonical colon-separated uppercase form of the MAC address.
    pub fn normalized_mac(&self) -> String {
        normalize_mac(&self.mac)
    }
}

/// Normalizes a MAC address to colon-separated uppercase form.
pub fn normalize_mac(mac: &str) -> String {
    mac.to_uppercase().replace('-', ":")
}

/// Parses a MAC address into its six raw bytes. Accepts colon- or
/// dash-separated hex pairs, but not a mix of the two.
pub fn parse_mac(mac: &str) -> Result<[u8; 6], MachineError> {
    let bytes = mac.as_bytes();
    if bytes.len() != 17 {
        return Err(MachineError::InvalidMac(mac.to_string()));
    }
    let sep = bytes[2];
    if sep != b':' && sep != b'-' {
        return Err(MachineError::InvalidMac(mac.to_string()));
    }
    let mut out = [0u8; 6];
    for i in 0..6 {
        if i < 5 && bytes[i * 3 + 2] != sep {
            return Err(MachineError::InvalidMac(mac.to_string()));
        }
        let hi = hex_val(bytes[i * 3]);
        let lo = hex_val(bytes[i * 3 + 1]);
        match (hi, lo) {
            (Some(hi), Some(lo)) => out[i] = hi << 4 | lo,
            _ => return Err(MachineError::InvalidMac(mac.to_string())),
        }
    }
    Ok(out)
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Validates a MAC address's format without keeping the parsed bytes.
pub fn validate_mac(mac: &str) -> Result<(), MachineError> {
    parse_mac(mac).map(|_| ())
}

/// Validates a broadcast address. Only IPv4 dotted quads are accepted;
/// IPv6 literals are rejected.
pub fn validate_broadcast(broadcast: &str) -> Result<(), MachineError> {
    broadcast
        .parse::<Ipv4Addr>()
        .map(|_| ())
        .map_err(|_| MachineError::InvalidBroadcast(broadcast.to_string()))
}
