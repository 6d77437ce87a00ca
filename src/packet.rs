//! Wake-on-LAN magic packet layout.

const SYNCHRONIZATION_STREAM: [u8; 6] = [0xff; 6];

/// Size of a magic packet: 6 bytes of 0xFF plus the MAC repeated 16 times.
pub const MAGIC_PACKET_LEN: usize = 102;

/// Builds the magic packet for the given hardware address.
pub fn build_magic_packet(mac: [u8; 6]) -> [u8; MAGIC_PACKET_LEN] {
    let mut packet = [0u8; MAGIC_PACKET_LEN];
    packet[..6].copy_from_slice(&SYNCHRONIZATION_STREAM);
    for i in 0..16 {
        packet[6 + i * 6..12 + i * 6].copy_from_slice(&mac);
    }
    packet
}
