//! Peer-id generation and the textual-to-wire truncation this system uses
//! instead of the canonical 20 raw bytes (§3 of the design).
use crate::config::PEER_ID_PREFIX;
use rand::RngCore;

/// Generates a peer-id of the form `-GO0001-` followed by 12 random bytes
/// hex-encoded as 24 characters, for a 32-character textual peer-id.
pub fn generate_peer_id() -> String {
    let mut random_bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut random_bytes);
    format!("{PEER_ID_PREFIX}{}", hex::encode(random_bytes))
}

/// Truncates (or zero-pads) the textual peer-id to the 20 bytes carried in
/// the handshake. Both sides of this system MUST apply the same rule: take
/// the first 20 ASCII bytes of the 32-character string.
pub fn peer_id_wire_bytes(peer_id: &str) -> [u8; 20] {
    let bytes = peer_id.as_bytes();
    let mut out = [0u8; 20];
    let n = bytes.len().min(20);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}
