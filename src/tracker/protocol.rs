//! Bencoded wire types for the `/announce` endpoint, plus the percent-coding
//! helper `info_hash` needs on the GET path (§4.2 of the design).
use super::registry::PeerRecord;
use super::{TrackerError, TrackerResult};
use crate::bencode::{self, BencodeValue};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Started,
    Stopped,
    Completed,
}

impl Event {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Event::Started),
            1 => Some(Event::Stopped),
            2 => Some(Event::Completed),
            _ => None,
        }
    }

    pub fn as_i64(self) -> i64 {
        match self {
            Event::Started => 0,
            Event::Stopped => 1,
            Event::Completed => 2,
        }
    }
}

impl Default for Event {
    fn default() -> Self {
        Event::Started
    }
}

/// A parsed `/announce` request, regardless of whether it arrived as GET
/// query parameters or a bencoded POST body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceRequest {
    pub info_hash: [u8; 20],
    pub peer_id: String,
    pub ip: String,
    pub port: u16,
    pub event: Event,
    /// True for a seeder registering itself (POST); false for a leecher
    /// announce (GET).
    pub is_seeder: bool,
}

impl AnnounceRequest {
    pub fn to_bencode(&self) -> Vec<u8> {
        let mut dict = BTreeMap::new();
        dict.insert(
            b"info_hash".to_vec(),
            BencodeValue::String(self.info_hash.to_vec()),
        );
        dict.insert(
            b"peer_id".to_vec(),
            BencodeValue::String(self.peer_id.clone().into_bytes()),
        );
        dict.insert(b"ip".to_vec(), BencodeValue::String(self.ip.clone().into_bytes()));
        dict.insert(b"port".to_vec(), BencodeValue::Integer(self.port as i64));
        dict.insert(b"event".to_vec(), BencodeValue::Integer(self.event.as_i64()));
        bencode::encode_value(&BencodeValue::Dict(dict))
    }

    /// Parses a POST body. `ip`/`port` in the body are the seeder's own
    /// externally-reachable address, not derived from the TCP connection.
    pub fn from_post_body(bytes: &[u8]) -> TrackerResult<Self> {
        let value = bencode::decode_tolerant(bytes)?;
        let dict = value
            .as_dict()
            .ok_or_else(|| TrackerError::InvalidField("root is not a dictionary".to_string()))?;

        let info_hash_bytes = dict
            .get(&b"info_hash".to_vec())
            .and_then(BencodeValue::as_str_bytes)
            .ok_or_else(|| TrackerError::MissingField("info_hash".to_string()))?;
        if info_hash_bytes.len() != 20 {
            return Err(TrackerError::InvalidField("info_hash must be 20 bytes".to_string()));
        }
        let mut info_hash = [0u8; 20];
        info_hash.copy_from_slice(info_hash_bytes);

        let peer_id = dict
            .get(&b"peer_id".to_vec())
            .and_then(BencodeValue::as_str_bytes)
            .ok_or_else(|| TrackerError::MissingField("peer_id".to_string()))?;
        let peer_id = String::from_utf8_lossy(peer_id).into_owned();

        let ip = dict
            .get(&b"ip".to_vec())
            .and_then(BencodeValue::as_str_bytes)
            .ok_or_else(|| TrackerError::MissingField("ip".to_string()))?;
        let ip = String::from_utf8_lossy(ip).into_owned();

        let port = dict
            .get(&b"port".to_vec())
            .and_then(BencodeValue::as_integer)
            .ok_or_else(|| TrackerError::MissingField("port".to_string()))?;

        let event = dict
            .get(&b"event".to_vec())
            .and_then(BencodeValue::as_integer)
            .map(Event::from_i64)
            .unwrap_or(Some(Event::Started))
            .ok_or_else(|| TrackerError::InvalidField("event out of range".to_string()))?;

        Ok(AnnounceRequest {
            info_hash,
            peer_id,
            ip,
            port: port as u16,
            event,
            is_seeder: true,
        })
    }
}

/// Encodes a percent-encoded byte-by-byte value the way the GET query
/// string carries `info_hash`: unreserved characters pass through literally,
/// everything else becomes `%XX`.
pub fn percent_encode_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for &byte in bytes {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Decodes a percent-encoded query value back into raw bytes, without
/// assuming the result is valid UTF-8.
pub fn percent_decode_bytes(value: &str) -> Vec<u8> {
    let input = value.as_bytes();
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] == b'%' && i + 2 < input.len() {
            if let Ok(byte) = u8::from_str_radix(std::str::from_utf8(&input[i + 1..i + 3]).unwrap_or(""), 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(input[i]);
        i += 1;
    }
    out
}

/// The bencoded response body: a list of current seeders for the requested
/// info-hash.
pub fn encode_announce_response(peers: &[PeerRecord]) -> Vec<u8> {
    let list = peers
        .iter()
        .map(|peer| {
            let mut dict = BTreeMap::new();
            dict.insert(
                b"peer_id".to_vec(),
                BencodeValue::String(peer.peer_id.clone().into_bytes()),
            );
            dict.insert(b"seeder".to_vec(), BencodeValue::Integer(peer.seeder as i64));
            dict.insert(b"ip".to_vec(), BencodeValue::String(peer.ip.clone().into_bytes()));
            dict.insert(b"port".to_vec(), BencodeValue::Integer(peer.port as i64));
            let last_announce = peer
                .last_announce
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs() as i64;
            dict.insert(b"last_announce".to_vec(), BencodeValue::Integer(last_announce));
            BencodeValue::Dict(dict)
        })
        .collect();

    let mut response = BTreeMap::new();
    response.insert(b"peers".to_vec(), BencodeValue::List(list));
    bencode::encode_value(&BencodeValue::Dict(response))
}

/// Parses a bencoded `/announce` response body into peer records. Used by
/// the leecher to turn the tracker's reply into dial candidates.
pub fn parse_announce_response(bytes: &[u8]) -> TrackerResult<Vec<PeerRecord>> {
    let value = bencode::decode_tolerant(bytes)?;
    let dict = value
        .as_dict()
        .ok_or_else(|| TrackerError::InvalidField("root is not a dictionary".to_string()))?;
    let list = dict
        .get(&b"peers".to_vec())
        .and_then(BencodeValue::as_list)
        .ok_or_else(|| TrackerError::MissingField("peers".to_string()))?;

    list.iter()
        .map(|entry| {
            let peer = entry
                .as_dict()
                .ok_or_else(|| TrackerError::InvalidField("peer entry is not a dictionary".to_string()))?;
            let peer_id = peer
                .get(&b"peer_id".to_vec())
                .and_then(BencodeValue::as_str_bytes)
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default();
            let ip = peer
                .get(&b"ip".to_vec())
                .and_then(BencodeValue::as_str_bytes)
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .ok_or_else(|| TrackerError::MissingField("peer.ip".to_string()))?;
            let port = peer
                .get(&b"port".to_vec())
                .and_then(BencodeValue::as_integer)
                .ok_or_else(|| TrackerError::MissingField("peer.port".to_string()))? as u16;
            let seeder = peer
                .get(&b"seeder".to_vec())
                .and_then(BencodeValue::as_integer)
                .map(|v| v != 0)
                .unwrap_or(true);

            Ok(PeerRecord {
                peer_id,
                seeder,
                ip,
                port,
                last_announce: SystemTime::now(),
            })
        })
        .collect()
}

/// Builds the GET `/announce` URL for a leecher announce.
pub fn build_announce_get_url(
    base: &str,
    info_hash: [u8; 20],
    peer_id: &str,
    port: u16,
    event: Event,
) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!(
        "{base}{separator}info_hash={}&peer_id={peer_id}&port={port}&event={}",
        percent_encode_bytes(&info_hash),
        event.as_i64(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_round_trip_preserves_arbitrary_bytes() {
        let raw: Vec<u8> = (0..=255u8).collect();
        let encoded = percent_encode_bytes(&raw);
        let decoded = percent_decode_bytes(&encoded);
        assert_eq!(raw, decoded);
    }

    #[test]
    fn post_body_round_trips() {
        let request = AnnounceRequest {
            info_hash: [3u8; 20],
            peer_id: "-GO0001-aabbccddeeff00112233".to_string(),
            ip: "203.0.113.5".to_string(),
            port: 6881,
            event: Event::Started,
            is_seeder: true,
        };
        let bytes = request.to_bencode();
        let parsed = AnnounceRequest::from_post_body(&bytes).unwrap();
        assert_eq!(request.info_hash, parsed.info_hash);
        assert_eq!(request.peer_id, parsed.peer_id);
        assert_eq!(request.ip, parsed.ip);
        assert_eq!(request.port, parsed.port);
        assert_eq!(request.event, parsed.event);
    }

    #[test]
    fn response_round_trips_through_encode_and_parse() {
        let peers = vec![PeerRecord {
            peer_id: "-GO0001-aabbccddeeff00112233".to_string(),
            seeder: true,
            ip: "198.51.100.7".to_string(),
            port: 6881,
            last_announce: SystemTime::now(),
        }];
        let bytes = encode_announce_response(&peers);
        let parsed = parse_announce_response(&bytes).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].ip, "198.51.100.7");
        assert_eq!(parsed[0].port, 6881);
        assert!(parsed[0].seeder);
    }

    #[test]
    fn announce_get_url_percent_encodes_only_the_info_hash() {
        let mut info_hash = [0u8; 20];
        info_hash[0] = 1;
        info_hash[19] = 255;
        let url = build_announce_get_url(
            "http://tracker.example:8080/announce",
            info_hash,
            "-GO0001-aabbccddeeff00112233",
            6881,
            Event::Started,
        );
        assert!(url.starts_with("http://tracker.example:8080/announce?info_hash="));
        assert!(url.contains("peer_id=-GO0001-aabbccddeeff00112233"));
        assert!(url.contains("port=6881"));
        assert!(url.contains("event=0"));
    }

    #[test]
    fn defaults_missing_event_to_started() {
        let mut dict = BTreeMap::new();
        dict.insert(b"info_hash".to_vec(), BencodeValue::String(vec![1u8; 20]));
        dict.insert(b"peer_id".to_vec(), BencodeValue::String(b"peer".to_vec()));
        dict.insert(b"ip".to_vec(), BencodeValue::String(b"1.2.3.4".to_vec()));
        dict.insert(b"port".to_vec(), BencodeValue::Integer(1234));
        let bytes = bencode::encode_value(&BencodeValue::Dict(dict));
        let parsed = AnnounceRequest::from_post_body(&bytes).unwrap();
        assert_eq!(parsed.event, Event::Started);
    }
}
