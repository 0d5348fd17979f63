//! Single-file torrent descriptor: the bencoded metadata container described
//! in §3 of the design, plus the piece-accounting helpers the peer engine
//! needs (piece count, piece size, piece hash lookup).
use super::{TorrentError, TorrentResult};
use crate::bencode::{self, BencodeValue};
use std::collections::BTreeMap;

#[derive(Debug, PartialEq, Clone)]
pub struct TorrentDescriptor {
    pub announce: String,
    pub info: InfoDict,
}

#[derive(Debug, PartialEq, Clone)]
pub struct InfoDict {
    pub name: String,
    pub length: u64,
    pub piece_length: u32,
    /// Concatenated 20-byte SHA-1 digests, one per piece.
    pub pieces: Vec<u8>,
}

fn get_string(dict: &BTreeMap<Vec<u8>, BencodeValue>, key: &str) -> TorrentResult<String> {
    match dict.get(key.as_bytes()) {
        Some(BencodeValue::String(s)) => String::from_utf8(s.clone())
            .map_err(|e| TorrentError::InvalidFormat(format!("{key} is not UTF-8: {e}"))),
        Some(_) => Err(TorrentError::InvalidFormat(format!("{key} is not a string"))),
        None => Err(TorrentError::MissingField(key.to_string())),
    }
}

fn get_integer(dict: &BTreeMap<Vec<u8>, BencodeValue>, key: &str) -> TorrentResult<i64> {
    match dict.get(key.as_bytes()) {
        Some(BencodeValue::Integer(i)) => Ok(*i),
        Some(_) => Err(TorrentError::InvalidFormat(format!("{key} is not an integer"))),
        None => Err(TorrentError::MissingField(key.to_string())),
    }
}

impl InfoDict {
    fn to_bencode(&self) -> BTreeMap<Vec<u8>, BencodeValue> {
        let mut dict = BTreeMap::new();
        dict.insert(b"name".to_vec(), BencodeValue::String(self.name.clone().into_bytes()));
        dict.insert(b"length".to_vec(), BencodeValue::Integer(self.length as i64));
        dict.insert(
            b"piece length".to_vec(),
            BencodeValue::Integer(self.piece_length as i64),
        );
        dict.insert(b"pieces".to_vec(), BencodeValue::String(self.pieces.clone()));
        dict
    }

    fn from_bencode(dict: &BTreeMap<Vec<u8>, BencodeValue>) -> TorrentResult<Self> {
        let name = get_string(dict, "name")?;
        let length = get_integer(dict, "length")?;
        if length < 0 {
            return Err(TorrentError::InvalidFormat("length is negative".to_string()));
        }
        let piece_length = get_integer(dict, "piece length")?;
        if piece_length <= 0 {
            return Err(TorrentError::InvalidFormat(
                "piece length must be positive".to_string(),
            ));
        }
        let pieces = match dict.get(&b"pieces".to_vec()) {
            Some(BencodeValue::String(s)) => s.clone(),
            Some(_) => return Err(TorrentError::InvalidFormat("pieces is not a string".to_string())),
            None => return Err(TorrentError::MissingField("pieces".to_string())),
        };
        if pieces.len() % 20 != 0 {
            return Err(TorrentError::InvalidPiecesHashLength);
        }

        Ok(InfoDict {
            name,
            length: length as u64,
            piece_length: piece_length as u32,
            pieces,
        })
    }
}

impl TorrentDescriptor {
    pub fn new(announce: String, info: InfoDict) -> Self {
        Self { announce, info }
    }

    /// Parses a bencoded torrent file into a descriptor, rejecting anything
    /// but an `http`/`https` announce URL.
    pub fn parse(bytes: &[u8]) -> TorrentResult<Self> {
        let value = bencode::decode(bytes)?;
        let dict = match value {
            BencodeValue::Dict(d) => d,
            _ => return Err(TorrentError::InvalidFormat("root is not a dictionary".to_string())),
        };

        let announce = get_string(&dict, "announce")?;
        let scheme = url::Url::parse(&announce)?;
        if scheme.scheme() != "http" && scheme.scheme() != "https" {
            return Err(TorrentError::UnsupportedScheme(scheme.scheme().to_string()));
        }

        let info_value = dict
            .get(&b"info".to_vec())
            .ok_or_else(|| TorrentError::MissingField("info".to_string()))?;
        let info_dict = match info_value {
            BencodeValue::Dict(d) => d,
            _ => return Err(TorrentError::InvalidFormat("info is not a dictionary".to_string())),
        };
        let info = InfoDict::from_bencode(info_dict)?;

        Ok(TorrentDescriptor { announce, info })
    }

    /// Encodes the descriptor back to its bencoded byte representation.
    pub fn to_bencode(&self) -> Vec<u8> {
        let mut dict = BTreeMap::new();
        dict.insert(
            b"announce".to_vec(),
            BencodeValue::String(self.announce.clone().into_bytes()),
        );
        dict.insert(b"info".to_vec(), BencodeValue::Dict(self.info.to_bencode()));
        bencode::encode_value(&BencodeValue::Dict(dict))
    }

    /// The `info` sub-dictionary in bencode form, as fed to info-hash
    /// computation and nowhere else — this is the one place the two must
    /// stay byte-identical.
    pub fn info_bencode(&self) -> BTreeMap<Vec<u8>, BencodeValue> {
        self.info.to_bencode()
    }

    pub fn info_hash(&self) -> [u8; 20] {
        super::info_hash(&self.info_bencode())
    }

    pub fn num_pieces(&self) -> usize {
        self.info.pieces.len() / 20
    }

    pub fn piece_hash(&self, index: usize) -> Option<[u8; 20]> {
        let start = index.checked_mul(20)?;
        let end = start.checked_add(20)?;
        let slice = self.info.pieces.get(start..end)?;
        let mut hash = [0u8; 20];
        hash.copy_from_slice(slice);
        Some(hash)
    }

    /// Size in bytes of piece `index`; the last piece may be shorter than
    /// `piece_length`.
    pub fn piece_size(&self, index: usize) -> u64 {
        let num_pieces = self.num_pieces();
        if index >= num_pieces {
            return 0;
        }
        if index < num_pieces - 1 {
            self.info.piece_length as u64
        } else {
            let full = (num_pieces - 1) as u64 * self.info.piece_length as u64;
            self.info.length.saturating_sub(full)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TorrentDescriptor {
        let pieces: Vec<u8> = (0..60).map(|i| i as u8).collect();
        TorrentDescriptor::new(
            "http://tracker.example:8080/announce".to_string(),
            InfoDict {
                name: "file.bin".to_string(),
                length: 40,
                piece_length: 16,
                pieces,
            },
        )
    }

    #[test]
    fn piece_count_matches_ceiling_division() {
        let t = sample();
        assert_eq!(t.num_pieces(), 3);
        assert_eq!(t.piece_size(0), 16);
        assert_eq!(t.piece_size(1), 16);
        assert_eq!(t.piece_size(2), 8);
    }

    #[test]
    fn round_trips_through_bencode() {
        let t = sample();
        let bytes = t.to_bencode();
        let parsed = TorrentDescriptor::parse(&bytes).unwrap();
        assert_eq!(t, parsed);
        assert_eq!(t.info_hash(), parsed.info_hash());
    }

    #[test]
    fn rejects_udp_announce() {
        let mut t = sample();
        t.announce = "udp://tracker.example:80/announce".to_string();
        let bytes = t.to_bencode();
        assert!(matches!(
            TorrentDescriptor::parse(&bytes),
            Err(TorrentError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn rejects_misaligned_pieces_length() {
        let mut t = sample();
        t.info.pieces.push(0);
        let bytes = t.to_bencode();
        assert!(matches!(
            TorrentDescriptor::parse(&bytes),
            Err(TorrentError::InvalidPiecesHashLength)
        ));
    }
}
