//! Info-hash computation: SHA-1 over the canonical bencoding of the `info`
//! sub-dictionary. This is the primary content identifier shared by the
//! tracker and peer protocols.
use crate::bencode::{self, BencodeValue};
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use tracing::instrument;

/// Computes the SHA-1 hash of a bencode-encoded `info` dictionary.
///
/// This function takes the torrent's info dictionary and:
/// 1. Encodes it into canonical bencode bytes.
/// 2. Calculates the SHA-1 hash of the encoded data.
/// 3. Returns the 20-byte hash as a fixed-size array.
///
/// Because [`BencodeValue::Dict`] is a `BTreeMap`, `bencode::encode` always
/// emits keys in sorted order — the caller does not need to sort anything
/// before calling this function, and the same bytes are produced regardless
/// of how the dictionary was built.
///
/// # Arguments
/// * `info_dict` - The `info` sub-dictionary of a torrent descriptor.
///
/// # Returns
/// * `[u8; 20]` - The SHA-1 digest of the dictionary's canonical bencoding.
///
/// # Example
/// ```ignore
/// let info_dict = BTreeMap::new();
/// let hash = info_hash(&info_dict);
/// assert_eq!(hash.len(), 20);
/// ```
#[instrument(skip(info_dict), level = "debug")]
pub fn info_hash(info_dict: &BTreeMap<Vec<u8>, BencodeValue>) -> [u8; 20] {
    let encoded = bencode::encode_value(&BencodeValue::Dict(info_dict.clone()));
    let digest = Sha1::digest(&encoded);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_hash_is_stable_under_key_insertion_order() {
        let mut a = BTreeMap::new();
        a.insert(b"name".to_vec(), BencodeValue::String(b"x".to_vec()));
        a.insert(b"length".to_vec(), BencodeValue::Integer(10));

        let mut b = BTreeMap::new();
        b.insert(b"length".to_vec(), BencodeValue::Integer(10));
        b.insert(b"name".to_vec(), BencodeValue::String(b"x".to_vec()));

        assert_eq!(info_hash(&a), info_hash(&b));
    }
}
