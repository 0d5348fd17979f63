//! Bencode codec: the core data structure and error type for the BitTorrent
//! ASCII-framed binary serialization format used by torrent descriptors and
//! the tracker's announce protocol.
//!
//! Bencode is commonly used in the BitTorrent protocol for encoding metadata.
//! A [`BencodeValue`] is one of four variants:
//!
//! - `String(Vec<u8>)`: a byte string, e.g. `"4:spam"` decodes to `String(b"spam")`.
//! - `Integer(i64)`: e.g. `"i42e"` decodes to `Integer(42)`.
//! - `List(Vec<BencodeValue>)`: e.g. `"l4:spami42ee"` decodes to `List([String(b"spam"), Integer(42)])`.
//! - `Dict(BTreeMap<Vec<u8>, BencodeValue>)`: e.g. `"d3:foo3:bare"` decodes to `Dict({b"foo" => String(b"bar")})`.
//!
//! `Dict` is backed by a `BTreeMap` rather than a hash map so that key order
//! is always lexicographic by construction: the canonical-encoding invariant
//! (§4.1 of the design) holds structurally instead of needing a sort pass at
//! every call site that encodes a dictionary.
use std::collections::BTreeMap;
use thiserror::Error;

pub mod decode;
pub mod encode;

pub use decode::{decode, decode_tolerant};
pub use encode::encode as encode_value;

#[derive(Debug, PartialEq, Clone)]
pub enum BencodeValue {
    String(Vec<u8>),
    Integer(i64),
    List(Vec<BencodeValue>),
    Dict(BTreeMap<Vec<u8>, BencodeValue>),
}

impl BencodeValue {
    pub fn as_str_bytes(&self) -> Option<&[u8]> {
        match self {
            BencodeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            BencodeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<Vec<u8>, BencodeValue>> {
        match self {
            BencodeValue::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[BencodeValue]> {
        match self {
            BencodeValue::List(l) => Some(l),
            _ => None,
        }
    }
}

/// Custom error type for Bencode operations.
#[derive(Debug, Error)]
pub enum BencodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid bencode format: {0}")]
    InvalidFormat(String),

    #[error("Invalid integer format")]
    InvalidInteger,

    #[error("Invalid string length")]
    InvalidStringLength,

    #[error("Unexpected end of input")]
    UnexpectedEOI,

    #[error("Cannot encode type: {0}")]
    CannotEncodeType(&'static str),

    #[error("Dictionary keys must be strings")]
    DictKeyNotString,

    #[error("Dictionary keys are not sorted lexicographically")]
    NonSortedKeys,

    #[error("Trailing garbage after top-level value ({0} byte(s))")]
    TrailingGarbage(usize),
}

pub type BencodeResult<T> = std::result::Result<T, BencodeError>;
