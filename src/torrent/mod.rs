//! Torrent descriptor parsing, construction, and error handling.
//!
//! Single-file torrents only (§3 of the design): `info.files` /
//! `announce-list` style multi-file layouts are out of scope and are never
//! parsed or emitted.
use thiserror::Error;

pub mod descriptor;
pub mod info_hash;

pub use descriptor::{InfoDict, TorrentDescriptor};
pub use info_hash::info_hash;

#[derive(Debug, Error)]
pub enum TorrentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bencode error: {0}")]
    Bencode(#[from] crate::bencode::BencodeError),

    #[error("invalid torrent descriptor: {0}")]
    InvalidFormat(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("pieces length is not a multiple of 20")]
    InvalidPiecesHashLength,

    #[error("unsupported announce scheme (only http is supported): {0}")]
    UnsupportedScheme(String),

    #[error("url parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

pub type TorrentResult<T> = std::result::Result<T, TorrentError>;
