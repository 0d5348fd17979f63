//! The announce tracker: an in-memory peer registry exposed over HTTP plus
//! the bencoded wire types shared between client and server.
use thiserror::Error;

pub mod protocol;
pub mod registry;
pub mod server;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("bencode error: {0}")]
    Bencode(#[from] crate::bencode::BencodeError),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid field: {0}")]
    InvalidField(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("tracker responded with status {0}")]
    BadStatus(reqwest::StatusCode),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TrackerResult<T> = std::result::Result<T, TrackerError>;
