//! The peer-to-peer protocol engine: handshake, framed messages, the
//! bitfield, and the seeder/leecher halves of the connection lifecycle.
use thiserror::Error;

pub mod bitfield;
pub mod handshake;
pub mod id;
pub mod leecher;
pub mod message;
pub mod seeder;

pub use bitfield::Bitfield;
pub use handshake::Handshake;
pub use message::Message;

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation timed out")]
    Timeout,

    #[error("invalid protocol string length: {0}")]
    InvalidProtocolLength(u8),

    #[error("invalid protocol string: {0:?}")]
    InvalidProtocolString(Vec<u8>),

    #[error("info-hash mismatch: expected {expected}, got {got}")]
    InfoHashMismatch { expected: String, got: String },

    #[error("unknown message id: {0}")]
    UnknownMessageId(u8),

    #[error("malformed message payload for id {id}: {reason}")]
    MalformedMessage { id: u8, reason: String },

    #[error("message frame length {0} exceeds the maximum sane size")]
    FrameTooLarge(u32),

    #[error("no seeder slot registered for the offered info-hash")]
    NoMatchingSlot,

    #[error("piece {index} failed SHA-1 validation")]
    PieceValidationFailed { index: usize },

    #[error("all peers failed: {0}")]
    AllPeersFailed(String),
}

pub type PeerResult<T> = std::result::Result<T, PeerError>;
