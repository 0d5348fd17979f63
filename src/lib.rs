//! Library root for rustorrent-core.
//!
//! Re-exports the core protocol engine: bencode codec, torrent descriptors,
//! the peer wire protocol (handshake, messages, seeder, leecher) and the
//! tracker (registry, wire protocol, HTTP server), plus the torrent builder
//! and shared configuration constants. Both binaries (`torrent-client`,
//! `torrent-tracker`) are thin CLI shells over this library.
pub mod bencode;
pub mod builder;
pub mod config;
pub mod peer;
pub mod torrent;
pub mod tracker;
