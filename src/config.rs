//! Shared constants and CLI argument surfaces for both binaries.
use std::time::Duration;

/// The protocol string exchanged at the start of every handshake.
pub const PROTOCOL_STRING: &[u8; 19] = b"BitTorrent protocol";

/// Length prefix of the protocol string, also the first byte on the wire.
pub const PROTOCOL_STRING_LEN: u8 = 19;

/// 8 reserved handshake bytes; always zero in this implementation.
pub const RESERVED_BYTES: [u8; 8] = [0u8; 8];

/// Default tracker HTTP listen address.
pub const DEFAULT_TRACKER_ADDR: &str = "0.0.0.0:8080";

/// Default seeder TCP listener port.
pub const DEFAULT_PEER_PORT: u16 = 6881;

/// How many consecutive ports the seeder listener will try if the default
/// is already bound.
pub const DEFAULT_PORT_RETRY_COUNT: u16 = 10;

/// Default piece size for newly created torrents (16 KiB).
pub const DEFAULT_PIECE_LENGTH_SMALL: u32 = 16 * 1024;

/// Alternative, larger piece size some deployments prefer (512 KiB).
pub const DEFAULT_PIECE_LENGTH_LARGE: u32 = 512 * 1024;

/// A peer record not re-announced within this window is evicted from the
/// tracker's registry.
pub const PEER_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout applied to the tracker's outbound HTTP client and to the
/// builder's seeder-registration POST.
pub const TRACKER_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout applied to dialing a peer and to each subsequent read/write.
pub const PEER_IO_TIMEOUT: Duration = Duration::from_secs(15);

/// Peer-id prefix identifying this implementation ("Go client" placeholder
/// retained from the system this protocol was distilled from).
pub const PEER_ID_PREFIX: &str = "-GO0001-";

pub mod cli {
    use clap::{Parser, Subcommand};

    #[derive(Debug, Parser)]
    #[command(name = "torrent-client", about = "Seed and download single-file torrents")]
    pub struct ClientArgs {
        #[command(subcommand)]
        pub command: ClientCommand,

        /// Bound address for the seeder's TCP listener.
        #[arg(long, default_value_t = super::DEFAULT_PEER_PORT)]
        pub peer_port: u16,
    }

    #[derive(Debug, Subcommand)]
    pub enum ClientCommand {
        /// Hash a file, write a .torrent descriptor, and start seeding it.
        Create {
            /// Path of the file to seed.
            file: std::path::PathBuf,
            /// Tracker announce URL.
            #[arg(long)]
            tracker: String,
            /// Piece size in bytes.
            #[arg(long, default_value_t = super::DEFAULT_PIECE_LENGTH_SMALL)]
            piece_length: u32,
            /// Where to write the .torrent file (defaults to `<file>.torrent`).
            #[arg(long)]
            out: Option<std::path::PathBuf>,
        },
        /// Download the file described by a torrent descriptor.
        Download {
            /// Path to the .torrent descriptor.
            torrent: std::path::PathBuf,
            /// Output path for the reconstructed file.
            #[arg(long)]
            out: std::path::PathBuf,
        },
        /// Register an already-downloaded file as a seeder without re-announcing a new build.
        Seed {
            /// Path to the .torrent descriptor.
            torrent: std::path::PathBuf,
            /// Path to the backing file on disk.
            file: std::path::PathBuf,
        },
    }

    #[derive(Debug, Parser)]
    #[command(name = "torrent-tracker", about = "Run the announce tracker")]
    pub struct TrackerArgs {
        /// Address to bind the HTTP listener to.
        #[arg(long, env = "TRACKER_ADDR", default_value = super::DEFAULT_TRACKER_ADDR)]
        pub addr: String,
    }
}
