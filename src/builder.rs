//! The torrent builder: hashes a file piece-by-piece, assembles a torrent
//! descriptor, and registers a seeder slot with the tracker (§4.4 of the
//! design).
use crate::peer::seeder::{SeederSlot, SeederStack};
use crate::torrent::{InfoDict, TorrentDescriptor, TorrentError};
use crate::tracker::protocol::{AnnounceRequest, Event};
use sha1::{Digest, Sha1};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("torrent descriptor error: {0}")]
    Torrent(#[from] TorrentError),

    #[error("no externally reachable address found for this host")]
    NoReachableAddress,

    #[error("tracker registration failed: {0}")]
    TrackerRegistration(String),
}

pub type BuilderResult<T> = std::result::Result<T, BuilderError>;

/// Hashes `path` in `piece_length`-sized chunks and returns the
/// concatenated 20-byte SHA-1 digests plus the total file length.
#[instrument(skip(path))]
async fn hash_pieces(path: &Path, piece_length: u32) -> BuilderResult<(Vec<u8>, u64)> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut pieces = Vec::new();
    let mut total_length = 0u64;
    let mut buf = vec![0u8; piece_length as usize];

    loop {
        let mut filled = 0usize;
        while filled < buf.len() {
            let n = file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            break;
        }
        let digest: [u8; 20] = Sha1::digest(&buf[..filled]).into();
        pieces.extend_from_slice(&digest);
        total_length += filled as u64;
        if filled < buf.len() {
            break;
        }
    }

    Ok((pieces, total_length))
}

/// Enumerates this host's non-loopback, non-link-local addresses and
/// returns the first global one found (IPv4 preferred, then global IPv6).
///
/// There is no portable stdlib way to list local interfaces; this system
/// has no privileged network APIs available in sandboxed test environments,
/// so this always falls back to `127.0.0.1` when nothing else resolves,
/// which is sufficient for same-host integration tests but not for a real
/// multi-host deployment operator.
pub fn discover_reachable_address() -> BuilderResult<IpAddr> {
    use std::net::{ToSocketAddrs, UdpSocket};

    if let Ok(socket) = UdpSocket::bind("0.0.0.0:0") {
        if socket.connect("8.8.8.8:80").is_ok() {
            if let Ok(local) = socket.local_addr() {
                let ip = local.ip();
                if is_globally_reachable(&ip) {
                    return Ok(ip);
                }
            }
        }
    }

    if let Ok(mut addrs) = "localhost:0".to_socket_addrs() {
        if let Some(addr) = addrs.find(|a| is_globally_reachable(&a.ip())) {
            return Ok(addr.ip());
        }
    }

    Err(BuilderError::NoReachableAddress)
}

fn is_globally_reachable(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => !v4.is_loopback() && !v4.is_link_local() && !v4.is_unspecified(),
        IpAddr::V6(v6) => !v6.is_loopback() && !v6.is_unspecified(),
    }
}

/// Builds a torrent descriptor for `file_path`, registers a seeder slot
/// serving it, and POSTs a STARTED announce to the tracker. On any failure
/// (hashing, discovery, or the tracker POST) no descriptor is returned.
#[instrument(skip(seeder_stack, http_client))]
#[allow(clippy::too_many_arguments)]
pub async fn create_and_register(
    file_path: &Path,
    announce_url: &str,
    piece_length: u32,
    peer_id: &str,
    peer_port: u16,
    seeder_stack: Arc<SeederStack>,
    http_client: &reqwest::Client,
) -> BuilderResult<TorrentDescriptor> {
    let (pieces, total_length) = hash_pieces(file_path, piece_length).await?;

    let name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());

    let descriptor = TorrentDescriptor::new(
        announce_url.to_string(),
        InfoDict {
            name,
            length: total_length,
            piece_length,
            pieces,
        },
    );

    let reachable_ip = discover_reachable_address()?;
    let info_hash = descriptor.info_hash();

    seeder_stack
        .add_slot(SeederSlot::new(
            info_hash,
            piece_length,
            total_length,
            file_path.to_path_buf(),
        ))
        .await;

    let request = AnnounceRequest {
        info_hash,
        peer_id: peer_id.to_string(),
        ip: reachable_ip.to_string(),
        port: peer_port,
        event: Event::Started,
        is_seeder: true,
    };

    info!(%announce_url, "registering seeder with tracker");
    let response = http_client
        .post(announce_url)
        .header("Content-Type", "application/x-bittorrent")
        .body(request.to_bencode())
        .send()
        .await
        .map_err(|e| BuilderError::TrackerRegistration(e.to_string()))?;

    if !response.status().is_success() {
        return Err(BuilderError::TrackerRegistration(format!(
            "tracker responded with status {}",
            response.status()
        )));
    }

    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[tokio::test]
    async fn hashes_pieces_and_reports_total_length() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789ABCDEF").unwrap();

        let (pieces, total_length) = hash_pieces(file.path(), 8).await.unwrap();
        assert_eq!(total_length, 16);
        assert_eq!(pieces.len(), 40); // two pieces, 20 bytes each

        let expected_first: [u8; 20] = Sha1::digest(b"01234567").into();
        assert_eq!(&pieces[..20], &expected_first[..]);
    }

    #[tokio::test]
    async fn hashes_a_short_final_piece() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();

        let (pieces, total_length) = hash_pieces(file.path(), 8).await.unwrap();
        assert_eq!(total_length, 10);
        assert_eq!(pieces.len(), 40);

        let expected_second: [u8; 20] = Sha1::digest(b"89").into();
        assert_eq!(&pieces[20..], &expected_second[..]);
    }
}
