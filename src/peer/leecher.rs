//! Leecher side of the peer protocol: dial a candidate peer, perform the
//! handshake, and drive the sequential piece request loop with SHA-1
//! verification described in the design.
use super::{Bitfield, Handshake, Message, PeerError, PeerResult};
use crate::config::PEER_IO_TIMEOUT;
use crate::torrent::TorrentDescriptor;
use crate::tracker::registry::PeerRecord;
use sha1::{Digest, Sha1};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{info, instrument, warn};

/// Attempts every candidate peer in turn; the first one that serves the
/// whole file wins. Per-peer failures are non-fatal and advance to the next
/// candidate (§4 of the design); if every peer fails the errors are
/// aggregated into one.
#[instrument(skip(torrent, peer_id, peers))]
pub async fn download_from_peers(
    torrent: &TorrentDescriptor,
    peer_id: [u8; 20],
    peers: &[PeerRecord],
) -> PeerResult<Vec<u8>> {
    let mut failures = Vec::new();
    for peer in peers {
        let addr: SocketAddr = match format!("{}:{}", peer.ip, peer.port).parse() {
            Ok(addr) => addr,
            Err(e) => {
                failures.push(format!("{}:{}: {e}", peer.ip, peer.port));
                continue;
            }
        };

        info!(%addr, "dialing peer");
        let connect = tokio::time::timeout(PEER_IO_TIMEOUT, TcpStream::connect(addr)).await;
        let socket = match connect {
            Ok(Ok(socket)) => socket,
            Ok(Err(e)) => {
                failures.push(format!("{addr}: dial failed: {e}"));
                continue;
            }
            Err(_) => {
                failures.push(format!("{addr}: dial timed out"));
                continue;
            }
        };

        match download_from_one_peer(torrent, peer_id, socket).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) => {
                warn!(%addr, error = %e, "peer failed, advancing to next");
                failures.push(format!("{addr}: {e}"));
            }
        }
    }

    Err(PeerError::AllPeersFailed(failures.join("; ")))
}

/// Drives the handshake and request loop against one already-connected
/// peer. Generic over the transport so tests can use an in-memory duplex.
pub async fn download_from_one_peer<S>(
    torrent: &TorrentDescriptor,
    peer_id: [u8; 20],
    mut socket: S,
) -> PeerResult<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let info_hash = torrent.info_hash();
    let handshake = Handshake::new(info_hash, peer_id);
    tokio::time::timeout(PEER_IO_TIMEOUT, handshake.write(&mut socket))
        .await
        .map_err(|_| PeerError::Timeout)??;

    let response = tokio::time::timeout(PEER_IO_TIMEOUT, Handshake::read(&mut socket))
        .await
        .map_err(|_| PeerError::Timeout)??;

    if response.info_hash != info_hash {
        return Err(PeerError::InfoHashMismatch {
            expected: hex::encode(info_hash),
            got: hex::encode(response.info_hash),
        });
    }

    let num_pieces = torrent.num_pieces();
    let mut bitfield = Bitfield::new(num_pieces);
    let mut output = Vec::with_capacity(torrent.info.length as usize);

    for index in 0..num_pieces {
        let length = torrent.piece_size(index) as u32;
        let request = Message::Request {
            index: index as u32,
            begin: 0,
            length,
        };
        tokio::time::timeout(PEER_IO_TIMEOUT, request.write(&mut socket))
            .await
            .map_err(|_| PeerError::Timeout)??;

        let reply = tokio::time::timeout(PEER_IO_TIMEOUT, Message::read(&mut socket))
            .await
            .map_err(|_| PeerError::Timeout)??;

        let (piece_index, block) = match reply {
            Message::Piece { index, block } => (index, block),
            other => {
                return Err(PeerError::MalformedMessage {
                    id: 0,
                    reason: format!("expected a Piece message, got {other:?}"),
                })
            }
        };

        if piece_index as usize != index {
            return Err(PeerError::MalformedMessage {
                id: 7,
                reason: format!("expected piece {index}, got {piece_index}"),
            });
        }

        let expected_hash = torrent
            .piece_hash(index)
            .expect("index is within num_pieces");
        let actual_hash: [u8; 20] = Sha1::digest(&block).into();
        if actual_hash != expected_hash {
            return Err(PeerError::PieceValidationFailed { index });
        }

        bitfield.set_piece(index);
        output.extend_from_slice(&block);
    }

    debug_assert!(bitfield.is_complete());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::seeder::{serve_connection, SeederSlot, SeederStack};
    use crate::torrent::{InfoDict, TorrentDescriptor};
    use std::io::Write as _;

    fn sample_torrent(pieces_plain: &[u8], piece_length: u32) -> (TorrentDescriptor, Vec<u8>) {
        let mut pieces = Vec::new();
        for chunk in pieces_plain.chunks(piece_length as usize) {
            let hash: [u8; 20] = Sha1::digest(chunk).into();
            pieces.extend_from_slice(&hash);
        }
        let descriptor = TorrentDescriptor::new(
            "http://tracker.example:8080/announce".to_string(),
            InfoDict {
                name: "sample.bin".to_string(),
                length: pieces_plain.len() as u64,
                piece_length,
                pieces,
            },
        );
        (descriptor, pieces_plain.to_vec())
    }

    #[tokio::test]
    async fn downloads_and_verifies_every_piece_against_a_seeder() {
        let plain = b"0123456789ABCDEF".to_vec();
        let (torrent, expected) = sample_torrent(&plain, 8);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&plain).unwrap();

        let slot = SeederSlot::new(torrent.info_hash(), 8, plain.len() as u64, file.path().to_path_buf());
        let stack = SeederStack::new();
        stack.add_slot(slot).await;

        let (client, server) = tokio::io::duplex(8192);
        let seeder_peer_id = [9u8; 20];
        let serve = tokio::spawn(async move { serve_connection(&stack, seeder_peer_id, server).await });

        let downloaded = download_from_one_peer(&torrent, [1u8; 20], client).await.unwrap();
        assert_eq!(downloaded, expected);

        serve.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn info_hash_mismatch_is_rejected() {
        let plain = b"abcdefgh".to_vec();
        let (torrent, _expected) = sample_torrent(&plain, 8);

        let (mut client, mut server) = tokio::io::duplex(4096);
        let responder = tokio::spawn(async move {
            let _incoming = Handshake::read(&mut server).await.unwrap();
            Handshake::new([0xAAu8; 20], [2u8; 20])
                .write(&mut server)
                .await
                .unwrap();
        });

        let result = download_from_one_peer(&torrent, [1u8; 20], &mut client).await;
        responder.await.unwrap();
        assert!(matches!(result, Err(PeerError::InfoHashMismatch { .. })));
    }
}
