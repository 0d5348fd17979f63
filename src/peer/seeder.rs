//! Seeder side of the peer protocol: a stack of seeding slots (one per
//! torrent currently being served) and the per-connection state machine
//! (AwaitHandshake → SendHandshake → Serving) described in the design.
use super::{Handshake, Message, PeerError, PeerResult};
use crate::config::PEER_IO_TIMEOUT;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWrite, SeekFrom};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// One torrent this process is willing to seed.
#[derive(Debug, Clone)]
pub struct SeederSlot {
    pub info_hash: [u8; 20],
    pub piece_length: u32,
    pub total_length: u64,
    pub path: PathBuf,
}

impl SeederSlot {
    pub fn new(info_hash: [u8; 20], piece_length: u32, total_length: u64, path: PathBuf) -> Self {
        Self {
            info_hash,
            piece_length,
            total_length,
            path,
        }
    }

    fn piece_size(&self, index: u64) -> u64 {
        let num_pieces = self.total_length.div_ceil(self.piece_length as u64);
        if index + 1 >= num_pieces {
            self.total_length - index * self.piece_length as u64
        } else {
            self.piece_length as u64
        }
    }
}

/// The registry of slots this process seeds, guarded by a single mutex per
/// the design's "acceptable given low request rate" note. Individual
/// connections only touch the lock once, at slot lookup time.
#[derive(Debug, Default)]
pub struct SeederStack {
    slots: Mutex<Vec<SeederSlot>>,
}

impl SeederStack {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
        }
    }

    pub async fn add_slot(&self, slot: SeederSlot) {
        self.slots.lock().await.push(slot);
    }

    async fn find(&self, info_hash: &[u8; 20]) -> Option<SeederSlot> {
        self.slots
            .lock()
            .await
            .iter()
            .find(|s| &s.info_hash == info_hash)
            .cloned()
    }
}

/// Binds `addr`, retrying on the next consecutive port up to
/// [`crate::config::DEFAULT_PORT_RETRY_COUNT`] times if the initial bind
/// fails, and accepts connections forever, spawning one worker task per
/// accepted connection.
#[instrument(skip(stack, peer_id))]
pub async fn listen(
    stack: Arc<SeederStack>,
    peer_id: [u8; 20],
    addr: std::net::SocketAddr,
) -> PeerResult<()> {
    let listener = bind_with_retry(addr).await?;
    info!(addr = %listener.local_addr()?, "seeder listening");
    loop {
        let (socket, peer_addr) = listener.accept().await?;
        let stack = Arc::clone(&stack);
        tokio::spawn(async move {
            if let Err(err) = serve_connection(&stack, peer_id, socket).await {
                warn!(%peer_addr, %err, "seeder connection terminated");
            }
        });
    }
}

async fn bind_with_retry(addr: std::net::SocketAddr) -> PeerResult<TcpListener> {
    let mut last_err = None;
    for offset in 0..=crate::config::DEFAULT_PORT_RETRY_COUNT {
        let candidate = std::net::SocketAddr::new(addr.ip(), addr.port().saturating_add(offset));
        match TcpListener::bind(candidate).await {
            Ok(listener) => return Ok(listener),
            Err(err) => {
                warn!(addr = %candidate, %err, "bind failed, trying next port");
                last_err = Some(err);
            }
        }
    }
    Err(last_err.expect("loop runs at least once").into())
}

/// Drives one accepted connection through the handshake and serving loop.
/// Generic over the transport so tests can exercise it over an in-memory
/// duplex instead of a real socket.
pub async fn serve_connection<S>(
    stack: &SeederStack,
    peer_id: [u8; 20],
    mut socket: S,
) -> PeerResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let incoming = tokio::time::timeout(PEER_IO_TIMEOUT, Handshake::read(&mut socket))
        .await
        .map_err(|_| PeerError::Timeout)??;

    let slot = stack
        .find(&incoming.info_hash)
        .await
        .ok_or(PeerError::NoMatchingSlot)?;

    let response = Handshake::new(incoming.info_hash, peer_id);
    tokio::time::timeout(PEER_IO_TIMEOUT, response.write(&mut socket))
        .await
        .map_err(|_| PeerError::Timeout)??;

    loop {
        let message = match tokio::time::timeout(PEER_IO_TIMEOUT, Message::read(&mut socket)).await
        {
            Ok(Ok(message)) => message,
            Ok(Err(_)) => return Ok(()), // connection closed or framing error: stop serving
            Err(_) => return Err(PeerError::Timeout),
        };

        match message {
            Message::Request { index, length, .. } => {
                let block = read_piece(&slot, index, length).await?;
                let reply = Message::Piece { index, block };
                tokio::time::timeout(PEER_IO_TIMEOUT, reply.write(&mut socket))
                    .await
                    .map_err(|_| PeerError::Timeout)??;
            }
            _ => {
                // Bitfield and anything else: accepted, no action.
            }
        }
    }
}

async fn read_piece(slot: &SeederSlot, index: u32, requested_length: u32) -> PeerResult<Vec<u8>> {
    let offset = index as u64 * slot.piece_length as u64;
    let actual_len = slot.piece_size(index as u64).min(requested_length as u64);

    let mut file = File::open(&slot.path).await?;
    file.seek(SeekFrom::Start(offset)).await?;
    let mut buf = vec![0u8; actual_len as usize];
    file.read_exact(&mut buf).await?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[tokio::test]
    async fn serves_a_requested_piece_over_a_duplex_pipe() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789ABCDEF").unwrap();

        let slot = SeederSlot::new([7u8; 20], 8, 16, file.path().to_path_buf());
        let stack = SeederStack::new();
        stack.add_slot(slot).await;

        let (mut client, server) = tokio::io::duplex(4096);
        let serve = tokio::spawn(async move {
            serve_connection(&stack, [9u8; 20], server).await
        });

        let hs = Handshake::new([7u8; 20], [1u8; 20]);
        hs.write(&mut client).await.unwrap();
        let response = Handshake::read(&mut client).await.unwrap();
        assert_eq!(response.info_hash, [7u8; 20]);
        assert_eq!(response.peer_id, [9u8; 20]);

        Message::Request {
            index: 1,
            begin: 0,
            length: 8,
        }
        .write(&mut client)
        .await
        .unwrap();

        let piece = Message::read(&mut client).await.unwrap();
        match piece {
            Message::Piece { index, block } => {
                assert_eq!(index, 1);
                assert_eq!(block, b"89ABCDEF");
            }
            other => panic!("expected a Piece message, got {other:?}"),
        }

        drop(client);
        serve.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn rejects_handshake_for_an_unregistered_info_hash() {
        let stack = SeederStack::new();
        let (mut client, server) = tokio::io::duplex(4096);
        let serve = tokio::spawn(async move { serve_connection(&stack, [0u8; 20], server).await });

        Handshake::new([1u8; 20], [2u8; 20])
            .write(&mut client)
            .await
            .unwrap();

        let result = serve.await.unwrap();
        assert!(matches!(result, Err(PeerError::NoMatchingSlot)));
    }

    #[test]
    fn piece_size_accounts_for_a_short_final_piece() {
        let slot = SeederSlot::new([0u8; 20], 10, 25, PathBuf::new());
        assert_eq!(slot.piece_size(0), 10);
        assert_eq!(slot.piece_size(1), 10);
        assert_eq!(slot.piece_size(2), 5);
    }
}
