//! The 68-byte handshake exchanged before any framed message: pstrlen (1) +
//! pstr (19) + reserved (8) + info-hash (20) + peer-id (20).
use super::{PeerError, PeerResult};
use crate::config::{PROTOCOL_STRING, PROTOCOL_STRING_LEN, RESERVED_BYTES};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const HANDSHAKE_LEN: usize = 68;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub info_hash: [u8; 20],
    pub peer_id: [u8; 20],
}

impl Handshake {
    pub fn new(info_hash: [u8; 20], peer_id: [u8; 20]) -> Self {
        Self { info_hash, peer_id }
    }

    pub fn to_bytes(&self) -> [u8; HANDSHAKE_LEN] {
        let mut buf = [0u8; HANDSHAKE_LEN];
        buf[0] = PROTOCOL_STRING_LEN;
        buf[1..20].copy_from_slice(PROTOCOL_STRING);
        buf[20..28].copy_from_slice(&RESERVED_BYTES);
        buf[28..48].copy_from_slice(&self.info_hash);
        buf[48..68].copy_from_slice(&self.peer_id);
        buf
    }

    pub fn from_bytes(buf: &[u8; HANDSHAKE_LEN]) -> PeerResult<Self> {
        let pstrlen = buf[0];
        if pstrlen != PROTOCOL_STRING_LEN {
            return Err(PeerError::InvalidProtocolLength(pstrlen));
        }
        let pstr = &buf[1..20];
        if pstr != PROTOCOL_STRING {
            return Err(PeerError::InvalidProtocolString(pstr.to_vec()));
        }
        let mut info_hash = [0u8; 20];
        info_hash.copy_from_slice(&buf[28..48]);
        let mut peer_id = [0u8; 20];
        peer_id.copy_from_slice(&buf[48..68]);
        Ok(Self { info_hash, peer_id })
    }

    pub async fn write<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> PeerResult<()> {
        writer.write_all(&self.to_bytes()).await?;
        Ok(())
    }

    /// Reads exactly [`HANDSHAKE_LEN`] bytes before parsing, looping over
    /// partial reads the way a TCP stream can hand them back.
    pub async fn read<R: AsyncRead + Unpin>(reader: &mut R) -> PeerResult<Self> {
        let mut buf = [0u8; HANDSHAKE_LEN];
        reader.read_exact(&mut buf).await?;
        Self::from_bytes(&buf)
    }
}
