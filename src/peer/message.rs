//! Framed peer messages: a 4-byte big-endian length prefix followed by a
//! 1-byte id and an id-specific payload. Unlike the protocol this one
//! descends from, `Piece` carries no `begin` field — requests and
//! responses are always whole-piece (§9 of the design).
use super::{PeerError, PeerResult};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// A generous ceiling on frame size so a corrupt length prefix can't make a
/// peer try to allocate gigabytes before failing.
pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

const ID_CHOKE: u8 = 0;
const ID_UNCHOKE: u8 = 1;
const ID_INTERESTED: u8 = 2;
const ID_NOT_INTERESTED: u8 = 3;
const ID_BITFIELD: u8 = 5;
const ID_REQUEST: u8 = 6;
const ID_PIECE: u8 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Choke,
    Unchoke,
    Interested,
    NotInterested,
    Bitfield(Vec<u8>),
    Request { index: u32, begin: u32, length: u32 },
    Piece { index: u32, block: Vec<u8> },
}

impl Message {
    fn id(&self) -> u8 {
        match self {
            Message::Choke => ID_CHOKE,
            Message::Unchoke => ID_UNCHOKE,
            Message::Interested => ID_INTERESTED,
            Message::NotInterested => ID_NOT_INTERESTED,
            Message::Bitfield(_) => ID_BITFIELD,
            Message::Request { .. } => ID_REQUEST,
            Message::Piece { .. } => ID_PIECE,
        }
    }

    fn payload(&self) -> Vec<u8> {
        match self {
            Message::Choke | Message::Unchoke | Message::Interested | Message::NotInterested => {
                Vec::new()
            }
            Message::Bitfield(bits) => bits.clone(),
            Message::Request { index, begin, length } => {
                let mut buf = Vec::with_capacity(12);
                buf.write_u32::<BigEndian>(*index).expect("write to Vec never fails");
                buf.write_u32::<BigEndian>(*begin).expect("write to Vec never fails");
                buf.write_u32::<BigEndian>(*length).expect("write to Vec never fails");
                buf
            }
            Message::Piece { index, block } => {
                let mut buf = Vec::with_capacity(4 + block.len());
                buf.write_u32::<BigEndian>(*index).expect("write to Vec never fails");
                buf.extend_from_slice(block);
                buf
            }
        }
    }

    /// Serializes to the wire framing: 4-byte length (id + payload) + id + payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload = self.payload();
        let len = 1 + payload.len() as u32;
        let mut buf = Vec::with_capacity(4 + len as usize);
        buf.write_u32::<BigEndian>(len).expect("write to Vec never fails");
        buf.push(self.id());
        buf.extend_from_slice(&payload);
        buf
    }

    fn from_id_and_payload(id: u8, payload: Vec<u8>) -> PeerResult<Self> {
        match id {
            ID_CHOKE => Ok(Message::Choke),
            ID_UNCHOKE => Ok(Message::Unchoke),
            ID_INTERESTED => Ok(Message::Interested),
            ID_NOT_INTERESTED => Ok(Message::NotInterested),
            ID_BITFIELD => Ok(Message::Bitfield(payload)),
            ID_REQUEST => {
                if payload.len() != 12 {
                    return Err(PeerError::MalformedMessage {
                        id,
                        reason: format!(
                            "expected a 12-byte index/begin/length, got {} bytes",
                            payload.len()
                        ),
                    });
                }
                let mut cursor = &payload[..];
                let index = cursor.read_u32::<BigEndian>().expect("length checked above");
                let begin = cursor.read_u32::<BigEndian>().expect("length checked above");
                let length = cursor.read_u32::<BigEndian>().expect("length checked above");
                Ok(Message::Request { index, begin, length })
            }
            ID_PIECE => {
                if payload.len() < 4 {
                    return Err(PeerError::MalformedMessage {
                        id,
                        reason: format!("expected at least 4 bytes, got {}", payload.len()),
                    });
                }
                let index = (&payload[..4]).read_u32::<BigEndian>().expect("length checked above");
                let block = payload[4..].to_vec();
                Ok(Message::Piece { index, block })
            }
            other => Err(PeerError::UnknownMessageId(other)),
        }
    }

    pub async fn write<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> PeerResult<()> {
        writer.write_all(&self.to_bytes()).await?;
        Ok(())
    }

    /// Reads one framed message, looping over partial reads for both the
    /// length prefix and the payload.
    pub async fn read<R: AsyncRead + Unpin>(reader: &mut R) -> PeerResult<Self> {
        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf).await?;
        let len = u32::from_be_bytes(len_buf);
        if len == 0 {
            return Err(PeerError::MalformedMessage {
                id: 0,
                reason: "zero-length frame carries no message id".to_string(),
            });
        }
        if len > MAX_FRAME_LEN {
            return Err(PeerError::FrameTooLarge(len));
        }
        let mut body = vec![0u8; len as usize];
        reader.read_exact(&mut body).await?;
        let id = body[0];
        let payload = body[1..].to_vec();
        Self::from_id_and_payload(id, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn round_trip(msg: Message) {
        let mut buf = Vec::new();
        msg.write(&mut buf).await.unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let parsed = Message::read(&mut cursor).await.unwrap();
        assert_eq!(msg, parsed);
    }

    #[tokio::test]
    async fn round_trips_every_variant() {
        round_trip(Message::Choke).await;
        round_trip(Message::Unchoke).await;
        round_trip(Message::Interested).await;
        round_trip(Message::NotInterested).await;
        round_trip(Message::Bitfield(vec![0xFF, 0x00])).await;
        round_trip(Message::Request {
            index: 7,
            begin: 0,
            length: 16384,
        })
        .await;
        round_trip(Message::Piece {
            index: 3,
            block: vec![1, 2, 3, 4, 5],
        })
        .await;
    }

    #[test]
    fn piece_wire_format_has_no_begin_field() {
        let msg = Message::Piece {
            index: 1,
            block: vec![0xAA, 0xBB],
        };
        let bytes = msg.to_bytes();
        // length(4) + id(1) + index(4) + block(2)
        assert_eq!(bytes.len(), 4 + 1 + 4 + 2);
        assert_eq!(u32::from_be_bytes(bytes[0..4].try_into().unwrap()), 7);
        assert_eq!(bytes[4], ID_PIECE);
    }

    #[tokio::test]
    async fn rejects_zero_length_frame() {
        let mut cursor = std::io::Cursor::new(vec![0u8, 0, 0, 0]);
        assert!(Message::read(&mut cursor).await.is_err());
    }

    #[tokio::test]
    async fn rejects_unknown_message_id() {
        let mut buf = Vec::new();
        buf.write_u32::<BigEndian>(1).unwrap();
        buf.push(200);
        let mut cursor = std::io::Cursor::new(buf);
        assert!(matches!(
            Message::read(&mut cursor).await,
            Err(PeerError::UnknownMessageId(200))
        ));
    }

    #[tokio::test]
    async fn rejects_oversized_frame() {
        let mut buf = Vec::new();
        buf.write_u32::<BigEndian>(MAX_FRAME_LEN + 1).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        assert!(matches!(
            Message::read(&mut cursor).await,
            Err(PeerError::FrameTooLarge(_))
        ));
    }
}
