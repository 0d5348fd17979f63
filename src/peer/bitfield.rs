//! Piece-availability bitfield: one bit per piece, packed MSB-first into
//! bytes, `ceil(num_pieces / 8)` bytes long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitfield {
    bytes: Vec<u8>,
    num_pieces: usize,
}

impl Bitfield {
    /// Creates an all-zero bitfield sized for `num_pieces`.
    pub fn new(num_pieces: usize) -> Self {
        let len = num_pieces.div_ceil(8);
        Self {
            bytes: vec![0u8; len],
            num_pieces,
        }
    }

    /// Wraps a bitfield received off the wire. `num_pieces` is the torrent's
    /// piece count, independent of the byte length (the last byte may carry
    /// padding bits the protocol leaves unspecified).
    pub fn from_bytes(bytes: Vec<u8>, num_pieces: usize) -> Self {
        Self { bytes, num_pieces }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn num_pieces(&self) -> usize {
        self.num_pieces
    }

    fn locate(&self, index: usize) -> Option<(usize, u8)> {
        if index >= self.num_pieces {
            return None;
        }
        let byte_index = index / 8;
        let bit_offset = index % 8;
        Some((byte_index, 1u8 << (7 - bit_offset)))
    }

    pub fn has_piece(&self, index: usize) -> bool {
        match self.locate(index) {
            Some((byte_index, mask)) => self
                .bytes
                .get(byte_index)
                .map(|b| b & mask != 0)
                .unwrap_or(false),
            None => false,
        }
    }

    pub fn set_piece(&mut self, index: usize) {
        if let Some((byte_index, mask)) = self.locate(index) {
            if let Some(byte) = self.bytes.get_mut(byte_index) {
                *byte |= mask;
            }
        }
    }

    pub fn unset_piece(&mut self, index: usize) {
        if let Some((byte_index, mask)) = self.locate(index) {
            if let Some(byte) = self.bytes.get_mut(byte_index) {
                *byte &= !mask;
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        (0..self.num_pieces).all(|i| self.has_piece(i))
    }

    /// Indices of every piece currently set.
    pub fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.num_pieces).filter(move |&i| self.has_piece(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_bitfield_has_no_pieces() {
        let bf = Bitfield::new(10);
        assert_eq!(bf.as_bytes().len(), 2);
        assert!(!bf.has_piece(0));
        assert!(!bf.is_complete());
    }

    #[test]
    fn set_and_unset_round_trip() {
        let mut bf = Bitfield::new(10);
        bf.set_piece(0);
        bf.set_piece(7);
        bf.set_piece(9);
        assert!(bf.has_piece(0));
        assert!(bf.has_piece(7));
        assert!(bf.has_piece(9));
        assert!(!bf.has_piece(1));
        assert_eq!(bf.as_bytes()[0], 0b1000_0001);

        bf.unset_piece(0);
        assert!(!bf.has_piece(0));
    }

    #[test]
    fn is_complete_true_once_every_piece_set() {
        let mut bf = Bitfield::new(3);
        for i in 0..3 {
            assert!(!bf.is_complete());
            bf.set_piece(i);
        }
        assert!(bf.is_complete());
    }

    #[test]
    fn out_of_range_index_is_inert_not_panicking() {
        let mut bf = Bitfield::new(4);
        bf.set_piece(100);
        assert!(!bf.has_piece(100));
    }

    #[test]
    fn iter_set_yields_only_set_indices() {
        let mut bf = Bitfield::new(5);
        bf.set_piece(1);
        bf.set_piece(4);
        assert_eq!(bf.iter_set().collect::<Vec<_>>(), vec![1, 4]);
    }
}
