use std::fmt;
use std::str::FromStr;

use crate::constants::{BOARD_SIZE, BOARD_SQUARES};
use crate::error::{BitboardError, ParseError};

/// A cell on the board addressed by `(row, col)`, both in `0..8`.
///
/// Rows are rendered as ranks `1..8` and columns as files `a..h`, so `(2, 3)`
/// prints as `d3`. The bitboard layout puts row 0 in the high byte:
///
/// ```text
///      a  b  c  d  e  f  g  h
///   1 56 57 58 59 60 61 62 63
///   2 48 49 50 51 52 53 54 55
///   3 40 41 42 43 44 45 46 47
///   4 32 33 34 35 36 37 38 39
///   5 24 25 26 27 28 29 30 31
///   6 16 17 18 19 20 21 22 23
///   7 08 09 10 11 12 13 14 15
///   8 00 01 02 03 04 05 06 07
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    /// Creates a position without range checks.
    #[inline]
    pub const fn new(row: u8, col: u8) -> Self {
        Position { row, col }
    }

    /// Creates a position from signed coordinates, returning `None` when off the board.
    pub fn checked(row: i32, col: i32) -> Option<Self> {
        let size = BOARD_SIZE as i32;
        if (0..size).contains(&row) && (0..size).contains(&col) {
            Some(Position::new(row as u8, col as u8))
        } else {
            None
        }
    }

    /// Returns `true` if both coordinates are inside the board.
    #[inline]
    pub fn is_on_board(self) -> bool {
        (self.row as usize) < BOARD_SIZE && (self.col as usize) < BOARD_SIZE
    }

    /// Bit index of this cell: `(7 - row) * 8 + col`.
    #[inline]
    pub fn bit_index(self) -> u32 {
        debug_assert!(self.is_on_board(), "position off board: {self:?}");
        (7 - self.row as u32) * 8 + self.col as u32
    }

    /// Single-bit mask for this cell.
    #[inline]
    pub fn bitboard(self) -> u64 {
        1u64 << self.bit_index()
    }

    /// Converts a bit index back into a position.
    ///
    /// # Arguments
    ///
    /// * `index` - Bit index in `0..64`.
    ///
    /// # Returns
    ///
    /// The position, or `BitboardError::InvalidBitIndex` when `index >= 64`.
    pub fn from_bit_index(index: u32) -> Result<Self, BitboardError> {
        if index as usize >= BOARD_SQUARES {
            return Err(BitboardError::InvalidBitIndex(index));
        }
        Ok(Position::new(7 - (index / 8) as u8, (index % 8) as u8))
    }

    /// Position of the lowest set bit of a non-empty mask.
    #[inline]
    pub(crate) fn from_lsb(mask: u64) -> Self {
        debug_assert!(mask != 0);
        let index = mask.trailing_zeros();
        Position::new(7 - (index / 8) as u8, (index % 8) as u8)
    }

    pub fn is_corner(self) -> bool {
        (self.row == 0 || self.row == 7) && (self.col == 0 || self.col == 7)
    }

    pub fn is_edge(self) -> bool {
        self.row == 0 || self.row == 7 || self.col == 0 || self.col == 7
    }

    /// Iterates over all 64 positions in row-major order.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..BOARD_SIZE as u8).flat_map(|row| (0..BOARD_SIZE as u8).map(move |col| Position::new(row, col)))
    }
}

/// Iterates over the positions of the set bits of a mask, lowest bit first.
pub fn positions(mut mask: u64) -> impl Iterator<Item = Position> {
    std::iter::from_fn(move || {
        if mask == 0 {
            return None;
        }
        let pos = Position::from_lsb(mask);
        mask &= mask - 1;
        Some(pos)
    })
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.col) as char, self.row + 1)
    }
}

impl FromStr for Position {
    type Err = ParseError;

    /// Parses algebraic notation such as `d3` or `D3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.trim().as_bytes();
        if bytes.len() != 2 {
            return Err(ParseError::Position(s.to_string()));
        }
        let col = bytes[0].to_ascii_lowercase().wrapping_sub(b'a');
        let row = bytes[1].wrapping_sub(b'1');
        let pos = Position::new(row, col);
        if pos.is_on_board() {
            Ok(pos)
        } else {
            Err(ParseError::Position(s.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_index_layout() {
        assert_eq!(Position::new(0, 0).bit_index(), 56);
        assert_eq!(Position::new(7, 7).bit_index(), 7);
        assert_eq!(Position::new(2, 3).bit_index(), 43);
    }

    #[test]
    fn test_bit_index_roundtrip() {
        for pos in Position::all() {
            assert_eq!(Position::from_bit_index(pos.bit_index()), Ok(pos));
        }
        assert_eq!(
            Position::from_bit_index(64),
            Err(BitboardError::InvalidBitIndex(64))
        );
    }

    #[test]
    fn test_notation() {
        assert_eq!(Position::new(2, 3).to_string(), "d3");
        assert_eq!("d3".parse::<Position>(), Ok(Position::new(2, 3)));
        assert_eq!("H8".parse::<Position>(), Ok(Position::new(7, 7)));
        assert!("i1".parse::<Position>().is_err());
        assert!("a9".parse::<Position>().is_err());
        assert!("a".parse::<Position>().is_err());
    }

    #[test]
    fn test_positions_iter() {
        let mask = Position::new(0, 0).bitboard() | Position::new(7, 7).bitboard();
        let all: Vec<_> = positions(mask).collect();
        assert_eq!(all, vec![Position::new(7, 7), Position::new(0, 0)]);
        assert_eq!(Position::all().count(), 64);
    }

    #[test]
    fn test_checked() {
        assert_eq!(Position::checked(-1, 0), None);
        assert_eq!(Position::checked(0, 8), None);
        assert_eq!(Position::checked(7, 0), Some(Position::new(7, 0)));
        assert!(Position::new(0, 7).is_corner());
        assert!(Position::new(0, 3).is_edge());
        assert!(!Position::new(3, 3).is_edge());
    }
}
