//! Bitboard operations and types.
//!
//! A position is stored as two `u64` masks, one per colour. Bit `(7 - row) * 8 + col`
//! represents the cell at `(row, col)`, so row 0 lives in the most significant byte.

use crate::disc::{Disc, Player};
use crate::error::BitboardError;
use crate::square::Position;

/// Mask of file `a` (column 0).
pub const FILE_A: u64 = 0x0101_0101_0101_0101;
/// Mask of file `h` (column 7).
pub const FILE_H: u64 = 0x8080_8080_8080_8080;
/// Mask of the four corners.
pub const CORNER_MASK: u64 = 0x8100_0000_0000_0081;
/// Mask of the outer ring of cells.
pub const EDGE_MASK: u64 = 0xFF81_8181_8181_81FF;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[inline(always)]
pub(crate) fn shift_n(b: u64) -> u64 {
    b << 8
}

#[inline(always)]
pub(crate) fn shift_s(b: u64) -> u64 {
    b >> 8
}

#[inline(always)]
pub(crate) fn shift_e(b: u64) -> u64 {
    (b << 1) & !FILE_A
}

#[inline(always)]
pub(crate) fn shift_w(b: u64) -> u64 {
    (b >> 1) & !FILE_H
}

#[inline(always)]
pub(crate) fn shift_ne(b: u64) -> u64 {
    (b << 9) & !FILE_A
}

#[inline(always)]
pub(crate) fn shift_nw(b: u64) -> u64 {
    (b << 7) & !FILE_H
}

#[inline(always)]
pub(crate) fn shift_se(b: u64) -> u64 {
    (b >> 7) & !FILE_A
}

#[inline(always)]
pub(crate) fn shift_sw(b: u64) -> u64 {
    (b >> 9) & !FILE_H
}

/// The eight direction shifts, each guarding against file wrap-around.
const SHIFTS: [fn(u64) -> u64; 8] = [
    shift_n, shift_s, shift_e, shift_w, shift_ne, shift_nw, shift_se, shift_sw,
];

/// Computes the legal move mask for the side owning `own`.
///
/// # Arguments
///
/// * `own` - Discs of the side to move.
/// * `opp` - Discs of the opponent.
///
/// # Returns
///
/// A mask of every empty cell that captures at least one opponent disc.
pub fn get_moves(own: u64, opp: u64) -> u64 {
    let empty = !(own | opp);
    let mut moves = 0;
    for shift in SHIFTS {
        let mut x = shift(own) & opp;
        // an interior run is at most 6 discs long
        for _ in 0..5 {
            x |= shift(x) & opp;
        }
        moves |= shift(x) & empty;
    }
    moves
}

/// Computes the discs flipped when the side owning `own` plays `move_bit`.
///
/// Returns `0` for an illegal move, including an occupied target.
pub fn flips_for_move(own: u64, opp: u64, move_bit: u64) -> u64 {
    if move_bit & (own | opp) != 0 {
        return 0;
    }
    let mut flips = 0;
    for shift in SHIFTS {
        let mut run = 0;
        let mut x = shift(move_bit);
        while x & opp != 0 {
            run |= x;
            x = shift(x);
        }
        if x & own != 0 {
            flips |= run;
        }
    }
    flips
}

/// Union of the cells adjacent to any disc in `mask`.
#[inline]
pub fn neighbours(mask: u64) -> u64 {
    SHIFTS.iter().fold(0, |acc, shift| acc | shift(mask))
}

/// Information needed to restore a position after [`Bitboard::flip_pieces`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveUndo {
    pub side: Player,
    pub move_mask: u64,
    pub flips: u64,
    pub prev_black: u64,
    pub prev_white: u64,
}

/// Black and white disc masks. `black & white == 0` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bitboard {
    pub black: u64,
    pub white: u64,
}

impl Bitboard {
    /// Creates a bitboard from raw masks.
    #[inline]
    pub const fn new(black: u64, white: u64) -> Self {
        debug_assert!(black & white == 0);
        Bitboard { black, white }
    }

    /// Standard starting position.
    pub fn initial() -> Self {
        let white = Position::new(3, 3).bitboard() | Position::new(4, 4).bitboard();
        let black = Position::new(3, 4).bitboard() | Position::new(4, 3).bitboard();
        Bitboard::new(black, white)
    }

    /// Discs of `player`.
    #[inline(always)]
    pub fn own(&self, player: Player) -> u64 {
        match player {
            Player::Black => self.black,
            Player::White => self.white,
        }
    }

    /// Discs of the opponent of `player`.
    #[inline(always)]
    pub fn opp(&self, player: Player) -> u64 {
        self.own(player.opposite())
    }

    #[inline(always)]
    pub fn occupied(&self) -> u64 {
        self.black | self.white
    }

    #[inline(always)]
    pub fn empty_mask(&self) -> u64 {
        !self.occupied()
    }

    /// Number of empty cells.
    #[inline(always)]
    pub fn empties(&self) -> u32 {
        self.empty_mask().count_ones()
    }

    #[inline(always)]
    pub fn count(&self, player: Player) -> u32 {
        self.own(player).count_ones()
    }

    /// Disc differential from `player`'s perspective.
    #[inline]
    pub fn disc_diff(&self, player: Player) -> i32 {
        self.count(player) as i32 - self.count(player.opposite()) as i32
    }

    /// Legal move mask for `player`.
    #[inline]
    pub fn valid_moves_mask(&self, player: Player) -> u64 {
        get_moves(self.own(player), self.opp(player))
    }

    #[inline]
    pub fn has_moves(&self, player: Player) -> bool {
        self.valid_moves_mask(player) != 0
    }

    /// `true` when neither side has a legal move.
    pub fn is_game_over(&self) -> bool {
        !self.has_moves(Player::Black) && !self.has_moves(Player::White)
    }

    /// Discs flipped if `player` plays at `pos`; `0` when the move is illegal.
    #[inline]
    pub fn flips_for_move(&self, player: Player, pos: Position) -> u64 {
        flips_for_move(self.own(player), self.opp(player), pos.bitboard())
    }

    /// Disc stored at a raw bit index.
    ///
    /// # Errors
    ///
    /// `BitboardError::InvalidBitIndex` when `index >= 64`.
    pub fn disc_at_index(&self, index: u32) -> Result<Disc, BitboardError> {
        if index >= 64 {
            return Err(BitboardError::InvalidBitIndex(index));
        }
        let bit = 1u64 << index;
        Ok(if self.black & bit != 0 {
            Disc::Black
        } else if self.white & bit != 0 {
            Disc::White
        } else {
            Disc::Empty
        })
    }

    #[inline]
    pub fn disc_at(&self, pos: Position) -> Disc {
        let bit = pos.bitboard();
        if self.black & bit != 0 {
            Disc::Black
        } else if self.white & bit != 0 {
            Disc::White
        } else {
            Disc::Empty
        }
    }

    /// Plays a move in place.
    ///
    /// # Arguments
    ///
    /// * `player` - Side placing the disc.
    /// * `pos` - Target cell.
    ///
    /// # Returns
    ///
    /// An undo token, or `None` (with `self` untouched) when the target is
    /// occupied or captures nothing.
    pub fn flip_pieces(&mut self, player: Player, pos: Position) -> Option<MoveUndo> {
        let move_mask = pos.bitboard();
        let flips = self.flips_for_move(player, pos);
        if flips == 0 {
            return None;
        }
        let undo = MoveUndo {
            side: player,
            move_mask,
            flips,
            prev_black: self.black,
            prev_white: self.white,
        };
        self.apply_flips(player, move_mask, flips);
        Some(undo)
    }

    /// Restores the masks saved in `undo`.
    #[inline]
    pub fn undo_move(&mut self, undo: &MoveUndo) {
        self.black = undo.prev_black;
        self.white = undo.prev_white;
    }

    /// Returns the position after `player` plays at `pos`, together with the flipped mask.
    #[inline]
    pub fn apply_move(&self, player: Player, pos: Position) -> Option<(Bitboard, u64)> {
        let move_mask = pos.bitboard();
        let flips = self.flips_for_move(player, pos);
        if flips == 0 {
            return None;
        }
        let mut next = *self;
        next.apply_flips(player, move_mask, flips);
        Some((next, flips))
    }

    /// Returns the position after `player` plays at `pos` with precomputed `flips`.
    #[inline]
    pub fn make_move_with_flips(&self, player: Player, pos: Position, flips: u64) -> Bitboard {
        let mut next = *self;
        next.apply_flips(player, pos.bitboard(), flips);
        next
    }

    #[inline(always)]
    fn apply_flips(&mut self, player: Player, move_mask: u64, flips: u64) {
        match player {
            Player::Black => {
                self.black |= move_mask | flips;
                self.white &= !flips;
            }
            Player::White => {
                self.white |= move_mask | flips;
                self.black &= !flips;
            }
        }
    }

    /// Empty cells adjacent to an opponent disc.
    #[inline]
    pub fn potential_mobility_mask(&self, player: Player) -> u64 {
        neighbours(self.opp(player)) & self.empty_mask()
    }

    /// Own discs adjacent to at least one empty cell.
    #[inline]
    pub fn frontier_mask(&self, player: Player) -> u64 {
        neighbours(self.empty_mask()) & self.own(player)
    }
}

/// Hashes a position with 64-bit FNV-1a over the black mask, the white mask and
/// the side to move.
pub fn compute_hash(board: &Bitboard, player: Player) -> u64 {
    let mut hash = FNV_OFFSET;
    let bytes = board
        .black
        .to_le_bytes()
        .into_iter()
        .chain(board.white.to_le_bytes())
        .chain(std::iter::once(player as u8));
    for byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
