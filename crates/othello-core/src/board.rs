//! Grid representation of an Othello board and the board-level rules.
//!
//! The grid is what callers see; the search works on the [`Bitboard`] twin,
//! derived on demand with [`Board::to_bitboard`].

use std::fmt;

use crate::bitboard::Bitboard;
use crate::constants::{BOARD_SIZE, BOARD_SQUARES};
use crate::disc::{Disc, Player};
use crate::error::ParseError;
use crate::square::{Position, positions};

/// Outcome of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Black,
    White,
    Draw,
}

/// Disc counts per colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Score {
    pub black: u32,
    pub white: u32,
}

/// An 8x8 grid of discs, indexed `cells[row][col]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    cells: [[Disc; BOARD_SIZE]; BOARD_SIZE],
}

impl Default for Board {
    fn default() -> Self {
        Board::initial()
    }
}

impl Board {
    /// A board with no discs.
    pub fn empty() -> Board {
        Board {
            cells: [[Disc::Empty; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// The standard starting position: white on `(3,3)` and `(4,4)`, black on
    /// `(3,4)` and `(4,3)`.
    pub fn initial() -> Board {
        Board::from_bitboard(&Bitboard::initial())
    }

    /// Builds the grid from a bitboard.
    pub fn from_bitboard(bitboard: &Bitboard) -> Board {
        let mut board = Board::empty();
        for pos in Position::all() {
            board.set(pos, bitboard.disc_at(pos));
        }
        board
    }

    /// Derives the bitboard twin of this grid.
    pub fn to_bitboard(&self) -> Bitboard {
        let mut black = 0;
        let mut white = 0;
        for pos in Position::all() {
            match self.get(pos) {
                Disc::Black => black |= pos.bitboard(),
                Disc::White => white |= pos.bitboard(),
                Disc::Empty => {}
            }
        }
        Bitboard::new(black, white)
    }

    /// Creates a board from a string representation.
    ///
    /// The string holds 64 cells in row-major order starting at `(0, 0)`:
    /// `X` for black, `O` for white, `-` for empty. Whitespace is ignored.
    ///
    /// # Arguments
    /// * `board_string` - A string representing the board.
    ///
    /// # Returns
    /// The parsed board, or a `ParseError` for a bad length or character.
    pub fn from_string(board_string: &str) -> Result<Board, ParseError> {
        let cells: Vec<char> = board_string.chars().filter(|c| !c.is_whitespace()).collect();
        if cells.len() != BOARD_SQUARES {
            return Err(ParseError::BoardLength(cells.len()));
        }
        let mut board = Board::empty();
        for (pos, c) in Position::all().zip(cells) {
            let disc = Disc::from_char(c).ok_or(ParseError::BoardChar(c))?;
            board.set(pos, disc);
        }
        Ok(board)
    }

    #[inline]
    pub fn get(&self, pos: Position) -> Disc {
        self.cells[pos.row as usize][pos.col as usize]
    }

    #[inline]
    pub fn set(&mut self, pos: Position, disc: Disc) {
        self.cells[pos.row as usize][pos.col as usize] = disc;
    }

    /// Disc counts of both colours.
    pub fn score(&self) -> Score {
        let bitboard = self.to_bitboard();
        Score {
            black: bitboard.count(Player::Black),
            white: bitboard.count(Player::White),
        }
    }

    /// Returns `true` if `player` may place a disc at `pos`.
    pub fn is_valid_move(&self, pos: Position, player: Player) -> bool {
        pos.is_on_board() && self.to_bitboard().valid_moves_mask(player) & pos.bitboard() != 0
    }

    /// Legal moves for `player`, ordered by bit index.
    pub fn valid_moves(&self, player: Player) -> Vec<Position> {
        positions(self.to_bitboard().valid_moves_mask(player)).collect()
    }

    /// `true` when neither side can move.
    pub fn is_game_over(&self) -> bool {
        self.to_bitboard().is_game_over()
    }

    /// Side with more discs, or `Draw` on a tie.
    pub fn winner(&self) -> Winner {
        let score = self.score();
        match score.black.cmp(&score.white) {
            std::cmp::Ordering::Greater => Winner::Black,
            std::cmp::Ordering::Less => Winner::White,
            std::cmp::Ordering::Equal => Winner::Draw,
        }
    }

    /// Renders the board as 64 characters without separators.
    pub fn to_compact_string(&self) -> String {
        Position::all().map(|pos| self.get(pos).to_char()).collect()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  a b c d e f g h")?;
        for row in 0..BOARD_SIZE {
            write!(f, "{}", row + 1)?;
            for col in 0..BOARD_SIZE {
                write!(f, " {}", self.cells[row][col].to_char())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_initial_board() {
        let board = Board::initial();
        assert_eq!(board.get(Position::new(3, 3)), Disc::White);
        assert_eq!(board.get(Position::new(4, 4)), Disc::White);
        assert_eq!(board.get(Position::new(3, 4)), Disc::Black);
        assert_eq!(board.get(Position::new(4, 3)), Disc::Black);
        assert_eq!(board.score(), Score { black: 2, white: 2 });
    }

    #[test]
    fn test_bitboard_roundtrip_random() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let a: u64 = rng.random();
            let b: u64 = rng.random();
            let bitboard = Bitboard::new(a & !b, b & !a);
            assert_eq!(Board::from_bitboard(&bitboard).to_bitboard(), bitboard);
        }
    }

    #[test]
    fn test_legality_symmetry() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut bitboard = Bitboard::initial();
        let mut player = Player::Black;
        for _ in 0..30 {
            let board = Board::from_bitboard(&bitboard);
            let moves = board.valid_moves(player);
            for pos in Position::all() {
                assert_eq!(board.is_valid_move(pos, player), moves.contains(&pos));
            }
            if moves.is_empty() {
                player = player.opposite();
                continue;
            }
            let pos = moves[rng.random_range(0..moves.len())];
            bitboard = bitboard.apply_move(player, pos).unwrap().0;
            player = player.opposite();
        }
    }

    #[test]
    fn test_from_string() {
        let text = "\
            --------\
            --------\
            --------\
            ---OX---\
            ---XO---\
            --------\
            --------\
            --------";
        let board = Board::from_string(text).unwrap();
        assert_eq!(board, Board::initial());
        assert_eq!(Board::from_string(&board.to_compact_string()).unwrap(), board);
        assert_eq!(Board::from_string("X-"), Err(ParseError::BoardLength(2)));
    }

    #[test]
    fn test_game_over_and_winner() {
        // black fills everything except one cell next to nothing capturable
        let mut text = "X".repeat(63);
        text.push('-');
        let board = Board::from_string(&text).unwrap();
        assert!(board.is_game_over());
        assert_eq!(board.winner(), Winner::Black);

        let draw: String = "XO".repeat(32);
        let board = Board::from_string(&draw).unwrap();
        assert!(board.is_game_over());
        assert_eq!(board.winner(), Winner::Draw);
        assert!(!Board::initial().is_game_over());
    }
}
