//! Move generation and ordering.
//!
//! Legal moves are collected into a fixed-capacity [`MoveList`] and sorted by a
//! static ordering score that combines the transposition table move, corner
//! bonus, a positional weight table, killer moves and the history heuristic.

use arrayvec::ArrayVec;

use crate::bitboard::Bitboard;
use crate::constants::MAX_PLY;
use crate::disc::Player;
use crate::square::{Position, positions};
use crate::types::Depth;

/// Maximum number of legal moves in an Othello position.
const MAX_MOVES: usize = 34;

/// Bonus for the move suggested by the transposition table.
const TT_MOVE_VALUE: i32 = 10_000;
/// Bonus for corner moves.
const CORNER_VALUE: i32 = 5_000;
/// Base bonus for killer moves, scaled by `2 - rank`.
const KILLER_VALUE: i32 = 1_000;
/// Number of killer slots per ply.
const KILLERS_PER_PLY: usize = 2;

/// Static positional weights, indexed `[row][col]`.
#[rustfmt::skip]
pub const POSITION_WEIGHTS: [[i32; 8]; 8] = [
    [120, -20, 20,  5,  5, 20, -20, 120],
    [-20, -40, -5, -5, -5, -5, -40, -20],
    [ 20,  -5, 15,  3,  3, 15,  -5,  20],
    [  5,  -5,  3,  3,  3,  3,  -5,   5],
    [  5,  -5,  3,  3,  3,  3,  -5,   5],
    [ 20,  -5, 15,  3,  3, 15,  -5,  20],
    [-20, -40, -5, -5, -5, -5, -40, -20],
    [120, -20, 20,  5,  5, 20, -20, 120],
];

/// Moves that caused a beta cutoff, per ply, most recent first.
#[derive(Clone, Debug)]
pub struct KillerMoves {
    slots: Vec<[Option<Position>; KILLERS_PER_PLY]>,
}

impl Default for KillerMoves {
    fn default() -> Self {
        Self::new()
    }
}

impl KillerMoves {
    pub fn new() -> KillerMoves {
        KillerMoves {
            slots: vec![[None; KILLERS_PER_PLY]; MAX_PLY],
        }
    }

    /// Records `mv` as the newest killer at `ply`.
    ///
    /// An existing entry for the same move is moved to the front rather than
    /// duplicated; the oldest entry falls off when the slots are full.
    pub fn add_killer(&mut self, ply: usize, mv: Position) {
        let Some(slot) = self.slots.get_mut(ply) else {
            return;
        };
        if slot[0] == Some(mv) {
            return;
        }
        // slot[1] is either mv itself or the oldest killer; both are dropped
        slot[1] = slot[0];
        slot[0] = Some(mv);
    }

    /// Returns `0` for the newest killer at `ply`, `1` for the older one.
    pub fn rank(&self, ply: usize, mv: Position) -> Option<usize> {
        self.slots.get(ply)?.iter().position(|&k| k == Some(mv))
    }

    /// Killers at `ply`, most recent first.
    pub fn get(&self, ply: usize) -> impl Iterator<Item = Position> + '_ {
        self.slots.get(ply).into_iter().flatten().flatten().copied()
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = [None; KILLERS_PER_PLY]);
    }
}

/// Cutoff statistics per (player, cell).
#[derive(Clone, Debug)]
pub struct HistoryTable {
    scores: [[u32; 64]; 2],
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryTable {
    pub fn new() -> HistoryTable {
        HistoryTable {
            scores: [[0; 64]; 2],
        }
    }

    /// Adds `depth²` to the entry of `mv` for `player`.
    pub fn update(&mut self, mv: Position, player: Player, depth: Depth) {
        let depth = depth.max(0) as u32;
        let entry = &mut self.scores[player.index()][mv.bit_index() as usize];
        *entry = entry.saturating_add(depth * depth);
    }

    #[inline]
    pub fn get(&self, mv: Position, player: Player) -> u32 {
        self.scores[player.index()][mv.bit_index() as usize]
    }

    /// Multiplies every entry by `factor`.
    pub fn age(&mut self, factor: f64) {
        for entry in self.scores.iter_mut().flatten() {
            *entry = (*entry as f64 * factor) as u32;
        }
    }

    pub fn clear(&mut self) {
        self.scores = [[0; 64]; 2];
    }
}

/// Represents a single move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Move {
    /// The cell where the disc is placed.
    pub pos: Position,
    /// Opponent discs flipped by this move.
    pub flipped: u64,
    /// Ordering score (higher = searched earlier).
    pub value: i32,
}

/// Inputs used to score moves for ordering.
pub struct OrderingHints<'a> {
    pub tt_move: Option<Position>,
    pub killers: &'a KillerMoves,
    pub history: &'a HistoryTable,
    pub ply: usize,
    pub player: Player,
}

/// Static ordering score of `mv` for `player`.
///
/// # Arguments
///
/// * `mv` - Move to score.
/// * `hints` - TT move, killer and history tables for the current node.
///
/// # Returns
///
/// The sum of every ordering bonus that applies to `mv`.
pub fn ordering_score(mv: Position, hints: &OrderingHints<'_>) -> i32 {
    let mut score = POSITION_WEIGHTS[mv.row as usize][mv.col as usize];
    if hints.tt_move == Some(mv) {
        score += TT_MOVE_VALUE;
    }
    if mv.is_corner() {
        score += CORNER_VALUE;
    }
    if let Some(rank) = hints.killers.rank(hints.ply, mv) {
        score += KILLER_VALUE * (KILLERS_PER_PLY - rank) as i32;
    }
    score += (hints.history.get(mv, hints.player) / 10).min(i32::MAX as u32) as i32;

    let dist = ((2 * mv.row as i32 - 7).abs() + (2 * mv.col as i32 - 7).abs()) / 2;
    score += (7 - dist) * 2;
    score
}

/// Legal moves of one position.
#[derive(Clone, Debug)]
pub struct MoveList {
    moves: ArrayVec<Move, MAX_MOVES>,
}

impl MoveList {
    /// Generates all legal moves for `player`.
    #[inline]
    pub fn new(board: &Bitboard, player: Player) -> MoveList {
        Self::with_moves(board, player, board.valid_moves_mask(player))
    }

    /// Creates a list from a precomputed move mask.
    ///
    /// # Arguments
    ///
    /// * `board` - Current position.
    /// * `player` - Side to move.
    /// * `moves_mask` - Subset of the legal moves to include.
    pub fn with_moves(board: &Bitboard, player: Player, moves_mask: u64) -> MoveList {
        let mut moves = ArrayVec::new();
        for pos in positions(moves_mask) {
            let flipped = board.flips_for_move(player, pos);
            if flipped == 0 {
                continue;
            }
            moves.push(Move {
                pos,
                flipped,
                value: 0,
            });
        }
        MoveList { moves }
    }

    /// Scores each move and sorts the list in descending order.
    ///
    /// The sort is stable, so equal scores keep bit-index order.
    pub fn order(&mut self, hints: &OrderingHints<'_>) {
        for mv in self.moves.iter_mut() {
            mv.value = ordering_score(mv.pos, hints);
        }
        self.moves.sort_by(|a, b| b.value.cmp(&a.value));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Move> {
        self.moves.iter()
    }

    pub fn first(&self) -> Option<&Move> {
        self.moves.first()
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type Item = &'a Move;
    type IntoIter = std::slice::Iter<'a, Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.moves.iter()
    }
}
