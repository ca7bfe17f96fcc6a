//! Global constants

use crate::types::Score;

/// Number of rows (and columns) on the board.
pub const BOARD_SIZE: usize = 8;

/// Number of squares on the board.
pub const BOARD_SQUARES: usize = 64;

/// Maximum number of plies stored in the search stack.
///
/// Passes consume a ply without filling a square, so this is larger than 60.
pub const MAX_PLY: usize = 128;

/// Highest difficulty level accepted by the level table.
pub const MAX_LEVEL: usize = 60;

/// Infinity score for search algorithms.
pub const SCORE_INF: Score = 1_000_000;

/// Base score of a decided game. Any won terminal position scores above any
/// heuristic evaluation.
pub const WIN_SCORE: Score = 100_000;

/// Heuristic scores are clamped to this magnitude.
pub const EVAL_LIMIT: Score = 50_000;

/// Weight of one disc when the evaluation falls back to the disc differential.
pub const DISC_WEIGHT: Score = 100;
