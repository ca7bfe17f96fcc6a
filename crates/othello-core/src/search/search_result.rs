//! Search result types.

use std::time::Duration;

use crate::square::Position;
use crate::types::{Depth, Score};

/// Result of one iterative-deepening search.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    /// `None` when the side to move has no legal move.
    pub best_move: Option<Position>,
    /// Score of `best_move` from the mover's perspective.
    pub score: Score,
    /// Depth of the last completed iteration.
    pub depth: Depth,
    pub n_nodes: u64,
    pub pv_line: Vec<Position>,
    /// `true` when the score is the exact game-theoretic value.
    pub exact: bool,
    pub elapsed: Duration,
}

impl SearchResult {
    /// Result for a position where the side to move must pass.
    pub fn pass(score: Score) -> Self {
        Self {
            best_move: None,
            score,
            depth: 0,
            n_nodes: 0,
            pv_line: vec![],
            exact: false,
            elapsed: Duration::ZERO,
        }
    }
}
