//! Aspiration windows around the previous iteration's score.

use log::trace;

use crate::bitboard::Bitboard;
use crate::constants::SCORE_INF;
use crate::disc::Player;
use crate::search::node_kind::Root;
use crate::search::search;
use crate::search::search_context::SearchContext;
use crate::types::{Depth, Score};

/// Initial half-width of the window.
pub const INITIAL_WINDOW: Score = 100;
/// Half-width at which the controller gives up and searches the full window.
pub const MAX_WINDOW: Score = 1600;

/// Share of the time budget after which no new iteration is started.
pub const ITERATION_TIME_SHARE: f64 = 0.8;

/// Searches the root at `depth` with a window centred on `prev_score`.
///
/// On a fail-high or fail-low the half-width doubles, capped at
/// [`MAX_WINDOW`]; once the cap is reached the search is repeated with an
/// unbounded window. Without a previous score the full window is used directly.
///
/// # Arguments
///
/// * `ctx` - Search context.
/// * `board` - Root position.
/// * `player` - Side to move.
/// * `depth` - Iteration depth.
/// * `prev_score` - Score of the previous iteration, if any.
///
/// # Returns
///
/// The root score. Meaningless if the context aborted.
pub fn aspiration_search(
    ctx: &mut SearchContext,
    board: &Bitboard,
    player: Player,
    depth: Depth,
    prev_score: Option<Score>,
) -> Score {
    let Some(prev) = prev_score else {
        return search::<Root>(ctx, board, player, depth, -SCORE_INF, SCORE_INF, 0);
    };

    let mut window = INITIAL_WINDOW;
    while window < MAX_WINDOW {
        let alpha = prev.saturating_sub(window).max(-SCORE_INF);
        let beta = prev.saturating_add(window).min(SCORE_INF);
        let score = search::<Root>(ctx, board, player, depth, alpha, beta, 0);
        if ctx.is_aborted() {
            return score;
        }
        if score > alpha && score < beta {
            return score;
        }
        trace!("aspiration fail at depth {depth}: [{alpha}, {beta}] -> {score}");
        window = (window * 2).min(MAX_WINDOW);
    }
    search::<Root>(ctx, board, player, depth, -SCORE_INF, SCORE_INF, 0)
}

/// Returns `true` while enough of the budget is left to start another iteration.
pub fn has_time_for_next_iteration(elapsed_secs: f64, budget_secs: f64) -> bool {
    elapsed_secs <= budget_secs * ITERATION_TIME_SHARE
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    use super::*;
    use crate::eval::EvalProfile;
    use crate::level::SelectivityParams;
    use crate::move_list::{HistoryTable, KillerMoves};
    use crate::transposition_table::TranspositionTable;

    #[test]
    fn test_window_agrees_with_full_search() {
        let board = Bitboard::initial();
        let full = {
            let mut tt = TranspositionTable::new(1 << 14);
            let mut killers = KillerMoves::new();
            let mut history = HistoryTable::new();
            let mut ctx = SearchContext::new(
                &mut tt,
                &mut killers,
                &mut history,
                SelectivityParams::exact(),
                EvalProfile::Classic,
                Arc::new(AtomicBool::new(false)),
            );
            search::<Root>(&mut ctx, &board, Player::Black, 4, -SCORE_INF, SCORE_INF, 0)
        };
        // a deliberately wrong guess forces the window to widen
        for guess in [full, full + 5_000, full - 5_000] {
            let mut tt = TranspositionTable::new(1 << 14);
            let mut killers = KillerMoves::new();
            let mut history = HistoryTable::new();
            let mut ctx = SearchContext::new(
                &mut tt,
                &mut killers,
                &mut history,
                SelectivityParams::exact(),
                EvalProfile::Classic,
                Arc::new(AtomicBool::new(false)),
            );
            let score = aspiration_search(&mut ctx, &board, Player::Black, 4, Some(guess));
            assert_eq!(score, full, "guess {guess}");
        }
    }

    #[test]
    fn test_time_share() {
        assert!(has_time_for_next_iteration(0.5, 1.0));
        assert!(has_time_for_next_iteration(0.8, 1.0));
        assert!(!has_time_for_next_iteration(0.81, 1.0));
    }
}
