//! Iterative deepening driver.

use std::time::{Duration, Instant};

use log::debug;

use crate::bitboard::Bitboard;
use crate::disc::Player;
use crate::search::aspiration::{aspiration_search, has_time_for_next_iteration};
use crate::search::search_context::SearchContext;
use crate::search::search_result::SearchResult;
use crate::types::Depth;

/// Deepens from depth 1 to `max_depth`, reusing the transposition table
/// between iterations.
///
/// The first iteration always runs to completion. Later iterations may be
/// aborted by the context's deadline or stop flag; an aborted iteration is
/// thrown away and the last completed one is reported.
///
/// # Arguments
///
/// * `ctx` - Search context, with its deadline already set.
/// * `board` - Root position. The side to move must have a legal move.
/// * `player` - Side to move.
/// * `max_depth` - Deepest iteration.
/// * `soft_budget` - Time after which no new iteration starts, once 80% of it is spent.
/// * `exact` - Whether the context searches without pruning.
///
/// # Returns
///
/// The result of the deepest completed iteration.
pub fn iterative_deepening(
    ctx: &mut SearchContext,
    board: &Bitboard,
    player: Player,
    max_depth: Depth,
    soft_budget: Option<Duration>,
    exact: bool,
) -> SearchResult {
    let start = Instant::now();
    let empties = board.empties() as Depth;
    let max_depth = max_depth.max(1);

    let mut result = SearchResult::pass(0);
    let mut prev_score = None;

    for depth in 1..=max_depth {
        let score = aspiration_search(ctx, board, player, depth, prev_score);
        if ctx.is_aborted() {
            debug!("iteration {depth} aborted after {} nodes", ctx.n_nodes);
            break;
        }

        prev_score = Some(score);
        result.best_move = ctx.root_best;
        result.score = score;
        result.depth = depth;
        result.pv_line = ctx.root_pv();
        result.exact = exact && depth >= empties;
        result.n_nodes = ctx.n_nodes;
        result.elapsed = start.elapsed();

        debug!(
            "depth {depth}: score={score} move={} nodes={} time={}ms pv={}",
            result.best_move.map_or_else(|| "--".to_string(), |m| m.to_string()),
            ctx.n_nodes,
            result.elapsed.as_millis(),
            result.pv_line.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(" ")
        );

        ctx.enable_abort();

        if result.exact {
            break;
        }
        if let Some(budget) = soft_budget
            && !has_time_for_next_iteration(start.elapsed().as_secs_f64(), budget.as_secs_f64())
        {
            break;
        }
    }

    result.n_nodes = ctx.n_nodes;
    result.elapsed = start.elapsed();
    result
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
    fn test_reaches_requested_depth() {
        let mut tt = TranspositionTable::new(1 << 15);
        let mut killers = KillerMoves::new();
        let mut history = HistoryTable::new();
        let mut ctx = SearchContext::new(
            &mut tt,
            &mut killers,
            &mut history,
            SelectivityParams::from_selectivity(2),
            EvalProfile::Classic,
            Arc::new(AtomicBool::new(false)),
        );
        let board = Bitboard::initial();
        let result = iterative_deepening(&mut ctx, &board, Player::Black, 5, None, false);
        assert_eq!(result.depth, 5);
        let best = result.best_move.unwrap();
        assert!(board.valid_moves_mask(Player::Black) & best.bitboard() != 0);
        assert_eq!(result.pv_line.first(), Some(&best));
        assert!(!result.exact);
        assert!(result.n_nodes > 0);
    }

    #[test]
    fn test_stop_keeps_first_iteration() {
        let mut tt = TranspositionTable::new(1 << 15);
        let mut killers = KillerMoves::new();
        let mut history = HistoryTable::new();
        // stop requested before the search even starts
        let mut ctx = SearchContext::new(
            &mut tt,
            &mut killers,
            &mut history,
            SelectivityParams::from_selectivity(0),
            EvalProfile::Classic,
            Arc::new(AtomicBool::new(true)),
        );
        let board = Bitboard::initial();
        let result = iterative_deepening(&mut ctx, &board, Player::Black, 20, None, false);
        assert!(result.depth >= 1);
        assert!(result.depth < 20);
        assert!(result.best_move.is_some());
    }
}
