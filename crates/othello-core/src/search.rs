//! Game tree search engine.
//!
//! Negamax principal variation search with a transposition table, killer and
//! history move ordering, late move reductions, late move pruning and a
//! corner-only quiescence search. Iterative deepening and aspiration windows
//! live in the submodules.

pub mod aspiration;
pub mod iterative_deepening;
pub mod node_kind;
pub mod search_context;
pub mod search_result;
pub mod time_control;

use crate::bitboard::{Bitboard, CORNER_MASK, compute_hash};
use crate::constants::{EVAL_LIMIT, MAX_PLY};
use crate::disc::Player;
use crate::eval::{evaluate, terminal_score};
use crate::move_list::{MoveList, OrderingHints};
use crate::search::node_kind::{NodeKind, Principal, Scout};
use crate::search::search_context::SearchContext;
use crate::square::{Position, positions};
use crate::transposition_table::{create_entry, provides_score_cutoff};
use crate::types::{Depth, Score};

pub use crate::constants::SCORE_INF;

/// Maximum number of moves explored per quiescence node.
const QUIESCENCE_MAX_MOVES: usize = 4;
/// Maximum quiescence depth below the horizon.
const QUIESCENCE_MAX_PLY: usize = 4;

/// Margin for reverse futility pruning at depth 1, before the selectivity multiplier.
const FUTILITY_MARGIN: f64 = 300.0;
/// Margin per depth for razoring, before the selectivity multiplier.
const RAZOR_MARGIN: f64 = 400.0;

/// Late move reduction for the `move_index`-th move at `depth`.
///
/// # Arguments
///
/// * `lmr_base` - Base term from the selectivity parameters.
/// * `depth` - Remaining depth.
/// * `move_index` - Zero-based index of the move in the ordered list.
///
/// # Returns
///
/// `floor(lmr_base + ln(depth) * ln(move_index) / 3)` clamped to `[0, depth - 2]`.
pub fn lmr_reduction(lmr_base: f64, depth: Depth, move_index: usize) -> Depth {
    if depth < 2 || move_index == 0 {
        return 0;
    }
    let r = (lmr_base + (depth as f64).ln() * (move_index as f64).ln() / 3.0).floor() as Depth;
    r.clamp(0, depth - 2)
}

/// Searches a child node, choosing the PV or non-PV variant.
#[inline]
fn search_child(
    pv_child: bool,
    ctx: &mut SearchContext,
    board: &Bitboard,
    player: Player,
    depth: Depth,
    alpha: Score,
    beta: Score,
    ply: usize,
) -> Score {
    if pv_child {
        search::<Principal>(ctx, board, player, depth, alpha, beta, ply)
    } else {
        search::<Scout>(ctx, board, player, depth, alpha, beta, ply)
    }
}

/// Principal variation search.
///
/// # Arguments
///
/// * `ctx` - Search context.
/// * `board` - Position to search.
/// * `player` - Side to move.
/// * `depth` - Remaining depth; at or below zero the quiescence search takes over.
/// * `alpha`, `beta` - Search window.
/// * `ply` - Distance from the root.
///
/// # Returns
///
/// The score from `player`'s perspective. The value is meaningless once the
/// context reports an abort.
pub fn search<K: NodeKind>(
    ctx: &mut SearchContext,
    board: &Bitboard,
    player: Player,
    depth: Depth,
    mut alpha: Score,
    mut beta: Score,
    ply: usize,
) -> Score {
    if ctx.visit_node() {
        return 0;
    }
    if K::FULL_WINDOW {
        ctx.clear_pv(ply);
    }

    let moves_mask = board.valid_moves_mask(player) & if K::IS_ROOT { ctx.root_moves } else { !0 };
    let opponent = player.opposite();

    if moves_mask == 0 {
        if board.has_moves(opponent) {
            // exact solving must not lose depth on passes
            let pass_depth = if ctx.params.pruning { depth - 1 } else { depth };
            return -search_child(K::FULL_WINDOW, ctx, board, opponent, pass_depth, -beta, -alpha, ply);
        }
        return terminal_score(board, player);
    }

    if depth <= 0 || ply >= MAX_PLY - 1 {
        return quiescence(ctx, board, player, alpha, beta, ply, 0);
    }

    // Transposition table probe
    let key = compute_hash(board, player);
    let tt_entry = ctx.tt.get(key);
    let tt_move = tt_entry.and_then(|e| e.best_move);
    if !K::IS_ROOT && let Some(entry) = tt_entry {
        let probe = provides_score_cutoff(&entry, alpha, beta, depth);
        if probe.cutoff {
            return probe.score;
        }
        alpha = probe.alpha;
        beta = probe.beta;
    }
    // bounds are classified against the window actually searched
    let window_alpha = alpha;

    // Futility pruning and razoring
    if !K::FULL_WINDOW && ctx.params.pruning && depth <= 2 && alpha.abs() < EVAL_LIMIT && beta.abs() < EVAL_LIMIT {
        let static_eval = evaluate(board, player, ctx.profile);
        if depth == 1 {
            let margin = (FUTILITY_MARGIN * ctx.params.futility_mult) as Score;
            if static_eval - margin >= beta {
                return static_eval - margin;
            }
        }
        let margin = (RAZOR_MARGIN * ctx.params.razor_mult * depth as f64) as Score;
        if static_eval + margin <= alpha {
            let score = quiescence(ctx, board, player, alpha, alpha + 1, ply, 0);
            if score <= alpha {
                return score;
            }
        }
    }

    // Move ordering
    let mut move_list = MoveList::with_moves(board, player, moves_mask);
    move_list.order(&OrderingHints {
        tt_move,
        killers: &*ctx.killers,
        history: &*ctx.history,
        ply,
        player,
    });

    let mut best_score = -SCORE_INF;
    let mut best_move: Option<Position> = None;

    for (move_index, mv) in move_list.iter().enumerate() {
        // Late move pruning
        if ctx.params.pruning
            && !K::IS_ROOT
            && depth >= 6
            && move_index >= ctx.params.lmp_threshold(depth)
        {
            break;
        }

        let next = board.make_move_with_flips(player, mv.pos, mv.flipped);
        let score = if move_index == 0 {
            -search_child(K::FULL_WINDOW, ctx, &next, opponent, depth - 1, -beta, -alpha, ply + 1)
        } else {
            let reduction = if ctx.params.pruning && depth >= 3 && move_index >= 4 && !mv.pos.is_corner() {
                lmr_reduction(ctx.params.lmr_base, depth, move_index)
            } else {
                0
            };

            if depth >= ctx.params.nws_min_depth {
                let mut score = -search::<Scout>(
                    ctx,
                    &next,
                    opponent,
                    depth - 1 - reduction,
                    -alpha - 1,
                    -alpha,
                    ply + 1,
                );
                if reduction > 0 && score > alpha {
                    score = -search::<Scout>(ctx, &next, opponent, depth - 1, -alpha - 1, -alpha, ply + 1);
                }
                if K::FULL_WINDOW && score > alpha && score < beta {
                    score = -search::<Principal>(ctx, &next, opponent, depth - 1, -beta, -alpha, ply + 1);
                }
                score
            } else {
                -search_child(K::FULL_WINDOW, ctx, &next, opponent, depth - 1, -beta, -alpha, ply + 1)
            }
        };

        if ctx.is_aborted() {
            return 0;
        }

        if score > best_score {
            best_score = score;
            best_move = Some(mv.pos);

            if score > alpha {
                alpha = score;
                if K::FULL_WINDOW {
                    ctx.update_pv(ply, mv.pos);
                }
                if alpha >= beta {
                    ctx.killers.add_killer(ply, mv.pos);
                    ctx.history.update(mv.pos, player, depth);
                    break;
                }
            }
        }
    }

    if K::IS_ROOT {
        ctx.root_best = best_move;
    }

    // a root limited to some of its moves has no value for the position itself
    let partial_root = K::IS_ROOT && moves_mask != board.valid_moves_mask(player);
    if !partial_root {
        ctx.tt.set(key, create_entry(best_score, window_alpha, beta, depth, best_move));
    }

    best_score
}

/// Quiescence search over corner moves.
///
/// The static evaluation is used as a lower bound; only corner captures are
/// explored, at most [`QUIESCENCE_MAX_MOVES`] per node and
/// [`QUIESCENCE_MAX_PLY`] plies deep.
pub fn quiescence(
    ctx: &mut SearchContext,
    board: &Bitboard,
    player: Player,
    mut alpha: Score,
    beta: Score,
    ply: usize,
    qply: usize,
) -> Score {
    ctx.n_nodes += 1;
    let opponent = player.opposite();
    let moves = board.valid_moves_mask(player);
    if moves == 0 && !board.has_moves(opponent) {
        return terminal_score(board, player);
    }

    let stand_pat = evaluate(board, player, ctx.profile);
    if stand_pat >= beta || qply >= QUIESCENCE_MAX_PLY || ply >= MAX_PLY - 1 {
        return stand_pat;
    }
    if stand_pat > alpha {
        alpha = stand_pat;
    }

    let mut best_score = stand_pat;
    for pos in positions(moves & CORNER_MASK).take(QUIESCENCE_MAX_MOVES) {
        let Some((next, _)) = board.apply_move(player, pos) else {
            continue;
        };
        let score = -quiescence(ctx, &next, opponent, -beta, -alpha, ply + 1, qply + 1);
        if score > best_score {
            best_score = score;
            if score > alpha {
                alpha = score;
                if alpha >= beta {
                    break;
                }
            }
        }
    }
    best_score
}
