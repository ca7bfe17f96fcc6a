//! Search context for maintaining state during game tree search.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::constants::MAX_PLY;
use crate::eval::EvalProfile;
use crate::level::SelectivityParams;
use crate::move_list::{HistoryTable, KillerMoves};
use crate::square::Position;
use crate::transposition_table::TranspositionTable;

/// Nodes between two polls of the clock and the stop flag.
const POLL_INTERVAL: u64 = 256;

/// A record stored for each ply in the search stack.
#[derive(Clone, Copy)]
struct StackRecord {
    /// Principal variation from this ply, `pv_len` moves long.
    pv: [Option<Position>; MAX_PLY],
    pv_len: usize,
}

/// State shared by every node of one search.
///
/// The tables are borrowed from the owning engine, so one context never
/// outlives the search that created it and no two searches share tables.
pub struct SearchContext<'a> {
    pub tt: &'a mut TranspositionTable,
    pub killers: &'a mut KillerMoves,
    pub history: &'a mut HistoryTable,
    /// Pruning knobs for this search.
    pub params: SelectivityParams,
    pub profile: EvalProfile,
    /// Number of nodes searched in this context.
    pub n_nodes: u64,
    /// Legal root moves to consider, as a mask. `!0` means all of them.
    pub root_moves: u64,
    /// Best root move of the last completed root search.
    pub root_best: Option<Position>,
    deadline: Option<Instant>,
    stop: Arc<AtomicBool>,
    can_abort: bool,
    aborted: bool,
    next_poll: u64,
    stack: Box<[StackRecord]>,
}

impl<'a> SearchContext<'a> {
    /// Creates a new search context.
    ///
    /// # Arguments
    /// * `tt` - Transposition table of the owning engine.
    /// * `killers` - Killer table, cleared by the caller between searches.
    /// * `history` - History table, aged by the caller between searches.
    /// * `params` - Pruning knobs.
    /// * `profile` - Evaluation profile.
    /// * `stop` - External stop request.
    pub fn new(
        tt: &'a mut TranspositionTable,
        killers: &'a mut KillerMoves,
        history: &'a mut HistoryTable,
        params: SelectivityParams,
        profile: EvalProfile,
        stop: Arc<AtomicBool>,
    ) -> SearchContext<'a> {
        SearchContext {
            tt,
            killers,
            history,
            params,
            profile,
            n_nodes: 0,
            root_moves: !0,
            root_best: None,
            deadline: None,
            stop,
            can_abort: false,
            aborted: false,
            next_poll: POLL_INTERVAL,
            stack: vec![
                StackRecord {
                    pv: [None; MAX_PLY],
                    pv_len: 0,
                };
                MAX_PLY + 1
            ]
            .into_boxed_slice(),
        }
    }

    /// Sets the wall-clock limit after which the search aborts.
    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    /// Allows the search to be aborted. Until this is called, the clock and
    /// the stop flag are ignored so that the first iteration always finishes.
    pub fn enable_abort(&mut self) {
        self.can_abort = true;
    }

    /// Counts a node and polls the clock every few hundred nodes.
    ///
    /// # Returns
    /// `true` once the search has to be abandoned.
    #[inline]
    pub fn visit_node(&mut self) -> bool {
        self.n_nodes += 1;
        if self.aborted {
            return true;
        }
        if self.can_abort && self.n_nodes >= self.next_poll {
            self.next_poll = self.n_nodes + POLL_INTERVAL;
            let out_of_time = self.deadline.is_some_and(|d| Instant::now() >= d);
            if out_of_time || self.stop.load(Ordering::Relaxed) {
                self.aborted = true;
            }
        }
        self.aborted
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Empties the PV at `ply`.
    #[inline]
    pub fn clear_pv(&mut self, ply: usize) {
        if let Some(record) = self.stack.get_mut(ply) {
            record.pv_len = 0;
        }
    }

    /// Sets the PV at `ply` to `mv` followed by the PV of `ply + 1`.
    pub fn update_pv(&mut self, ply: usize, mv: Position) {
        if ply + 1 >= self.stack.len() {
            return;
        }
        let (head, tail) = self.stack.split_at_mut(ply + 1);
        let child = &tail[0];
        let record = &mut head[ply];
        let len = child.pv_len.min(MAX_PLY - 1);
        record.pv[0] = Some(mv);
        record.pv[1..=len].copy_from_slice(&child.pv[..len]);
        record.pv_len = len + 1;
    }

    /// Principal variation found from the root.
    pub fn root_pv(&self) -> Vec<Position> {
        let root = &self.stack[0];
        root.pv[..root.pv_len].iter().flatten().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pv_propagation() {
        let mut tt = TranspositionTable::new(16);
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
        let a = Position::new(2, 3);
        let b = Position::new(2, 2);
        let c = Position::new(1, 1);
        ctx.clear_pv(2);
        ctx.update_pv(2, c);
        ctx.update_pv(1, b);
        ctx.update_pv(0, a);
        assert_eq!(ctx.root_pv(), vec![a, b, c]);
        ctx.clear_pv(1);
        ctx.update_pv(0, a);
        assert_eq!(ctx.root_pv(), vec![a]);
    }

    #[test]
    fn test_abort_requires_enable() {
        let mut tt = TranspositionTable::new(16);
        let mut killers = KillerMoves::new();
        let mut history = HistoryTable::new();
        let stop = Arc::new(AtomicBool::new(true));
        let mut ctx = SearchContext::new(
            &mut tt,
            &mut killers,
            &mut history,
            SelectivityParams::from_selectivity(0),
            EvalProfile::Classic,
            stop,
        );
        for _ in 0..1000 {
            assert!(!ctx.visit_node());
        }
        ctx.enable_abort();
        let mut aborted = false;
        for _ in 0..POLL_INTERVAL {
            aborted |= ctx.visit_node();
        }
        assert!(aborted);
        assert!(ctx.is_aborted());
    }
}
