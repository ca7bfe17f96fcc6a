//! Engine facade.
//!
//! [`Engine`] owns the search tables and turns an [`AnalysisRequest`] into a
//! move recommendation: it looks up the level table, budgets time, runs
//! iterative deepening and falls back to a static move choice if the search
//! pipeline panics.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::bitboard::{Bitboard, CORNER_MASK, EDGE_MASK};
use crate::constants::MAX_LEVEL;
use crate::disc::Player;
use crate::eval::{EvalProfile, evaluate, terminal_score};
use crate::game_state::GameCore;
use crate::level::{LevelConfig, Tier, get_level};
use crate::move_list::{HistoryTable, KillerMoves};
use crate::search::iterative_deepening::iterative_deepening;
use crate::search::search_context::SearchContext;
use crate::search::search_result::SearchResult;
use crate::search::time_control::{ClockState, TimeAllocation, TimeManager};
use crate::square::{Position, positions};
use crate::transposition_table::{TTStats, TranspositionTable};
use crate::types::{Depth, Score};

/// Engine-wide settings.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineOptions {
    /// Maximum number of transposition table entries.
    pub tt_capacity: usize,
    /// Level used when a request carries no skill.
    pub default_level: u8,
    /// Per-move limit used when a request carries neither a limit nor a clock.
    pub default_time_limit: Option<Duration>,
    /// Forces an evaluation profile instead of choosing one by tier.
    pub eval_profile: Option<EvalProfile>,
    /// Factor applied to the history table before every analysis.
    pub history_aging: f64,
    pub min_think: Duration,
    pub max_think: Duration,
}

impl EngineOptions {
    /// Creates options with the given table size and defaults for the rest.
    #[must_use]
    pub fn new(tt_capacity: usize) -> Self {
        EngineOptions {
            tt_capacity,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: u8) -> Self {
        self.default_level = level.min(MAX_LEVEL as u8);
        self
    }

    #[must_use]
    pub fn with_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.default_time_limit = limit;
        self
    }

    #[must_use]
    pub fn with_eval_profile(mut self, profile: Option<EvalProfile>) -> Self {
        self.eval_profile = profile;
        self
    }

    #[must_use]
    pub fn with_history_aging(mut self, factor: f64) -> Self {
        self.history_aging = factor.clamp(0.0, 1.0);
        self
    }

    /// Bounds applied to clock-based allocations.
    #[must_use]
    pub fn with_think_bounds(mut self, min_think: Duration, max_think: Duration) -> Self {
        self.min_think = min_think;
        self.max_think = max_think.max(min_think);
        self
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            tt_capacity: 1 << 20,
            default_level: 30,
            default_time_limit: Some(Duration::from_secs(5)),
            eval_profile: None,
            history_aging: 0.95,
            min_think: Duration::from_millis(20),
            max_think: Duration::from_secs(30),
        }
    }
}

/// Search limits for one position, independent of any game history.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchOptions {
    pub time_limit: Option<Duration>,
    pub skill: Option<u8>,
    /// Recent opponent moves, used to seed the killer slots of the reply ply.
    pub opponent_moves: Vec<Position>,
    pub clock: Option<ClockState>,
    /// Moves played so far, for the clock model.
    pub moves_played: u32,
}

/// A request to analyze the position of a game.
#[derive(Clone, Debug)]
pub struct AnalysisRequest {
    pub game_core: GameCore,
    pub time_limit: Option<Duration>,
    /// Level in `0..=60`.
    pub skill: Option<u8>,
    pub opponent_moves: Vec<Position>,
    pub clock: Option<ClockState>,
}

impl AnalysisRequest {
    pub fn new(game_core: GameCore) -> Self {
        AnalysisRequest {
            game_core,
            time_limit: None,
            skill: None,
            opponent_moves: Vec::new(),
            clock: None,
        }
    }

    #[must_use]
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_skill(mut self, skill: u8) -> Self {
        self.skill = Some(skill);
        self
    }

    #[must_use]
    pub fn with_opponent_moves(mut self, moves: Vec<Position>) -> Self {
        self.opponent_moves = moves;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: ClockState) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Search limits carried by this request.
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            time_limit: self.time_limit,
            skill: self.skill,
            opponent_moves: self.opponent_moves.clone(),
            clock: self.clock,
            moves_played: self.game_core.move_history().len() as u32,
        }
    }
}

/// Diagnostics attached to an analysis.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisStats {
    /// Table activity during this analysis only.
    pub tt: TTStats,
    pub tt_entries: usize,
    pub level: u8,
    pub tier: Tier,
    pub selectivity: u8,
    pub profile: EvalProfile,
    /// `true` when `evaluation` is the exact game-theoretic value.
    pub exact: bool,
    /// `true` when the move came from the fallback selector.
    pub fallback: bool,
}

/// Outcome of an analysis.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisResult {
    /// `None` when the side to move has to pass or the game is over.
    pub best_move: Option<Position>,
    /// Score from the side to move's perspective.
    pub evaluation: Score,
    pub depth: Depth,
    pub nodes: u64,
    pub time_used: Duration,
    pub pv: Vec<Position>,
    pub stats: AnalysisStats,
}

/// Picks the evaluation profile for a tier.
fn profile_for_tier(tier: Tier) -> EvalProfile {
    match tier {
        Tier::Master | Tier::Grandmaster => EvalProfile::Tournament,
        _ => EvalProfile::Classic,
    }
}

/// Chooses a legal move without searching: a corner, else an edge, else any.
///
/// # Arguments
///
/// * `board` - Current position.
/// * `player` - Side to move.
/// * `root_moves` - Mask of the moves that may be chosen.
///
/// # Returns
///
/// The lowest-indexed move of the best class, or `None` if no allowed move is legal.
pub fn fallback_move(board: &Bitboard, player: Player, root_moves: u64) -> Option<Position> {
    let legal = board.valid_moves_mask(player) & root_moves;
    [legal & CORNER_MASK, legal & EDGE_MASK, legal]
        .into_iter()
        .find(|&mask| mask != 0)
        .and_then(|mask| positions(mask).next())
}

/// Single-threaded analysis engine.
pub struct Engine {
    tt: TranspositionTable,
    killers: KillerMoves,
    history: HistoryTable,
    options: EngineOptions,
    time_manager: TimeManager,
    stop: Arc<AtomicBool>,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(EngineOptions::default())
    }
}

impl Engine {
    pub fn new(options: EngineOptions) -> Engine {
        Engine {
            tt: TranspositionTable::new(options.tt_capacity),
            killers: KillerMoves::new(),
            history: HistoryTable::new(),
            time_manager: TimeManager::new(options.min_think, options.max_think),
            options,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Flag that aborts the running search once set.
    ///
    /// [`Engine::analyze`] clears it before searching; [`Engine::analyze_position`]
    /// leaves it alone, so a stop raised before the search starts still applies.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Forgets everything learned so far, for a new game.
    pub fn reset(&mut self) {
        self.tt.clear();
        self.killers.clear();
        self.history.clear();
        self.time_manager.reset();
    }

    /// Analyzes the position of `request.game_core`.
    pub fn analyze(&mut self, request: &AnalysisRequest) -> AnalysisResult {
        let core = &request.game_core;
        self.stop.store(false, Ordering::Relaxed);
        let result = self.analyze_position(&core.bitboard(), core.current_player(), &request.search_options(), !0);
        info!(
            "game {}: best={} eval={} depth={} nodes={} time={}ms",
            core.id(),
            result.best_move.map_or_else(|| "pass".to_string(), |m| m.to_string()),
            result.evaluation,
            result.depth,
            result.nodes,
            result.time_used.as_millis()
        );
        result
    }

    /// Analyzes a bare position, considering only the root moves in `root_moves`.
    ///
    /// # Arguments
    ///
    /// * `board` - Position to analyze.
    /// * `player` - Side to move.
    /// * `options` - Time, skill and ordering hints.
    /// * `root_moves` - Mask of root moves to search; `!0` for all of them.
    ///
    /// # Returns
    ///
    /// The best allowed move with its evaluation and search statistics.
    pub fn analyze_position(
        &mut self,
        board: &Bitboard,
        player: Player,
        options: &SearchOptions,
        root_moves: u64,
    ) -> AnalysisResult {
        let start = Instant::now();
        let level = options.skill.unwrap_or(self.options.default_level).min(MAX_LEVEL as u8);
        let tier = Tier::from_level(level);
        let profile = self.options.eval_profile.unwrap_or_else(|| profile_for_tier(tier));
        let config = get_level(level, board.empties());
        let tt_before = self.tt.stats();

        let mut stats = AnalysisStats {
            tt: TTStats::default(),
            tt_entries: self.tt.len(),
            level,
            tier,
            selectivity: config.params().selectivity,
            profile,
            exact: false,
            fallback: false,
        };

        if board.valid_moves_mask(player) & root_moves == 0 {
            let game_over = board.is_game_over();
            stats.exact = game_over;
            return AnalysisResult {
                best_move: None,
                evaluation: if game_over { terminal_score(board, player) } else { evaluate(board, player, profile) },
                depth: 0,
                nodes: 0,
                time_used: start.elapsed(),
                pv: vec![],
                stats,
            };
        }

        let allocation = match (options.clock, options.time_limit.or(self.options.default_time_limit)) {
            (Some(clock), _) => Some(self.time_manager.allocate_time(
                &clock,
                board,
                player,
                options.moves_played,
                config.exact,
            )),
            (None, Some(limit)) => Some(TimeAllocation::fixed(limit)),
            (None, None) => None,
        };

        self.prepare_tables(&options.opponent_moves);
        debug!(
            "analyze: level={level} ({tier}) depth={} selectivity={} exact={} profile={profile:?}",
            config.depth, stats.selectivity, config.exact
        );

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_search(board, player, &config, profile, allocation, root_moves, start)
        }));

        let search_result = match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!("search panicked, falling back to static move choice");
                // the tables may hold half-written state
                self.tt.clear();
                self.killers.clear();
                stats.fallback = true;
                let best_move = fallback_move(board, player, root_moves);
                let score = best_move
                    .and_then(|mv| board.apply_move(player, mv))
                    .map_or(0, |(next, _)| -evaluate(&next, player.opposite(), profile));
                SearchResult {
                    best_move,
                    score,
                    depth: 0,
                    n_nodes: 0,
                    pv_line: best_move.into_iter().collect(),
                    exact: false,
                    elapsed: start.elapsed(),
                }
            }
        };

        let time_used = start.elapsed();
        if options.clock.is_some()
            && let Some(allocation) = allocation
        {
            self.time_manager.record_usage(allocation.target, time_used);
        }

        stats.tt = self.tt.stats().since(&tt_before);
        stats.tt_entries = self.tt.len();
        stats.exact = search_result.exact;

        AnalysisResult {
            best_move: search_result.best_move,
            evaluation: search_result.score,
            depth: search_result.depth,
            nodes: search_result.n_nodes,
            time_used,
            pv: search_result.pv_line,
            stats,
        }
    }

    /// Ages the tables and seeds the reply-ply killers.
    fn prepare_tables(&mut self, opponent_moves: &[Position]) {
        self.tt.new_search();
        self.killers.clear();
        self.history.age(self.options.history_aging);
        for &mv in opponent_moves.iter().rev() {
            self.killers.add_killer(1, mv);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_search(
        &mut self,
        board: &Bitboard,
        player: Player,
        config: &LevelConfig,
        profile: EvalProfile,
        allocation: Option<TimeAllocation>,
        root_moves: u64,
        start: Instant,
    ) -> SearchResult {
        fail_point();
        let mut ctx = SearchContext::new(
            &mut self.tt,
            &mut self.killers,
            &mut self.history,
            config.params(),
            profile,
            Arc::clone(&self.stop),
        );
        ctx.root_moves = root_moves;
        ctx.set_deadline(allocation.map(|a| start + a.max_time));
        iterative_deepening(
            &mut ctx,
            board,
            player,
            config.depth,
            allocation.map(|a| a.target),
            config.exact,
        )
    }
}

#[cfg(test)]
thread_local! {
    static FAIL_NEXT_SEARCH: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

#[cfg(test)]
fn fail_point() {
    if FAIL_NEXT_SEARCH.with(|fail| fail.replace(false)) {
        panic!("search failure injected by test");
    }
}

#[cfg(not(test))]
#[inline(always)]
fn fail_point() {}
