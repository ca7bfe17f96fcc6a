//! Time allocation for games played on a clock.

use std::collections::VecDeque;
use std::time::Duration;

use log::debug;

use crate::bitboard::Bitboard;
use crate::disc::Player;
use crate::stability::edge_stable_discs;

/// Number of recent moves remembered for the historical multiplier.
const USAGE_WINDOW: usize = 8;

/// Share of the increment counted as usable time for this move.
const INCREMENT_SHARE: f64 = 0.8;

/// Empties at or below which the endgame override applies.
const ENDGAME_OVERRIDE_EMPTIES: u32 = 10;

/// Safety buffer in milliseconds kept in reserve on every move.
const TIME_BUFFER_MS: u64 = 50;

/// Remaining clock in milliseconds below which every move is played on the emergency budget.
const LOW_CLOCK_MS: u64 = 1_000;

/// Clock state of the side to move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockState {
    pub remaining: Duration,
    pub increment: Duration,
}

/// Budget for one move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeAllocation {
    /// Time the search aims to use.
    pub target: Duration,
    /// Hard limit for this move.
    pub max_time: Duration,
    /// Budget when the clock is nearly exhausted. Becomes the target once
    /// the clock cannot pay `min_think` for every remaining move.
    pub emergency: Duration,
}

impl TimeAllocation {
    /// Allocation for a fixed per-move limit.
    pub fn fixed(limit: Duration) -> TimeAllocation {
        TimeAllocation {
            target: limit,
            max_time: limit,
            emergency: limit.mul_f64(0.3),
        }
    }
}

/// Calculates a time allocation factor based on the number of moves played.
///
/// # Arguments
///
/// * `moves_played` - Moves made so far in the game
///
/// # Returns
///
/// A multiplier for time allocation (1.0 = base allocation)
fn phase_factor(moves_played: u32) -> f64 {
    match moves_played {
        0..=9 => 0.6,
        10..=19 => 0.9,
        20..=39 => 1.3,
        40..=49 => 1.15,
        _ => 0.8,
    }
}

/// Rough estimate of how hard the position is: many moves and few stable
/// discs mean a wide, unsettled tree.
fn complexity_factor(board: &Bitboard, player: Player) -> f64 {
    let mobility = board.valid_moves_mask(player).count_ones() as f64;
    let stable = (edge_stable_discs(board.black).count_ones() + edge_stable_discs(board.white).count_ones()) as f64;
    (0.8 + 0.04 * mobility - 0.01 * stable).clamp(0.7, 1.4)
}

/// Converts clock state and game phase into a per-move budget.
#[derive(Debug, Clone)]
pub struct TimeManager {
    min_think: Duration,
    max_think: Duration,
    /// Ratios of used to target time for the most recent moves.
    usage: VecDeque<f64>,
}

impl TimeManager {
    pub fn new(min_think: Duration, max_think: Duration) -> TimeManager {
        TimeManager {
            min_think,
            max_think: max_think.max(min_think),
            usage: VecDeque::with_capacity(USAGE_WINDOW),
        }
    }

    /// Shrinks the allocation after overruns and grows it after underruns.
    fn historical_factor(&self) -> f64 {
        if self.usage.is_empty() {
            return 1.0;
        }
        let avg = self.usage.iter().sum::<f64>() / self.usage.len() as f64;
        if avg <= 0.0 {
            return 1.25;
        }
        (1.0 / avg).clamp(0.8, 1.25)
    }

    /// Computes the budget for the next move.
    ///
    /// # Arguments
    ///
    /// * `clock` - Remaining time and increment of the side to move.
    /// * `board` - Current position.
    /// * `player` - Side to move.
    /// * `moves_played` - Moves made so far in the game.
    /// * `is_endgame` - Whether the search will try to solve the position.
    ///
    /// # Returns
    ///
    /// Target, hard maximum and emergency budgets.
    pub fn allocate_time(
        &self,
        clock: &ClockState,
        board: &Bitboard,
        player: Player,
        moves_played: u32,
        is_endgame: bool,
    ) -> TimeAllocation {
        let remaining = clock
            .remaining
            .saturating_sub(Duration::from_millis(TIME_BUFFER_MS));
        let remaining_s = remaining.as_secs_f64();
        let empties = board.empties();
        let moves_left = empties.div_ceil(2).max(1);

        let target_s = if empties <= ENDGAME_OVERRIDE_EMPTIES {
            // spend a growing share of the clock as the solvable horizon nears
            let fraction = 0.15 + 0.05 * (ENDGAME_OVERRIDE_EMPTIES - empties) as f64;
            remaining_s * fraction
        } else {
            let base = remaining_s / moves_left as f64 + INCREMENT_SHARE * clock.increment.as_secs_f64();
            let phase = if is_endgame { 1.3 } else { phase_factor(moves_played) };
            base * phase * complexity_factor(board, player) * self.historical_factor()
        };

        let target = Duration::from_secs_f64(target_s.max(0.0)).clamp(self.min_think, self.max_think);
        let max_time = (target * 2).min(remaining.mul_f64(0.25));
        let emergency = target.mul_f64(0.3).min(remaining.mul_f64(0.05));
        let low_clock = remaining < (self.min_think * moves_left).max(Duration::from_millis(LOW_CLOCK_MS));
        let (target, max_time) = if low_clock {
            (emergency, emergency * 2)
        } else {
            (target.min(max_time), max_time)
        };

        debug!(
            "time allocation: empties={empties} moves_played={moves_played} target={}ms max={}ms emergency={}ms low_clock={low_clock}",
            target.as_millis(),
            max_time.as_millis(),
            emergency.as_millis()
        );

        TimeAllocation {
            target,
            max_time,
            emergency,
        }
    }

    /// Records how long a move took compared to its target.
    pub fn record_usage(&mut self, target: Duration, used: Duration) {
        if target.is_zero() {
            return;
        }
        if self.usage.len() == USAGE_WINDOW {
            self.usage.pop_front();
        }
        self.usage.push_back(used.as_secs_f64() / target.as_secs_f64());
    }

    pub fn reset(&mut self) {
        self.usage.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;

    fn clock(remaining_ms: u64, increment_ms: u64) -> ClockState {
        ClockState {
            remaining: Duration::from_millis(remaining_ms),
            increment: Duration::from_millis(increment_ms),
        }
    }

    fn manager() -> TimeManager {
        TimeManager::new(Duration::from_millis(10), Duration::from_secs(30))
    }

    #[test]
    fn test_allocation_limits() {
        let tm = manager();
        let board = Bitboard::initial();
        let alloc = tm.allocate_time(&clock(60_000, 0), &board, Player::Black, 0, false);
        assert!(alloc.target >= Duration::from_millis(10));
        assert!(alloc.target <= alloc.max_time);
        assert!(alloc.max_time <= Duration::from_millis(60_000 / 4));
        assert!(alloc.emergency <= Duration::from_millis(60_000 / 20));
    }

    #[test]
    fn test_low_clock_plays_on_emergency_budget() {
        let tm = manager();
        let board = Bitboard::initial();
        let normal = tm.allocate_time(&clock(60_000, 0), &board, Player::Black, 0, false);
        assert!(normal.target > normal.emergency);

        let low = tm.allocate_time(&clock(800, 0), &board, Player::Black, 0, false);
        assert_eq!(low.target, low.emergency);
        assert!(low.target <= Duration::from_millis(38));
        assert!(low.max_time <= Duration::from_millis(76));

        let flagged = tm.allocate_time(&clock(0, 0), &board, Player::Black, 0, false);
        assert_eq!(flagged.target, Duration::ZERO);
    }

    #[test]
    fn test_midgame_gets_more_than_opening() {
        let tm = manager();
        let board = Bitboard::initial();
        let opening = tm.allocate_time(&clock(120_000, 0), &board, Player::Black, 2, false);
        let midgame = tm.allocate_time(&clock(120_000, 0), &board, Player::Black, 25, false);
        assert!(midgame.target > opening.target);
    }

    #[test]
    fn test_history_shrinks_after_overruns() {
        let mut tm = manager();
        let board = Bitboard::initial();
        let before = tm.allocate_time(&clock(120_000, 0), &board, Player::Black, 25, false);
        for _ in 0..10 {
            tm.record_usage(Duration::from_millis(100), Duration::from_millis(200));
        }
        let after = tm.allocate_time(&clock(120_000, 0), &board, Player::Black, 25, false);
        assert!(after.target < before.target);
        assert_eq!(tm.usage.len(), USAGE_WINDOW);

        tm.reset();
        for _ in 0..4 {
            tm.record_usage(Duration::from_millis(100), Duration::from_millis(20));
        }
        let relaxed = tm.allocate_time(&clock(120_000, 0), &board, Player::Black, 25, false);
        assert!(relaxed.target > before.target);
    }

    #[test]
    fn test_endgame_override_grows_as_empties_shrink() {
        let tm = TimeManager::new(Duration::from_millis(1), Duration::from_secs(600));
        // 10 empties, then 4 empties
        let ten = Board::from_string(&format!("{}{}", "XO".repeat(27), "-".repeat(10)))
            .unwrap()
            .to_bitboard();
        let four = Board::from_string(&format!("{}{}", "XO".repeat(30), "-".repeat(4)))
            .unwrap()
            .to_bitboard();
        let c = clock(100_000, 0);
        let a = tm.allocate_time(&c, &ten, Player::Black, 50, true);
        let b = tm.allocate_time(&c, &four, Player::Black, 56, true);
        assert!(b.target > a.target);
        assert!(b.max_time <= Duration::from_millis(25_000));
    }
}
