//! Static position evaluation.
//!
//! The evaluator scores a position from the side to move's perspective as a
//! weighted sum of ten positional features. The weight vector depends on the
//! game phase, and close to the end of the game the heuristic is replaced by
//! the exact disc differential.

use crate::bitboard::{Bitboard, CORNER_MASK, EDGE_MASK};
use crate::constants::{DISC_WEIGHT, EVAL_LIMIT, WIN_SCORE};
use crate::disc::Player;
use crate::stability::edge_stable_discs;
use crate::types::Score;

/// Empties at or above which the opening weights apply.
const OPENING_EMPTIES: u32 = 45;
/// Empties at or above which the midgame weights apply.
const MIDGAME_EMPTIES: u32 = 20;

/// X-squares, each paired with the corner it touches diagonally.
const X_SQUARES: [(u64, u64); 4] = [
    (1 << 49, 1 << 56),
    (1 << 54, 1 << 63),
    (1 << 9, 1 << 0),
    (1 << 14, 1 << 7),
];

/// C-squares, each paired with its corner.
const C_SQUARES: [(u64, u64); 8] = [
    (1 << 57, 1 << 56),
    (1 << 48, 1 << 56),
    (1 << 62, 1 << 63),
    (1 << 55, 1 << 63),
    (1 << 1, 1 << 0),
    (1 << 8, 1 << 0),
    (1 << 6, 1 << 7),
    (1 << 15, 1 << 7),
];

/// The four edges as masks.
const EDGES: [u64; 4] = [
    0xFF00_0000_0000_0000,
    0x0000_0000_0000_00FF,
    0x0101_0101_0101_0101,
    0x8080_8080_8080_8080,
];

/// Phase of the game, selected by the number of empty cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Opening,
    Midgame,
    Late,
}

impl Phase {
    pub fn from_empties(empties: u32) -> Phase {
        if empties >= OPENING_EMPTIES {
            Phase::Opening
        } else if empties >= MIDGAME_EMPTIES {
            Phase::Midgame
        } else {
            Phase::Late
        }
    }

    fn weights(self) -> &'static Weights {
        match self {
            Phase::Opening => &OPENING_WEIGHTS,
            Phase::Midgame => &MIDGAME_WEIGHTS,
            Phase::Late => &LATE_WEIGHTS,
        }
    }
}

/// Evaluation profile. The two profiles differ in how early the heuristic
/// hands over to the exact disc count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvalProfile {
    /// Switches to the disc differential at 20 empties.
    #[default]
    Classic,
    /// Keeps the heuristic until 12 empties.
    Tournament,
}

impl EvalProfile {
    /// Empties at or below which the disc differential is used.
    pub fn endgame_threshold(self) -> u32 {
        match self {
            EvalProfile::Classic => 20,
            EvalProfile::Tournament => 12,
        }
    }
}

/// Weight per feature.
#[derive(Debug, Clone, Copy)]
struct Weights {
    mobility: i32,
    potential_mobility: i32,
    stability: i32,
    frontier: i32,
    corner: i32,
    x_square: i32,
    c_square: i32,
    parity: i32,
    edge: i32,
    edge_occupancy: i32,
}

const OPENING_WEIGHTS: Weights = Weights {
    mobility: 12,
    potential_mobility: 8,
    stability: 4,
    frontier: -6,
    corner: 30,
    x_square: -25,
    c_square: -10,
    parity: 0,
    edge: 2,
    edge_occupancy: 2,
};

const MIDGAME_WEIGHTS: Weights = Weights {
    mobility: 10,
    potential_mobility: 5,
    stability: 10,
    frontier: -5,
    corner: 35,
    x_square: -20,
    c_square: -8,
    parity: 2,
    edge: 4,
    edge_occupancy: 4,
};

const LATE_WEIGHTS: Weights = Weights {
    mobility: 6,
    potential_mobility: 2,
    stability: 16,
    frontier: -2,
    corner: 30,
    x_square: -10,
    c_square: -4,
    parity: 6,
    edge: 6,
    edge_occupancy: 6,
};

/// Raw feature values, each oriented so that positive favours the mover.
///
/// Ratio features are in `[-100, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Features {
    pub mobility: i32,
    pub potential_mobility: i32,
    pub stability: i32,
    /// Positive when the mover has more frontier discs.
    pub frontier: i32,
    pub corner: i32,
    /// Own minus opposing X-squares next to an empty corner.
    pub x_square: i32,
    /// Own minus opposing C-squares next to an empty corner.
    pub c_square: i32,
    pub parity: i32,
    pub edge: i32,
    pub edge_occupancy: i32,
}

/// `100 * (a - b) / (a + b)`, or 0 when both are 0.
#[inline]
fn ratio(a: u32, b: u32) -> i32 {
    if a + b == 0 {
        0
    } else {
        100 * (a as i32 - b as i32) / (a + b) as i32
    }
}

fn danger_squares(own: u64, empty: u64, squares: &[(u64, u64)]) -> i32 {
    squares
        .iter()
        .filter(|(sq, corner)| own & sq != 0 && empty & corner != 0)
        .count() as i32
}

/// Discs on edges that have no empty cell left.
fn discs_on_full_edges(own: u64, empty: u64) -> u32 {
    EDGES
        .iter()
        .filter(|&&edge| edge & empty == 0)
        .map(|&edge| (edge & own).count_ones())
        .sum()
}

impl Features {
    /// Extracts the features of `board` for `player`.
    pub fn extract(board: &Bitboard, player: Player) -> Features {
        let own = board.own(player);
        let opp = board.opp(player);
        let empty = board.empty_mask();
        let opponent = player.opposite();

        let own_moves = board.valid_moves_mask(player).count_ones();
        let opp_moves = board.valid_moves_mask(opponent).count_ones();

        let parity = if board.empties() % 2 == 1 { 25 } else { -25 };

        Features {
            mobility: ratio(own_moves, opp_moves),
            potential_mobility: ratio(
                board.potential_mobility_mask(player).count_ones(),
                board.potential_mobility_mask(opponent).count_ones(),
            ),
            stability: ratio(
                edge_stable_discs(own).count_ones(),
                edge_stable_discs(opp).count_ones(),
            ),
            frontier: ratio(
                board.frontier_mask(player).count_ones(),
                board.frontier_mask(opponent).count_ones(),
            ),
            corner: 25 * ((own & CORNER_MASK).count_ones() as i32 - (opp & CORNER_MASK).count_ones() as i32),
            x_square: danger_squares(own, empty, &X_SQUARES) - danger_squares(opp, empty, &X_SQUARES),
            c_square: danger_squares(own, empty, &C_SQUARES) - danger_squares(opp, empty, &C_SQUARES),
            parity,
            edge: ratio(
                (own & EDGE_MASK & !CORNER_MASK).count_ones(),
                (opp & EDGE_MASK & !CORNER_MASK).count_ones(),
            ),
            edge_occupancy: ratio(discs_on_full_edges(own, empty), discs_on_full_edges(opp, empty)),
        }
    }

    fn weighted_sum(&self, w: &Weights) -> i32 {
        self.mobility * w.mobility
            + self.potential_mobility * w.potential_mobility
            + self.stability * w.stability
            + self.frontier * w.frontier
            + self.corner * w.corner
            + self.x_square * 25 * w.x_square
            + self.c_square * 25 * w.c_square
            + self.parity * w.parity
            + self.edge * w.edge
            + self.edge_occupancy * w.edge_occupancy
    }
}

/// Scores a finished game from `player`'s perspective.
///
/// Any win is worth more than any heuristic value; a bigger margin scores higher.
#[inline]
pub fn terminal_score(board: &Bitboard, player: Player) -> Score {
    let diff = board.disc_diff(player);
    match diff.signum() {
        1 => WIN_SCORE + diff,
        -1 => -WIN_SCORE + diff,
        _ => 0,
    }
}

/// Evaluates `board` from `player`'s perspective.
///
/// # Arguments
///
/// * `board` - Position to evaluate.
/// * `player` - Side to move.
/// * `profile` - Selects the endgame threshold.
///
/// # Returns
///
/// The disc differential times `DISC_WEIGHT` at or below the profile's
/// threshold, otherwise the weighted feature sum clamped to `±EVAL_LIMIT`.
pub fn evaluate(board: &Bitboard, player: Player, profile: EvalProfile) -> Score {
    let empties = board.empties();
    if empties <= profile.endgame_threshold() {
        return board.disc_diff(player) * DISC_WEIGHT;
    }
    let features = Features::extract(board, player);
    let weights = Phase::from_empties(empties).weights();
    features.weighted_sum(weights).clamp(-EVAL_LIMIT, EVAL_LIMIT)
}
