//! Difficulty levels and search depth configuration.
//!
//! A level in `0..=60` and the number of empty cells select a depth cap and a
//! selectivity in `0..=5`. Selectivity 0 searches almost full width; 5 prunes
//! the most. Close to the end of the game the level switches to an exact solve.

use std::fmt;
use std::sync::OnceLock;

use crate::constants::MAX_LEVEL;
use crate::types::Depth;

/// Most aggressive selectivity.
pub const MAX_SELECTIVITY: u8 = 5;

/// Base late-move-pruning thresholds, indexed by depth.
const LMP_TABLE: [usize; 16] = [99, 99, 99, 99, 99, 99, 10, 11, 12, 13, 14, 15, 16, 18, 20, 22];

/// Search limits for one (level, empties) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelConfig {
    /// Maximum iterative-deepening depth.
    pub depth: Depth,
    pub selectivity: u8,
    /// `true` when the position should be solved to the end.
    pub exact: bool,
}

/// Named difficulty tiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
    Beginner,
    Novice,
    Intermediate,
    Advanced,
    Expert,
    Master,
    Grandmaster,
}

impl Tier {
    /// Returns the tier containing `level`. Levels above the maximum are Grandmaster.
    pub fn from_level(level: u8) -> Tier {
        match level {
            0..=8 => Tier::Beginner,
            9..=17 => Tier::Novice,
            18..=26 => Tier::Intermediate,
            27..=35 => Tier::Advanced,
            36..=44 => Tier::Expert,
            45..=53 => Tier::Master,
            _ => Tier::Grandmaster,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tier::Beginner => "Beginner",
            Tier::Novice => "Novice",
            Tier::Intermediate => "Intermediate",
            Tier::Advanced => "Advanced",
            Tier::Expert => "Expert",
            Tier::Master => "Master",
            Tier::Grandmaster => "Grandmaster",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Concrete pruning knobs derived from a selectivity value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectivityParams {
    pub selectivity: u8,
    /// Base term of the late-move-reduction formula.
    pub lmr_base: f64,
    /// Added to `LMP_TABLE[depth]` before late-move pruning kicks in.
    pub lmp_bonus: usize,
    pub futility_mult: f64,
    pub razor_mult: f64,
    /// Minimum depth at which later moves are scouted with a null window.
    pub nws_min_depth: Depth,
    /// `false` disables reductions, late-move pruning, futility and razoring.
    pub pruning: bool,
}

impl SelectivityParams {
    /// Translates `selectivity` (clamped to `0..=5`) into pruning knobs.
    ///
    /// # Arguments
    ///
    /// * `selectivity` - 0 for the most complete search, 5 for the most aggressive.
    ///
    /// # Returns
    ///
    /// LMR base in `0.75..=2.5`, LMP bonus in `0..=12`, futility multiplier in
    /// `1.0..=2.0` and razor multiplier in `1.0..=1.8`.
    pub fn from_selectivity(selectivity: u8) -> SelectivityParams {
        let s = selectivity.min(MAX_SELECTIVITY);
        let sf = s as f64;
        SelectivityParams {
            selectivity: s,
            lmr_base: 0.75 + 0.35 * sf,
            lmp_bonus: 12 * (MAX_SELECTIVITY - s) as usize / MAX_SELECTIVITY as usize,
            futility_mult: 2.0 - 0.2 * sf,
            razor_mult: 1.8 - 0.16 * sf,
            nws_min_depth: if s >= 3 { 1 } else { 2 },
            pruning: true,
        }
    }

    /// Parameters for an exact solve: nothing is pruned or reduced.
    pub fn exact() -> SelectivityParams {
        SelectivityParams {
            pruning: false,
            ..SelectivityParams::from_selectivity(0)
        }
    }

    /// Move index from which late-move pruning stops iterating at `depth`.
    pub fn lmp_threshold(&self, depth: Depth) -> usize {
        let idx = (depth.max(0) as usize).min(LMP_TABLE.len() - 1);
        LMP_TABLE[idx] + self.lmp_bonus
    }
}

impl LevelConfig {
    pub fn params(&self) -> SelectivityParams {
        if self.exact {
            SelectivityParams::exact()
        } else {
            SelectivityParams::from_selectivity(self.selectivity)
        }
    }
}

const TABLE_SIZE: usize = MAX_LEVEL as usize + 1;

static LEVEL_TABLE: OnceLock<[[LevelConfig; TABLE_SIZE]; TABLE_SIZE]> = OnceLock::new();

fn mid_depth(level: u32) -> Depth {
    (1 + level * 13 / 60) as Depth
}

fn end_depth(level: u32) -> Depth {
    if level < 5 { 0 } else { (level * 20 / 60) as Depth }
}

fn build_entry(level: u32, empties: u32) -> LevelConfig {
    let empties_depth = empties as Depth;
    if empties_depth <= end_depth(level) {
        return LevelConfig {
            depth: empties_depth,
            selectivity: 0,
            exact: true,
        };
    }
    LevelConfig {
        depth: mid_depth(level).min(empties_depth).max(1),
        selectivity: MAX_SELECTIVITY - (level * MAX_SELECTIVITY as u32 / 60) as u8,
        exact: false,
    }
}

fn table() -> &'static [[LevelConfig; TABLE_SIZE]; TABLE_SIZE] {
    LEVEL_TABLE.get_or_init(|| {
        std::array::from_fn(|level| std::array::from_fn(|empties| build_entry(level as u32, empties as u32)))
    })
}

/// Retrieves the configuration for a level and number of empties.
///
/// # Arguments
///
/// * `level` - Difficulty in `0..=60`; larger values are clamped.
/// * `empties` - Empty cells on the board; larger values are clamped.
///
/// # Returns
///
/// The depth cap, selectivity and whether to solve exactly.
pub fn get_level(level: u8, empties: u32) -> LevelConfig {
    let level = (level as usize).min(TABLE_SIZE - 1);
    let empties = (empties as usize).min(TABLE_SIZE - 1);
    table()[level][empties]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers() {
        assert_eq!(Tier::from_level(0), Tier::Beginner);
        assert_eq!(Tier::from_level(9), Tier::Novice);
        assert_eq!(Tier::from_level(26), Tier::Intermediate);
        assert_eq!(Tier::from_level(35), Tier::Advanced);
        assert_eq!(Tier::from_level(44), Tier::Expert);
        assert_eq!(Tier::from_level(53), Tier::Master);
        assert_eq!(Tier::from_level(60), Tier::Grandmaster);
        assert_eq!(Tier::Expert.to_string(), "Expert");
    }

    #[test]
    fn test_level_extremes() {
        let weakest = get_level(0, 50);
        assert_eq!(weakest.depth, 1);
        assert_eq!(weakest.selectivity, 5);
        assert!(!weakest.exact);

        let strongest = get_level(60, 50);
        assert_eq!(strongest.depth, 14);
        assert_eq!(strongest.selectivity, 0);
        assert!(!strongest.exact);
    }

    #[test]
    fn test_exact_solve_near_end() {
        let config = get_level(60, 18);
        assert!(config.exact);
        assert_eq!(config.depth, 18);
        assert!(!config.params().pruning);

        // weak levels never solve exactly, except with no empties left
        assert!(!get_level(4, 3).exact);
        assert_eq!(get_level(4, 3).depth, 1);
    }

    #[test]
    fn test_depth_is_monotonic_in_level() {
        for empties in 0..=60 {
            for level in 0..60u8 {
                let a = get_level(level, empties);
                let b = get_level(level + 1, empties);
                assert!(b.depth >= a.depth || b.exact, "level {level} empties {empties}");
                assert!(b.selectivity <= a.selectivity);
            }
        }
    }

    #[test]
    fn test_selectivity_ranges() {
        let loose = SelectivityParams::from_selectivity(0);
        let tight = SelectivityParams::from_selectivity(5);
        assert!((loose.lmr_base - 0.75).abs() < 1e-9);
        assert!((tight.lmr_base - 2.5).abs() < 1e-9);
        assert_eq!(loose.lmp_bonus, 12);
        assert_eq!(tight.lmp_bonus, 0);
        assert!((loose.futility_mult - 2.0).abs() < 1e-9);
        assert!((tight.futility_mult - 1.0).abs() < 1e-9);
        assert!((loose.razor_mult - 1.8).abs() < 1e-9);
        assert!((tight.razor_mult - 1.0).abs() < 1e-9);
        assert_eq!(loose.nws_min_depth, 2);
        assert_eq!(tight.nws_min_depth, 1);
        assert_eq!(SelectivityParams::from_selectivity(9), tight);
    }

    #[test]
    fn test_lmp_threshold() {
        let params = SelectivityParams::from_selectivity(5);
        assert_eq!(params.lmp_threshold(6), 10);
        assert_eq!(params.lmp_threshold(40), 22);
        assert_eq!(SelectivityParams::from_selectivity(0).lmp_threshold(6), 22);
    }
}
