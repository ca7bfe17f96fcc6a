//! Transposition table.
//!
//! Entries are keyed by the 64-bit position hash and stamped with the table's
//! age, which is bumped once per top-level search. When the table is full,
//! stale entries from earlier searches are evicted first.

use std::collections::HashMap;

use crate::square::Position;
use crate::types::{Depth, Score};

/// Fraction of the capacity freed by one eviction pass, in percent.
const EVICTION_PERCENT: usize = 2;

/// Bound type for transposition table entries.
///
/// - `Exact`: the stored score is the exact minimax value
/// - `Lower`: the search failed high, the score is a lower bound
/// - `Upper`: the search failed low, the score is an upper bound
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

/// A single entry in the transposition table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TTEntry {
    pub depth: Depth,
    pub bound: Bound,
    pub score: Score,
    pub best_move: Option<Position>,
    pub age: u32,
}

/// Result of [`provides_score_cutoff`].
///
/// `alpha` and `beta` hold the window narrowed by the entry's bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CutoffProbe {
    pub cutoff: bool,
    pub score: Score,
    pub alpha: Score,
    pub beta: Score,
}

/// Usage counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TTStats {
    pub probes: u64,
    pub hits: u64,
    pub stores: u64,
    pub evictions: u64,
}

impl TTStats {
    /// Counters accumulated since `earlier` was taken.
    pub fn since(&self, earlier: &TTStats) -> TTStats {
        TTStats {
            probes: self.probes.saturating_sub(earlier.probes),
            hits: self.hits.saturating_sub(earlier.hits),
            stores: self.stores.saturating_sub(earlier.stores),
            evictions: self.evictions.saturating_sub(earlier.evictions),
        }
    }

    /// Sum of two sets of counters.
    pub fn merged(&self, other: &TTStats) -> TTStats {
        TTStats {
            probes: self.probes + other.probes,
            hits: self.hits + other.hits,
            stores: self.stores + other.stores,
            evictions: self.evictions + other.evictions,
        }
    }

    pub fn hit_rate(&self) -> f64 {
        if self.probes == 0 { 0.0 } else { self.hits as f64 / self.probes as f64 }
    }
}

/// Position-keyed cache of search results.
pub struct TranspositionTable {
    entries: HashMap<u64, TTEntry>,
    capacity: usize,
    current_age: u32,
    /// Entries stamped with `current_age`.
    fresh: usize,
    stats: TTStats,
}

impl TranspositionTable {
    /// Creates an empty table holding at most `capacity` entries.
    pub fn new(capacity: usize) -> TranspositionTable {
        let capacity = capacity.max(1);
        TranspositionTable {
            entries: HashMap::with_capacity(capacity.min(1 << 20)),
            capacity,
            current_age: 0,
            fresh: 0,
            stats: TTStats::default(),
        }
    }

    /// Looks up the entry for `key`.
    pub fn get(&mut self, key: u64) -> Option<TTEntry> {
        self.stats.probes += 1;
        let entry = self.entries.get(&key).copied();
        if entry.is_some() {
            self.stats.hits += 1;
        }
        entry
    }

    /// Stores an entry for `key`, stamping it with the current age.
    ///
    /// An existing entry for the same key is only replaced when the new one is
    /// exact, at least as deep, or the old one is stale.
    pub fn set(&mut self, key: u64, mut entry: TTEntry) {
        entry.age = self.current_age;
        if let Some(old) = self.entries.get_mut(&key) {
            let stale = old.age != self.current_age;
            if entry.bound == Bound::Exact || entry.depth >= old.depth || stale {
                *old = entry;
                self.stats.stores += 1;
                if stale {
                    self.fresh += 1;
                }
            }
            return;
        }
        if self.entries.len() >= self.capacity {
            self.evict();
        }
        self.entries.insert(key, entry);
        self.fresh += 1;
        self.stats.stores += 1;
    }

    /// Entries left over from earlier searches.
    pub fn stale_len(&self) -> usize {
        self.entries.len() - self.fresh
    }

    /// Frees a batch of slots, taking stale entries before fresh ones.
    fn evict(&mut self) {
        let budget = (self.capacity * EVICTION_PERCENT / 100).max(1);
        let age = self.current_age;
        let mut victims: Vec<u64> = Vec::with_capacity(budget);
        if self.stale_len() > 0 {
            victims.extend(
                self.entries
                    .iter()
                    .filter(|(_, e)| e.age != age)
                    .map(|(&k, _)| k)
                    .take(budget),
            );
        }
        if victims.is_empty() {
            victims.extend(self.entries.keys().copied().take(budget));
        }
        for key in &victims {
            if let Some(removed) = self.entries.remove(key)
                && removed.age == age
            {
                self.fresh -= 1;
            }
        }
        self.stats.evictions += victims.len() as u64;
    }

    /// Starts a new search generation.
    pub fn new_search(&mut self) {
        self.current_age = self.current_age.wrapping_add(1);
        self.fresh = 0;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.fresh = 0;
        self.stats = TTStats::default();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn current_age(&self) -> u32 {
        self.current_age
    }

    pub fn stats(&self) -> TTStats {
        self.stats
    }
}

/// Checks whether a stored entry settles the node or narrows its window.
///
/// # Arguments
///
/// * `entry` - Entry found for the position.
/// * `alpha`, `beta` - Current search window.
/// * `depth` - Remaining depth of the node.
///
/// # Returns
///
/// A probe whose `cutoff` is set when the node can return `score` immediately.
pub fn provides_score_cutoff(entry: &TTEntry, alpha: Score, beta: Score, depth: Depth) -> CutoffProbe {
    let mut probe = CutoffProbe {
        cutoff: false,
        score: entry.score,
        alpha,
        beta,
    };
    if entry.depth < depth {
        return probe;
    }
    match entry.bound {
        Bound::Exact => {
            probe.cutoff = true;
            return probe;
        }
        Bound::Lower => {
            if entry.score >= beta {
                probe.cutoff = true;
                return probe;
            }
            probe.alpha = probe.alpha.max(entry.score);
        }
        Bound::Upper => {
            if entry.score <= alpha {
                probe.cutoff = true;
                return probe;
            }
            probe.beta = probe.beta.min(entry.score);
        }
    }
    if probe.alpha >= probe.beta {
        probe.cutoff = true;
    }
    probe
}

/// Builds an entry, classifying `score` against the original window.
pub fn create_entry(
    score: Score,
    alpha: Score,
    beta: Score,
    depth: Depth,
    best_move: Option<Position>,
) -> TTEntry {
    let bound = if score <= alpha {
        Bound::Upper
    } else if score >= beta {
        Bound::Lower
    } else {
        Bound::Exact
    };
    TTEntry {
        depth,
        bound,
        score,
        best_move,
        age: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(depth: Depth, bound: Bound, score: Score) -> TTEntry {
        TTEntry {
            depth,
            bound,
            score,
            best_move: None,
            age: 0,
        }
    }

    #[test]
    fn test_exact_always_cuts_when_deep_enough() {
        for score in [-500, 0, 500] {
            let probe = provides_score_cutoff(&entry(5, Bound::Exact, score), -100, 100, 5);
            assert!(probe.cutoff);
            assert_eq!(probe.score, score);
        }
        let shallow = provides_score_cutoff(&entry(4, Bound::Exact, 0), -100, 100, 5);
        assert!(!shallow.cutoff);
    }

    #[test]
    fn test_lower_bound() {
        let probe = provides_score_cutoff(&entry(3, Bound::Lower, 150), -100, 100, 3);
        assert!(probe.cutoff);
        let probe = provides_score_cutoff(&entry(3, Bound::Lower, 20), -100, 100, 3);
        assert!(!probe.cutoff);
        assert_eq!(probe.alpha, 20);
        assert_eq!(probe.beta, 100);
    }

    #[test]
    fn test_upper_bound() {
        let probe = provides_score_cutoff(&entry(3, Bound::Upper, -150), -100, 100, 2);
        assert!(probe.cutoff);
        let probe = provides_score_cutoff(&entry(3, Bound::Upper, 40), -100, 100, 2);
        assert!(!probe.cutoff);
        assert_eq!(probe.beta, 40);
        assert_eq!(probe.alpha, -100);
    }

    #[test]
    fn test_window_narrowing() {
        let probe = provides_score_cutoff(&entry(3, Bound::Lower, 10), -100, 11, 3);
        assert!(!probe.cutoff);
        let probe = provides_score_cutoff(&entry(3, Bound::Upper, 10), 9, 100, 3);
        assert!(!probe.cutoff);
        assert_eq!((probe.alpha, probe.beta), (9, 10));
    }

    #[test]
    fn test_create_entry_bounds() {
        assert_eq!(create_entry(-10, -10, 10, 1, None).bound, Bound::Upper);
        assert_eq!(create_entry(10, -10, 10, 1, None).bound, Bound::Lower);
        assert_eq!(create_entry(0, -10, 10, 1, None).bound, Bound::Exact);
    }

    #[test]
    fn test_replacement_policy() {
        let mut tt = TranspositionTable::new(16);
        tt.set(1, entry(5, Bound::Lower, 10));
        tt.set(1, entry(3, Bound::Lower, 20));
        assert_eq!(tt.get(1).map(|e| e.score), Some(10));
        tt.set(1, entry(3, Bound::Exact, 30));
        assert_eq!(tt.get(1).map(|e| e.score), Some(30));
        tt.new_search();
        tt.set(1, entry(1, Bound::Upper, 40));
        let stored = tt.get(1).unwrap();
        assert_eq!(stored.score, 40);
        assert_eq!(stored.age, tt.current_age());
    }

    #[test]
    fn test_eviction_prefers_stale() {
        let mut tt = TranspositionTable::new(100);
        for key in 0..100 {
            tt.set(key, entry(1, Bound::Exact, 0));
        }
        tt.new_search();
        for key in 100..110 {
            tt.set(key, entry(1, Bound::Exact, 0));
        }
        assert!(tt.len() <= 100);
        for key in 100..110 {
            assert!(tt.get(key).is_some(), "fresh entry {key} evicted");
        }
        assert!(tt.stats().evictions >= 10);
    }

    #[test]
    fn test_forced_eviction_makes_progress() {
        let mut tt = TranspositionTable::new(100);
        for key in 0..500 {
            tt.set(key, entry(1, Bound::Exact, 0));
        }
        assert!(tt.len() <= 100);
        assert!(tt.get(499).is_some());
        assert_eq!(tt.stats().stores, 500);
    }

    #[test]
    fn test_full_table_evicts_in_batches() {
        let mut tt = TranspositionTable::new(1000);
        for key in 0..1000 {
            tt.set(key, entry(1, Bound::Exact, 0));
        }
        assert_eq!(tt.stale_len(), 0);
        tt.set(1000, entry(1, Bound::Exact, 0));
        // one pass frees 2% of the capacity
        assert_eq!(tt.stats().evictions, 20);
        assert_eq!(tt.len(), 981);
        for key in 1001..1020 {
            tt.set(key, entry(1, Bound::Exact, 0));
        }
        assert_eq!(tt.stats().evictions, 20);
        assert_eq!(tt.len(), 1000);
    }

    #[test]
    fn test_stale_count_follows_generations() {
        let mut tt = TranspositionTable::new(100);
        for key in 0..10 {
            tt.set(key, entry(1, Bound::Exact, 0));
        }
        tt.new_search();
        assert_eq!(tt.stale_len(), 10);
        tt.set(0, entry(1, Bound::Upper, 5));
        tt.set(1, entry(1, Bound::Upper, 5));
        for key in 10..15 {
            tt.set(key, entry(1, Bound::Exact, 0));
        }
        assert_eq!(tt.stale_len(), 8);
        for key in 15..100 {
            tt.set(key, entry(1, Bound::Exact, 0));
        }
        // the next insert evicts the two oldest-generation entries first
        tt.set(100, entry(1, Bound::Exact, 0));
        assert_eq!(tt.stale_len(), 6);
        assert_eq!(tt.len(), 99);
        tt.clear();
        assert_eq!(tt.stale_len(), 0);
    }
}
