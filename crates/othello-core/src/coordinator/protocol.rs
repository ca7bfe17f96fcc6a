//! Messages exchanged with search workers, and the rules for splitting a
//! job across workers and merging their answers.

use crate::bitboard::Bitboard;
use crate::disc::Player;
use crate::engine::{AnalysisResult, SearchOptions};
use crate::square::positions;

pub type JobId = u64;
pub type WorkerId = usize;

/// Minimum number of root moves before a job is split.
pub const MIN_MOVES_TO_SPLIT: usize = 4;
/// Minimum number of idle workers before a job is split.
pub const MIN_WORKERS_TO_SPLIT: usize = 2;

/// A search assigned to one worker.
#[derive(Clone, Debug)]
pub struct WorkerRequest {
    /// Sub-job id, `"{job_id}-{worker_id}"`.
    pub id: String,
    pub bitboard: Bitboard,
    pub player: Player,
    pub options: SearchOptions,
    /// Root moves this worker is responsible for.
    pub root_moves: u64,
}

/// A worker's answer to one [`WorkerRequest`].
#[derive(Clone, Debug)]
pub struct WorkerResponse {
    pub id: String,
    pub worker_id: WorkerId,
    /// The partial analysis, or a description of the fault.
    pub result: Result<AnalysisResult, String>,
}

pub fn sub_job_id(job_id: JobId, worker_id: WorkerId) -> String {
    format!("{job_id}-{worker_id}")
}

/// Splits a sub-job id back into job and worker ids.
pub fn parse_sub_job_id(id: &str) -> Option<(JobId, WorkerId)> {
    let (job, worker) = id.split_once('-')?;
    Some((job.parse().ok()?, worker.parse().ok()?))
}

/// Whether a job with `n_moves` root moves is split over `idle` workers.
pub fn should_partition(n_moves: usize, idle: usize) -> bool {
    n_moves >= MIN_MOVES_TO_SPLIT && idle >= MIN_WORKERS_TO_SPLIT
}

/// Deals the moves in `moves_mask` round-robin into `parts` masks, lowest
/// bit first. No returned mask is empty.
pub fn partition_moves(moves_mask: u64, parts: usize) -> Vec<u64> {
    let parts = parts.min(moves_mask.count_ones() as usize);
    let mut masks = vec![0u64; parts];
    for (i, pos) in positions(moves_mask).enumerate() {
        masks[i % parts] |= pos.bitboard();
    }
    masks
}

/// Merges partial analyses of disjoint root-move sets.
///
/// The best move is the one with the highest evaluation, ties going to the
/// lowest bit index. Node counts and table statistics are summed and depth is
/// the deepest reported. The merge does not depend on the order of `results`.
///
/// # Returns
///
/// `None` when `results` is empty.
pub fn aggregate(results: &[AnalysisResult]) -> Option<AnalysisResult> {
    let move_rank = |r: &AnalysisResult| r.best_move.map_or(u32::MAX, |m| m.bit_index());
    let best = results.iter().max_by(|a, b| {
        a.evaluation
            .cmp(&b.evaluation)
            .then_with(|| move_rank(b).cmp(&move_rank(a)))
    })?;

    let mut merged = best.clone();
    merged.nodes = results.iter().map(|r| r.nodes).sum();
    merged.depth = results.iter().map(|r| r.depth).max().unwrap_or(best.depth);
    merged.time_used = results.iter().map(|r| r.time_used).max().unwrap_or(best.time_used);
    merged.stats.tt = results.iter().fold(Default::default(), |acc, r| r.stats.tt.merged(&acc));
    merged.stats.tt_entries = results.iter().map(|r| r.stats.tt_entries).sum();
    merged.stats.exact = results.iter().all(|r| r.stats.exact);
    merged.stats.fallback = results.iter().any(|r| r.stats.fallback);
    Some(merged)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;

    use super::*;
    use crate::engine::AnalysisStats;
    use crate::eval::EvalProfile;
    use crate::level::Tier;
    use crate::square::Position;
    use crate::transposition_table::TTStats;

    fn report(mv: Position, evaluation: i32, depth: i32, nodes: u64) -> AnalysisResult {
        AnalysisResult {
            best_move: Some(mv),
            evaluation,
            depth,
            nodes,
            time_used: Duration::from_millis(nodes),
            pv: vec![mv],
            stats: AnalysisStats {
                tt: TTStats {
                    probes: nodes,
                    ..Default::default()
                },
                tt_entries: 1,
                level: 20,
                tier: Tier::Intermediate,
                selectivity: 2,
                profile: EvalProfile::Classic,
                exact: false,
                fallback: false,
            },
        }
    }

    #[test]
    fn test_sub_job_ids() {
        assert_eq!(sub_job_id(17, 3), "17-3");
        assert_eq!(parse_sub_job_id("17-3"), Some((17, 3)));
        assert_eq!(parse_sub_job_id("17"), None);
        assert_eq!(parse_sub_job_id("a-3"), None);
    }

    #[test]
    fn test_partition_round_robin() {
        let moves = Bitboard::initial().valid_moves_mask(Player::Black);
        let parts = partition_moves(moves, 2);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0] | parts[1], moves);
        assert_eq!(parts[0] & parts[1], 0);
        assert_eq!(parts[0].count_ones(), 2);
        // lowest bit goes to the first worker
        let lowest = moves & moves.wrapping_neg();
        assert_ne!(parts[0] & lowest, 0);

        // never more parts than moves
        assert_eq!(partition_moves(moves, 8).len(), 4);
        assert!(partition_moves(0, 3).is_empty());
    }

    #[test]
    fn test_should_partition() {
        assert!(should_partition(4, 2));
        assert!(!should_partition(3, 8));
        assert!(!should_partition(10, 1));
    }

    #[test]
    fn test_aggregate_is_order_independent() {
        let results = vec![
            report(Position::new(2, 3), 150, 6, 1000),
            report(Position::new(3, 2), 420, 5, 2000),
            report(Position::new(4, 5), 420, 7, 3000),
            report(Position::new(5, 4), -80, 6, 500),
        ];
        let expected = aggregate(&results).unwrap();
        // (3,2) is bit 34, (4,5) is bit 29
        assert_eq!(expected.best_move, Some(Position::new(4, 5)));
        assert_eq!(expected.evaluation, 420);
        assert_eq!(expected.nodes, 6500);
        assert_eq!(expected.depth, 7);
        assert_eq!(expected.stats.tt.probes, 6500);

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut shuffled = results.clone();
            shuffled.shuffle(&mut rng);
            assert_eq!(aggregate(&shuffled).unwrap(), expected);
        }
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate(&[]).is_none());
    }
}
