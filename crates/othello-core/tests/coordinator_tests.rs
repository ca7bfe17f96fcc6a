use std::sync::Arc;
use std::thread;
use std::time::Duration;

use othello_core::coordinator::{BackendFactory, PoolStatus, SearchBackend, WorkerRequest};
use othello_core::game_state::GameCore;
use othello_core::{
    AnalysisRequest, AnalysisResult, Coordinator, CoordinatorConfig, Engine, EngineOptions, SearchError, SearchOptions,
};

/// Searches quickly, or sleeps first when `slow` says so.
struct TestBackend {
    slow: fn(&WorkerRequest) -> bool,
}

impl SearchBackend for TestBackend {
    fn search(&mut self, request: &WorkerRequest) -> Result<AnalysisResult, String> {
        if (self.slow)(request) {
            thread::sleep(Duration::from_secs(3));
        }
        let options = SearchOptions {
            skill: Some(2),
            ..request.options.clone()
        };
        let mut engine = Engine::new(EngineOptions::new(1 << 10));
        Ok(engine.analyze_position(&request.bitboard, request.player, &options, request.root_moves))
    }
}

struct PanicBackend;

impl SearchBackend for PanicBackend {
    fn search(&mut self, _request: &WorkerRequest) -> Result<AnalysisResult, String> {
        panic!("worker blew up");
    }
}

fn factory(slow: fn(&WorkerRequest) -> bool) -> BackendFactory {
    Arc::new(move || Box::new(TestBackend { slow }) as Box<dyn SearchBackend>)
}

fn config(workers: usize) -> CoordinatorConfig {
    CoordinatorConfig::default()
        .with_workers(workers)
        .with_timeout_grace(Duration::from_millis(100))
}

fn opening_request(limit_ms: u64) -> AnalysisRequest {
    AnalysisRequest::new(GameCore::new()).with_time_limit(Duration::from_millis(limit_ms))
}

/// Whether the request covers the lowest-indexed legal root move.
fn has_lowest_move(request: &WorkerRequest) -> bool {
    let moves = request.bitboard.valid_moves_mask(request.player);
    let lowest = moves & moves.wrapping_neg();
    request.root_moves & lowest != 0
}

fn all_idle(status: PoolStatus, workers: usize) -> bool {
    status.workers == workers && status.idle == workers && status.active_jobs == 0
}

#[test]
fn test_engine_pool_finds_legal_move() {
    let coordinator = Coordinator::new(config(2).with_engine_options(EngineOptions::new(1 << 14).with_level(8)));
    let core = GameCore::new();
    let result = coordinator.analyze(AnalysisRequest::new(core.clone()).with_time_limit(Duration::from_secs(5))).unwrap();
    assert!(core.valid_moves().contains(&result.best_move.unwrap()));
    assert!(result.nodes > 0);
}

#[test]
fn test_split_agrees_with_single_worker() {
    let split = Coordinator::with_backend(config(4), factory(|_| false));
    let single = Coordinator::with_backend(config(1), factory(|_| false));
    let a = split.analyze(opening_request(2_000)).unwrap();
    let b = single.analyze(opening_request(2_000)).unwrap();
    // identical static searches: the best evaluation agrees
    assert_eq!(a.evaluation, b.evaluation);
}

#[test]
fn test_no_workers_available() {
    let coordinator = Coordinator::with_backend(config(0), factory(|_| false));
    let err = coordinator.analyze(opening_request(1_000)).unwrap_err();
    assert_eq!(err, SearchError::NoWorkersAvailable);
}

#[test]
fn test_busy_pool_rejects_second_job() {
    let coordinator = Coordinator::with_backend(config(1), factory(|_| true));
    let first = coordinator.submit(opening_request(5_000)).unwrap();
    let second = coordinator.submit(opening_request(5_000)).unwrap();
    assert_eq!(second.wait().unwrap_err(), SearchError::NoWorkersAvailable);
    first.cancel();
    assert_eq!(first.wait().unwrap_err(), SearchError::Cancelled { job_id: 1 });
}

#[test]
fn test_timeout_without_results() {
    let coordinator = Coordinator::with_backend(config(2), factory(|_| true));
    let handle = coordinator.submit(opening_request(50)).unwrap();
    let job_id = handle.id();
    assert_eq!(handle.wait().unwrap_err(), SearchError::Timeout { job_id });
    // timed-out workers are replaced
    assert!(all_idle(coordinator.status().unwrap(), 2));
}

#[test]
fn test_timeout_returns_partial_result() {
    // the half holding the lowest move answers, the other half hangs
    let coordinator = Coordinator::with_backend(config(2), factory(|r| !has_lowest_move(r)));
    let core = GameCore::new();
    let result = coordinator.analyze(opening_request(100)).unwrap();
    let best = result.best_move.unwrap();
    assert!(core.valid_moves().contains(&best));

    let moves = core.bitboard().valid_moves_mask(core.current_player());
    let first_half = othello_core::coordinator::protocol::partition_moves(moves, 2)[0];
    assert_ne!(first_half & best.bitboard(), 0);
    assert!(all_idle(coordinator.status().unwrap(), 2));
}

#[test]
fn test_worker_fault_fails_job_and_respawns() {
    let factory: BackendFactory = Arc::new(|| Box::new(PanicBackend) as Box<dyn SearchBackend>);
    let coordinator = Coordinator::with_backend(config(3), factory);
    match coordinator.analyze(opening_request(1_000)) {
        Err(SearchError::WorkerFault { message, .. }) => assert_eq!(message, "worker blew up"),
        other => panic!("expected a worker fault, got {other:?}"),
    }
    assert!(all_idle(coordinator.status().unwrap(), 3));
}

#[test]
fn test_cancel_releases_workers() {
    let coordinator = Coordinator::with_backend(config(2), factory(|_| true));
    let handle = coordinator.submit(opening_request(10_000)).unwrap();
    let job_id = handle.id();
    handle.cancel();
    assert_eq!(handle.wait().unwrap_err(), SearchError::Cancelled { job_id });
    assert!(all_idle(coordinator.status().unwrap(), 2));
}

#[test]
fn test_shutdown_disconnects() {
    let mut coordinator = Coordinator::with_backend(config(1), factory(|_| false));
    coordinator.shutdown();
    assert_eq!(coordinator.analyze(opening_request(100)).unwrap_err(), SearchError::Disconnected);
}
