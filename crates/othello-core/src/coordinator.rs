//! Distributed search over a pool of worker threads.
//!
//! A dispatcher thread owns the pool and every in-flight job. Callers talk to
//! it through [`Coordinator`] and get a [`JobHandle`] back; workers answer on
//! a shared response channel. Job deadlines are multiplexed with both
//! channels in a single `select!` loop.

pub mod protocol;
pub mod worker;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, after, never, select, unbounded};
use log::{debug, error, info, trace, warn};

use crate::engine::{AnalysisRequest, AnalysisResult, EngineOptions, SearchOptions};
use crate::error::SearchError;
use crate::square::positions;

pub use protocol::{JobId, WorkerId, WorkerRequest, WorkerResponse};
pub use worker::{BackendFactory, EngineBackend, SearchBackend};

use protocol::{aggregate, parse_sub_job_id, partition_moves, should_partition, sub_job_id};
use worker::{WorkerHandle, spawn_worker};

/// Pool settings.
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Extra time granted on top of a job's search budget before it times out.
    pub timeout_grace: Duration,
    /// Options for the engine of every worker.
    pub engine: EngineOptions,
}

impl CoordinatorConfig {
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_timeout_grace(mut self, grace: Duration) -> Self {
        self.timeout_grace = grace;
        self
    }

    #[must_use]
    pub fn with_engine_options(mut self, engine: EngineOptions) -> Self {
        self.engine = engine;
        self
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            workers: num_cpus::get(),
            timeout_grace: Duration::from_millis(250),
            engine: EngineOptions::default(),
        }
    }
}

/// Snapshot of the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolStatus {
    pub workers: usize,
    pub idle: usize,
    pub active_jobs: usize,
}

type Reply = Sender<Result<AnalysisResult, SearchError>>;

enum Command {
    Submit {
        job_id: JobId,
        request: Box<AnalysisRequest>,
        reply: Reply,
    },
    Cancel(JobId),
    Status(Sender<PoolStatus>),
    Shutdown,
}

/// Handle to a submitted job.
pub struct JobHandle {
    id: JobId,
    result: Receiver<Result<AnalysisResult, SearchError>>,
    commands: Sender<Command>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Blocks until the job completes, times out, fails or is cancelled.
    pub fn wait(self) -> Result<AnalysisResult, SearchError> {
        self.result.recv().map_err(|_| SearchError::Disconnected)?
    }

    /// Cancels the job. The assigned workers are released at once and
    /// [`wait`](Self::wait) returns [`SearchError::Cancelled`].
    pub fn cancel(&self) {
        // a closed channel means the job can no longer be running
        let _ = self.commands.send(Command::Cancel(self.id));
    }
}

/// Client side of the worker pool.
pub struct Coordinator {
    commands: Sender<Command>,
    next_job_id: AtomicU64,
    dispatcher: Option<JoinHandle<()>>,
}

impl Coordinator {
    /// Starts a pool of engine workers.
    pub fn new(config: CoordinatorConfig) -> Coordinator {
        let factory = EngineBackend::factory(config.engine.clone());
        Coordinator::with_backend(config, factory)
    }

    /// Starts a pool whose workers run backends built by `factory`.
    pub fn with_backend(config: CoordinatorConfig, factory: BackendFactory) -> Coordinator {
        let (commands, command_rx) = unbounded();
        let (response_tx, response_rx) = unbounded();
        let mut dispatcher = Dispatcher {
            default_time_limit: config.engine.default_time_limit,
            timeout_grace: config.timeout_grace,
            factory,
            responses: response_tx,
            workers: BTreeMap::new(),
            next_worker_id: 0,
            jobs: HashMap::new(),
        };
        for _ in 0..config.workers {
            dispatcher.spawn();
        }
        info!("coordinator started with {} workers", dispatcher.workers.len());

        let thread = thread::Builder::new()
            .name("search-dispatcher".to_string())
            .spawn(move || dispatcher.run(command_rx, response_rx));
        let dispatcher = match thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("failed to start dispatcher: {e}");
                None
            }
        };

        Coordinator {
            commands,
            next_job_id: AtomicU64::new(1),
            dispatcher,
        }
    }

    /// Submits a job and returns immediately.
    pub fn submit(&self, request: AnalysisRequest) -> Result<JobHandle, SearchError> {
        let job_id = self.next_job_id.fetch_add(1, Ordering::Relaxed);
        let (reply, result) = unbounded();
        self.commands
            .send(Command::Submit {
                job_id,
                request: Box::new(request),
                reply,
            })
            .map_err(|_| SearchError::Disconnected)?;
        Ok(JobHandle {
            id: job_id,
            result,
            commands: self.commands.clone(),
        })
    }

    /// Submits a job and waits for its result.
    pub fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, SearchError> {
        self.submit(request)?.wait()
    }

    pub fn status(&self) -> Result<PoolStatus, SearchError> {
        let (tx, rx) = unbounded();
        self.commands.send(Command::Status(tx)).map_err(|_| SearchError::Disconnected)?;
        rx.recv().map_err(|_| SearchError::Disconnected)
    }

    /// Stops every worker and the dispatcher. Pending jobs fail with
    /// [`SearchError::Disconnected`].
    pub fn shutdown(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.dispatcher.take()
            && handle.join().is_err()
        {
            error!("dispatcher thread panicked");
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct WorkerSlot {
    handle: WorkerHandle,
    job: Option<JobId>,
}

struct Job {
    assigned: Vec<WorkerId>,
    results: Vec<AnalysisResult>,
    deadline: Option<Instant>,
    started: Instant,
    reply: Reply,
}

impl Job {
    fn is_complete(&self) -> bool {
        self.results.len() == self.assigned.len()
    }
}

/// Pool state, owned by the dispatcher thread.
struct Dispatcher {
    default_time_limit: Option<Duration>,
    timeout_grace: Duration,
    factory: BackendFactory,
    responses: Sender<WorkerResponse>,
    workers: BTreeMap<WorkerId, WorkerSlot>,
    next_worker_id: WorkerId,
    jobs: HashMap<JobId, Job>,
}

impl Dispatcher {
    fn run(mut self, commands: Receiver<Command>, responses: Receiver<WorkerResponse>) {
        loop {
            let timer = self.next_deadline().map_or_else(never, |deadline| {
                after(deadline.saturating_duration_since(Instant::now()))
            });
            select! {
                recv(commands) -> cmd => match cmd {
                    Ok(Command::Submit { job_id, request, reply }) => self.submit(job_id, &request, reply),
                    Ok(Command::Cancel(job_id)) => self.cancel(job_id),
                    Ok(Command::Status(tx)) => {
                        let _ = tx.send(self.status());
                    }
                    Ok(Command::Shutdown) | Err(_) => break,
                },
                recv(responses) -> msg => {
                    if let Ok(response) = msg {
                        self.on_response(response);
                    }
                },
                recv(timer) -> _ => self.expire(Instant::now()),
            }
        }

        debug!("dispatcher stopping, {} jobs pending", self.jobs.len());
        self.jobs.clear();
        for (_, slot) in std::mem::take(&mut self.workers) {
            slot.handle.shutdown();
        }
    }

    fn status(&self) -> PoolStatus {
        PoolStatus {
            workers: self.workers.len(),
            idle: self.workers.values().filter(|s| s.job.is_none()).count(),
            active_jobs: self.jobs.len(),
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.jobs.values().filter_map(|job| job.deadline).min()
    }

    /// Adds a fresh worker to the pool.
    fn spawn(&mut self) {
        let id = self.next_worker_id;
        self.next_worker_id += 1;
        match spawn_worker(id, &self.factory, self.responses.clone()) {
            Ok(handle) => {
                self.workers.insert(id, WorkerSlot { handle, job: None });
            }
            Err(e) => error!("failed to spawn worker {id}: {e}"),
        }
    }

    /// Removes a worker from the pool and replaces it.
    fn replace(&mut self, worker_id: WorkerId) {
        if let Some(slot) = self.workers.remove(&worker_id) {
            slot.handle.retire();
            self.spawn();
        }
    }

    /// Search budget of a job, before the grace period.
    fn budget(&self, options: &SearchOptions) -> Option<Duration> {
        match (options.clock, options.time_limit.or(self.default_time_limit)) {
            // an engine never spends more than a quarter of the clock
            (Some(clock), _) => Some(clock.remaining / 4),
            (None, limit) => limit,
        }
    }

    fn submit(&mut self, job_id: JobId, request: &AnalysisRequest, reply: Reply) {
        let idle: Vec<WorkerId> = self
            .workers
            .iter()
            .filter(|(_, slot)| slot.job.is_none())
            .map(|(&id, _)| id)
            .collect();
        if idle.is_empty() {
            warn!("job {job_id} rejected: no idle workers");
            let _ = reply.send(Err(SearchError::NoWorkersAvailable));
            return;
        }

        let core = &request.game_core;
        let board = core.bitboard();
        let player = core.current_player();
        let options = request.search_options();
        let moves = board.valid_moves_mask(player);
        let n_moves = moves.count_ones() as usize;

        let assignments: Vec<(WorkerId, u64)> = if should_partition(n_moves, idle.len()) {
            let parts = partition_moves(moves, idle.len());
            idle.iter().copied().zip(parts).collect()
        } else {
            vec![(idle[0], !0)]
        };

        let started = Instant::now();
        let deadline = self.budget(&options).map(|b| started + b + self.timeout_grace);
        debug!(
            "job {job_id}: {n_moves} root moves over {} workers, deadline {:?}",
            assignments.len(),
            deadline.map(|d| d - started)
        );

        let mut assigned = Vec::with_capacity(assignments.len());
        for (worker_id, root_moves) in assignments {
            trace!(
                "job {job_id} -> worker {worker_id}: {}",
                positions(root_moves & moves).map(|m| m.to_string()).collect::<Vec<_>>().join(" ")
            );
            let request = WorkerRequest {
                id: sub_job_id(job_id, worker_id),
                bitboard: board,
                player,
                options: options.clone(),
                root_moves,
            };
            let sent = self.workers.get(&worker_id).map(|slot| slot.handle.send(request).is_ok());
            if sent != Some(true) {
                error!("worker {worker_id} is gone, failing job {job_id}");
                for &w in &assigned {
                    self.replace(w);
                }
                self.replace(worker_id);
                let _ = reply.send(Err(SearchError::WorkerFault {
                    worker_id,
                    message: "worker thread exited".to_string(),
                }));
                return;
            }
            if let Some(slot) = self.workers.get_mut(&worker_id) {
                slot.job = Some(job_id);
            }
            assigned.push(worker_id);
        }

        self.jobs.insert(
            job_id,
            Job {
                assigned,
                results: Vec::new(),
                deadline,
                started,
                reply,
            },
        );
    }

    fn on_response(&mut self, response: WorkerResponse) {
        let Some((job_id, worker_id)) = parse_sub_job_id(&response.id) else {
            warn!("malformed sub-job id {:?}", response.id);
            return;
        };
        let Some(job) = self.jobs.get_mut(&job_id) else {
            trace!("late response {} ignored", response.id);
            return;
        };
        if !job.assigned.contains(&worker_id) {
            return;
        }

        match response.result {
            Ok(result) => {
                job.results.push(result);
                if let Some(slot) = self.workers.get_mut(&worker_id) {
                    slot.job = None;
                }
                if job.is_complete() {
                    self.finish(job_id);
                }
            }
            Err(message) => {
                error!("worker {worker_id} faulted on job {job_id}: {message}");
                if let Some(job) = self.jobs.remove(&job_id) {
                    // the faulted worker's thread has already exited
                    self.release(&job);
                    self.replace(worker_id);
                    let _ = job.reply.send(Err(SearchError::WorkerFault { worker_id, message }));
                }
            }
        }
    }

    /// Replaces every worker still busy with `job`.
    fn release(&mut self, job: &Job) {
        let busy: Vec<WorkerId> = job
            .assigned
            .iter()
            .copied()
            .filter(|w| self.workers.get(w).is_some_and(|slot| slot.job.is_some()))
            .collect();
        for worker_id in busy {
            self.replace(worker_id);
        }
    }

    fn finish(&mut self, job_id: JobId) {
        let Some(job) = self.jobs.remove(&job_id) else {
            return;
        };
        let reply = match aggregate(&job.results) {
            Some(mut result) => {
                result.time_used = job.started.elapsed();
                debug!(
                    "job {job_id} done: best={:?} eval={} nodes={}",
                    result.best_move, result.evaluation, result.nodes
                );
                Ok(result)
            }
            None => Err(SearchError::Timeout { job_id }),
        };
        let _ = job.reply.send(reply);
    }

    /// Resolves every job whose deadline has passed.
    fn expire(&mut self, now: Instant) {
        let expired: Vec<JobId> = self
            .jobs
            .iter()
            .filter(|(_, job)| job.deadline.is_some_and(|d| d <= now))
            .map(|(&id, _)| id)
            .collect();
        for job_id in expired {
            let Some(job) = self.jobs.remove(&job_id) else {
                continue;
            };
            warn!(
                "job {job_id} timed out with {}/{} results",
                job.results.len(),
                job.assigned.len()
            );
            self.release(&job);
            let reply = match aggregate(&job.results) {
                Some(mut partial) => {
                    partial.time_used = job.started.elapsed();
                    Ok(partial)
                }
                None => Err(SearchError::Timeout { job_id }),
            };
            let _ = job.reply.send(reply);
        }
    }

    fn cancel(&mut self, job_id: JobId) {
        let Some(job) = self.jobs.remove(&job_id) else {
            return;
        };
        info!("job {job_id} cancelled");
        self.release(&job);
        let _ = job.reply.send(Err(SearchError::Cancelled { job_id }));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::game_state::GameCore;

    struct FixedBackend;

    impl SearchBackend for FixedBackend {
        fn search(&mut self, request: &WorkerRequest) -> Result<AnalysisResult, String> {
            let mut engine = crate::engine::Engine::new(EngineOptions::new(1 << 10));
            let options = SearchOptions {
                skill: Some(1),
                ..request.options.clone()
            };
            Ok(engine.analyze_position(&request.bitboard, request.player, &options, request.root_moves))
        }
    }

    fn fixed_factory() -> BackendFactory {
        Arc::new(|| Box::new(FixedBackend) as Box<dyn SearchBackend>)
    }

    #[test]
    fn test_split_job_covers_all_moves() {
        let coordinator = Coordinator::with_backend(CoordinatorConfig::default().with_workers(4), fixed_factory());
        let core = GameCore::new();
        let result = coordinator
            .analyze(AnalysisRequest::new(core.clone()).with_time_limit(Duration::from_secs(5)))
            .unwrap();
        assert!(core.valid_moves().contains(&result.best_move.unwrap()));
        let status = coordinator.status().unwrap();
        assert_eq!(status.workers, 4);
        assert_eq!(status.idle, 4);
        assert_eq!(status.active_jobs, 0);
    }

    #[test]
    fn test_zero_workers() {
        let coordinator = Coordinator::with_backend(CoordinatorConfig::default().with_workers(0), fixed_factory());
        let request = AnalysisRequest::new(GameCore::new()).with_time_limit(Duration::from_secs(1));
        assert_eq!(coordinator.analyze(request).unwrap_err(), SearchError::NoWorkersAvailable);
    }

    #[test]
    fn test_job_ids_are_unique() {
        let coordinator = Coordinator::with_backend(CoordinatorConfig::default().with_workers(1), fixed_factory());
        let a = coordinator.submit(AnalysisRequest::new(GameCore::new())).unwrap();
        let a_id = a.id();
        a.wait().unwrap();
        let b = coordinator.submit(AnalysisRequest::new(GameCore::new())).unwrap();
        assert_ne!(a_id, b.id());
        b.wait().unwrap();
    }
}
