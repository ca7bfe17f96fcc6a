//! Search worker threads.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, error, trace};

use crate::coordinator::protocol::{WorkerId, WorkerRequest, WorkerResponse};
use crate::engine::{AnalysisResult, Engine, EngineOptions};

/// Something that can run one worker search.
pub trait SearchBackend: Send {
    /// Runs the search described by `request`.
    fn search(&mut self, request: &WorkerRequest) -> Result<AnalysisResult, String>;

    /// Flag that aborts a running search, if the backend supports it.
    fn stop_flag(&self) -> Option<Arc<AtomicBool>> {
        None
    }
}

/// Creates a fresh backend for every spawned worker.
pub type BackendFactory = Arc<dyn Fn() -> Box<dyn SearchBackend> + Send + Sync>;

/// Backend running a private [`Engine`].
pub struct EngineBackend {
    engine: Engine,
}

impl EngineBackend {
    pub fn new(options: EngineOptions) -> EngineBackend {
        EngineBackend {
            engine: Engine::new(options),
        }
    }

    /// Factory building one engine per worker from `options`.
    pub fn factory(options: EngineOptions) -> BackendFactory {
        Arc::new(move || Box::new(EngineBackend::new(options.clone())) as Box<dyn SearchBackend>)
    }
}

impl SearchBackend for EngineBackend {
    fn search(&mut self, request: &WorkerRequest) -> Result<AnalysisResult, String> {
        Ok(self
            .engine
            .analyze_position(&request.bitboard, request.player, &request.options, request.root_moves))
    }

    fn stop_flag(&self) -> Option<Arc<AtomicBool>> {
        Some(self.engine.stop_flag())
    }
}

/// The coordinator's end of a worker thread.
pub(crate) struct WorkerHandle {
    pub id: WorkerId,
    requests: Sender<WorkerRequest>,
    stop: Option<Arc<AtomicBool>>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Hands a request to the worker. Fails if the worker thread is gone.
    pub fn send(&self, request: WorkerRequest) -> Result<(), WorkerRequest> {
        self.requests.send(request).map_err(|e| e.into_inner())
    }

    /// Stops the current search and lets the thread exit on its own.
    pub fn retire(self) {
        if let Some(stop) = &self.stop {
            stop.store(true, Ordering::Relaxed);
        }
        trace!("worker {} retired", self.id);
    }

    /// Stops the worker and waits for its thread.
    pub fn shutdown(self) {
        let WorkerHandle {
            id,
            requests,
            stop,
            thread,
        } = self;
        if let Some(stop) = stop {
            stop.store(true, Ordering::Relaxed);
        }
        drop(requests);
        if let Some(thread) = thread
            && thread.join().is_err()
        {
            error!("worker {id} panicked during shutdown");
        }
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "search panicked".to_string()
    }
}

fn worker_loop(id: WorkerId, mut backend: Box<dyn SearchBackend>, requests: Receiver<WorkerRequest>, responses: Sender<WorkerResponse>) {
    debug!("worker {id} started");
    let stop = backend.stop_flag();
    for request in requests.iter() {
        // set only by retire or shutdown; the flag is never cleared again
        if stop.as_ref().is_some_and(|s| s.load(Ordering::Relaxed)) {
            trace!("worker {id} dropping {} after stop", request.id);
            break;
        }
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| backend.search(&request)));
        let result = match outcome {
            Ok(result) => result,
            Err(payload) => Err(panic_message(payload.as_ref())),
        };
        let failed = result.is_err();
        let response = WorkerResponse {
            id: request.id,
            worker_id: id,
            result,
        };
        if responses.send(response).is_err() {
            break;
        }
        if failed {
            // a faulted backend is not reused
            break;
        }
    }
    debug!("worker {id} stopped");
}

/// Spawns a worker thread with a fresh backend from `factory`.
pub(crate) fn spawn_worker(
    id: WorkerId,
    factory: &BackendFactory,
    responses: Sender<WorkerResponse>,
) -> io::Result<WorkerHandle> {
    let backend = factory();
    let stop = backend.stop_flag();
    let (tx, rx) = unbounded();
    let thread = thread::Builder::new()
        .name(format!("search-worker-{id}"))
        .spawn(move || worker_loop(id, backend, rx, responses))?;
    Ok(WorkerHandle {
        id,
        requests: tx,
        stop,
        thread: Some(thread),
    })
}
