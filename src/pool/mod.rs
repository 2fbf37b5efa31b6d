//! Fixed-size worker pool with asynchronous result delivery.
//!
//! ```text
//! submit() ──► [bounded job queue] ──► worker 0..N ──► [result queue] ──► dispatcher ──► on_result()
//! ```
//!
//! - `submit` blocks while the job queue is full; jobs are never dropped
//! - every worker owns its own [`Worker`] and runs one job at a time
//! - the dispatcher thread hands each output to the registered callback,
//!   or buffers it until a callback is registered
//!
//! Completion order between jobs is unspecified.

mod worker;

pub use worker::Worker;

pub(crate) use worker::panic_message;

use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, trace, warn};

use crate::config::PoolConfig;
use crate::error::{ConfigError, PoolError};
use crate::processor::FileProcessor;

type Handler<O> = Box<dyn FnMut(O) + Send>;

/// Pool running [`FileProcessor`] workers.
pub type ProcessorPool = WorkerPool<FileProcessor>;

/// Returned by [`WorkerPool::submit`] when the pool no longer accepts jobs.
///
/// Carries the rejected job back to the caller.
pub struct SubmitError<J>(pub J);

impl<J> SubmitError<J> {
    /// Returns the job that was not submitted.
    pub fn into_inner(self) -> J {
        self.0
    }
}

impl<J> fmt::Debug for SubmitError<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SubmitError { .. }")
    }
}

impl<J> fmt::Display for SubmitError<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("worker pool is shut down")
    }
}

impl<J> std::error::Error for SubmitError<J> {}

struct State<O> {
    /// Submitted jobs whose output has not been delivered or buffered yet.
    pending: usize,
    backlog: VecDeque<O>,
}

// Lock order: `handler` before `state`.
struct Shared<O> {
    handler: Mutex<Option<Handler<O>>>,
    state: Mutex<State<O>>,
    idle: Condvar,
}

impl<O> Shared<O> {
    fn new() -> Self {
        Self {
            handler: Mutex::new(None),
            state: Mutex::new(State {
                pending: 0,
                backlog: VecDeque::new(),
            }),
            idle: Condvar::new(),
        }
    }

    fn finish_one(&self) {
        let mut state = self.state.lock();
        state.pending = state.pending.saturating_sub(1);
        if state.pending == 0 {
            self.idle.notify_all();
        }
    }

    fn deliver(&self, output: O) {
        let mut handler = self.handler.lock();
        match handler.as_mut() {
            Some(callback) => invoke(callback, output),
            None => self.state.lock().backlog.push_back(output),
        }
        drop(handler);

        self.finish_one();
    }
}

/// A fixed set of worker threads fed from a bounded FIFO queue.
///
/// # Example
///
/// ```no_run
/// use ingestrs::{Job, PoolConfig, ProcessorPool};
///
/// # fn main() -> Result<(), ingestrs::PoolError> {
/// let pool = ProcessorPool::with_config(PoolConfig::new("/var/tmp/ingest"))?;
/// pool.on_result(|result| println!("{}: {:?}", result.local_path().display(), result.status()));
///
/// pool.submit(Job::new("data.bin", true)).ok();
/// pool.wait_idle();
/// pool.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct WorkerPool<W: Worker> {
    jobs: Option<Sender<W::Job>>,
    workers: Vec<JoinHandle<()>>,
    dispatcher: Option<JoinHandle<()>>,
    shared: Arc<Shared<W::Output>>,
    size: usize,
}

impl<W: Worker> WorkerPool<W> {
    /// Starts `workers` threads, each owning the worker built by `factory`
    /// for its index, behind a job queue holding up to `capacity` jobs.
    ///
    /// # Errors
    ///
    /// Fails if either count is zero, if `factory` fails, or if a thread
    /// cannot be spawned. Threads already started are stopped again.
    pub fn spawn<F>(workers: usize, capacity: usize, mut factory: F) -> Result<Self, PoolError>
    where
        F: FnMut(usize) -> Result<W, PoolError>,
    {
        if workers == 0 {
            return Err(ConfigError::Pool {
                message: "concurrency must be at least 1",
            }
            .into());
        }
        if capacity == 0 {
            return Err(ConfigError::Pool {
                message: "queue capacity must be at least 1",
            }
            .into());
        }

        let (job_tx, job_rx) = crossbeam_channel::bounded::<W::Job>(capacity);
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<W::Output>();

        let mut pool = Self {
            jobs: Some(job_tx),
            workers: Vec::with_capacity(workers),
            dispatcher: None,
            shared: Arc::new(Shared::new()),
            size: workers,
        };

        for index in 0..workers {
            let worker = factory(index)?;
            let name = format!("ingest-worker-{index}");

            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let shared = Arc::clone(&pool.shared);
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || run_worker(worker, jobs, results, &shared))
                .map_err(|source| PoolError::Spawn { name, source })?;
            pool.workers.push(handle);
        }
        drop(result_tx);

        let shared = Arc::clone(&pool.shared);
        let dispatcher = thread::Builder::new()
            .name("ingest-dispatch".to_owned())
            .spawn(move || dispatch(result_rx, &shared))
            .map_err(|source| PoolError::Spawn {
                name: "ingest-dispatch".to_owned(),
                source,
            })?;
        pool.dispatcher = Some(dispatcher);

        debug!(workers, capacity, "pool started");
        Ok(pool)
    }

    /// Queues a job, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns the job if the pool no longer accepts work.
    pub fn submit(&self, job: W::Job) -> Result<(), SubmitError<W::Job>> {
        let Some(jobs) = &self.jobs else {
            return Err(SubmitError(job));
        };

        self.shared.state.lock().pending += 1;
        jobs.send(job).map_err(|e| {
            self.shared.finish_one();
            SubmitError(e.into_inner())
        })
    }

    /// Registers the callback invoked once per finished job.
    ///
    /// Outputs produced before registration are handed to `callback`
    /// right away, in the order they were produced. A later registration
    /// replaces the earlier callback.
    ///
    /// The callback runs on the dispatcher thread and must not call back
    /// into `on_result`.
    pub fn on_result<F>(&self, callback: F)
    where
        F: FnMut(W::Output) + Send + 'static,
    {
        let mut handler = self.shared.handler.lock();
        let mut callback: Handler<W::Output> = Box::new(callback);

        let backlog = std::mem::take(&mut self.shared.state.lock().backlog);
        if !backlog.is_empty() {
            trace!(count = backlog.len(), "flushing buffered results");
        }
        for output in backlog {
            invoke(&mut callback, output);
        }

        *handler = Some(callback);
    }

    /// Returns the number of jobs submitted but not yet finished.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().pending
    }

    /// Returns the number of worker threads.
    pub fn workers(&self) -> usize {
        self.size
    }

    /// Blocks until every submitted job has finished and its output was
    /// delivered or buffered.
    pub fn wait_idle(&self) {
        let mut state = self.shared.state.lock();
        while state.pending > 0 {
            self.shared.idle.wait(&mut state);
        }
    }

    /// Stops accepting jobs, lets queued and running jobs finish, and stops
    /// every thread.
    ///
    /// Returns the outputs that were never handed to a callback.
    pub fn shutdown(mut self) -> Vec<W::Output> {
        self.close()
    }

    fn close(&mut self) -> Vec<W::Output> {
        let Some(jobs) = self.jobs.take() else {
            return Vec::new();
        };
        drop(jobs);

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("worker thread panicked");
            }
        }
        if let Some(handle) = self.dispatcher.take() {
            if handle.join().is_err() {
                warn!("dispatcher thread panicked");
            }
        }

        let backlog = std::mem::take(&mut self.shared.state.lock().backlog);
        debug!(workers = self.size, undelivered = backlog.len(), "pool stopped");
        backlog.into()
    }
}

impl WorkerPool<FileProcessor> {
    /// Starts a pool of file processors sharing `config`.
    ///
    /// Creates the temporary base path if it does not exist.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration, an unusable base path, or a thread
    /// that cannot be started.
    pub fn with_config(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;

        let base = config.temporary_base_path();
        std::fs::create_dir_all(base).map_err(|source| PoolError::TemporaryPath {
            path: base.to_path_buf(),
            source,
        })?;

        let config = Arc::new(config);
        Self::spawn(config.concurrency(), config.queue_capacity(), |_| {
            Ok(FileProcessor::new(Arc::clone(&config))?)
        })
    }
}

impl<W: Worker> Drop for WorkerPool<W> {
    fn drop(&mut self) {
        let undelivered = self.close();
        if !undelivered.is_empty() {
            warn!(count = undelivered.len(), "dropping undelivered results");
        }
    }
}

impl<W: Worker> fmt::Debug for WorkerPool<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.size)
            .field("pending", &self.pending())
            .field("open", &self.jobs.is_some())
            .finish()
    }
}

fn run_worker<W: Worker>(
    mut worker: W,
    jobs: Receiver<W::Job>,
    results: Sender<W::Output>,
    shared: &Shared<W::Output>,
) {
    for job in jobs.iter() {
        match panic::catch_unwind(AssertUnwindSafe(|| worker.execute(job))) {
            Ok(output) => {
                if results.send(output).is_err() {
                    shared.finish_one();
                }
            }
            Err(payload) => {
                error!(
                    thread = thread::current().name().unwrap_or("worker"),
                    message = %panic_message(&*payload),
                    "job panicked"
                );
                let output = panic::catch_unwind(AssertUnwindSafe(|| worker.on_panic(&*payload)))
                    .ok()
                    .flatten();
                let sent = match output {
                    Some(output) => results.send(output).is_ok(),
                    None => false,
                };
                if !sent {
                    shared.finish_one();
                }
            }
        }
    }
}

/// Runs a result callback, containing any panic to that one output.
fn invoke<O>(callback: &mut Handler<O>, output: O) {
    if panic::catch_unwind(AssertUnwindSafe(|| callback(output))).is_err() {
        error!("result callback panicked");
    }
}

fn dispatch<O>(results: Receiver<O>, shared: &Shared<O>) {
    for output in results.iter() {
        shared.deliver(output);
    }
}
