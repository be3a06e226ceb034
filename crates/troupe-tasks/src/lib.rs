//! Fixed worker pool with batch completion counters.
//!
//! Work is submitted in batches; each batch gets a [`Counter`] that
//! reaches complete exactly once, after every unit in the batch has
//! finished — successfully or with a caught panic. One failing unit
//! never blocks or kills the pool.
//!
//! Completion callbacks are never invoked from worker threads: the
//! [`CallbackQueue`] is polled from whichever single thread owns it
//! (in the engine, the scheduling thread), keeping callback-triggered
//! mutation single-threaded.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

/// One unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

struct Unit {
    run: Task,
    counter: Counter,
}

// ── Counter ──────────────────────────────────────────────────────

struct CounterState {
    remaining: Mutex<usize>,
    done: Condvar,
}

/// Completion tracker for one submitted batch.
///
/// Cloneable and safe to poll from any thread. `is_complete` becomes
/// true exactly once, after every unit in the batch has finished.
#[derive(Clone)]
pub struct Counter {
    state: Arc<CounterState>,
}

impl Counter {
    fn new(units: usize) -> Self {
        Self {
            state: Arc::new(CounterState {
                remaining: Mutex::new(units),
                done: Condvar::new(),
            }),
        }
    }

    /// Whether every unit in the batch has finished.
    pub fn is_complete(&self) -> bool {
        *self.state.remaining.lock().unwrap() == 0
    }

    /// Block until the batch completes. A one-shot condvar wait, not a
    /// sleep-poll; returns immediately if already complete.
    pub fn wait(&self) {
        let mut remaining = self.state.remaining.lock().unwrap();
        while *remaining > 0 {
            remaining = self.state.done.wait(remaining).unwrap();
        }
    }

    fn finish_one(&self) {
        let mut remaining = self.state.remaining.lock().unwrap();
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.state.done.notify_all();
        }
    }
}

// ── TaskPool ─────────────────────────────────────────────────────

/// Fixed-size worker pool.
///
/// Submission is non-blocking; workers drain a shared channel. Panics
/// inside a unit are caught and logged, and still count toward batch
/// completion.
pub struct TaskPool {
    tx: Option<Sender<Unit>>,
    workers: Vec<JoinHandle<()>>,
}

impl TaskPool {
    /// Spawn `worker_count` named worker threads (clamped to `[1, 64]`).
    pub fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.clamp(1, 64);
        let (tx, rx) = crossbeam_channel::unbounded::<Unit>();
        let mut workers = Vec::with_capacity(worker_count);
        for i in 0..worker_count {
            let rx = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("troupe-worker-{i}"))
                .spawn(move || worker_loop(rx))
                .expect("failed to spawn worker thread");
            workers.push(handle);
        }
        Self {
            tx: Some(tx),
            workers,
        }
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Whether [`stop`](Self::stop) has run. A stopped pool drops new
    /// submissions; callers that outlive a stop must build a new pool.
    pub fn is_stopped(&self) -> bool {
        self.tx.is_none()
    }

    /// Submit a batch of units. Returns the batch's [`Counter`].
    ///
    /// An empty batch is complete immediately. Submitting after
    /// [`stop`](Self::stop) logs and completes the counter without
    /// running anything.
    pub fn submit(&self, tasks: Vec<Task>) -> Counter {
        let counter = Counter::new(tasks.len());
        let Some(tx) = &self.tx else {
            log::warn!("submit after stop: dropping batch of {}", tasks.len());
            for _ in 0..counter_remaining(&counter) {
                counter.finish_one();
            }
            return counter;
        };
        for run in tasks {
            let unit = Unit {
                run,
                counter: counter.clone(),
            };
            if let Err(e) = tx.send(unit) {
                // Channel closed under us: count the unit as finished
                // so the batch still completes.
                e.into_inner().counter.finish_one();
            }
        }
        counter
    }

    /// Convenience wrapper for a single-unit batch.
    pub fn submit_one<F>(&self, task: F) -> Counter
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(vec![Box::new(task)])
    }

    /// Drain outstanding work and join every worker.
    ///
    /// Queued units still run to completion before the workers exit.
    /// Blocks until the pool is quiesced; safe to call unconditionally
    /// and more than once.
    pub fn stop(&mut self) {
        // Dropping the sender lets workers finish the queue and exit.
        self.tx.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("worker thread panicked outside a task");
            }
        }
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn counter_remaining(counter: &Counter) -> usize {
    *counter.state.remaining.lock().unwrap()
}

fn worker_loop(rx: Receiver<Unit>) {
    while let Ok(unit) = rx.recv() {
        let result = catch_unwind(AssertUnwindSafe(unit.run));
        if let Err(payload) = result {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            log::error!("task panicked: {msg}");
        }
        unit.counter.finish_one();
    }
}

// ── CallbackQueue ────────────────────────────────────────────────

/// Completion callback.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Pending `(Counter, callback)` pairs, polled from a single thread.
///
/// `poll` runs callbacks whose batches completed, scanning at most the
/// number of entries present when the poll began — a counter whose
/// callback enqueues further work cannot starve the caller.
#[derive(Default)]
pub struct CallbackQueue {
    entries: Vec<(Counter, Callback)>,
}

impl CallbackQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for a batch.
    pub fn push(&mut self, counter: Counter, callback: Callback) {
        self.entries.push((counter, callback));
    }

    /// Run callbacks for completed batches. Returns how many ran.
    pub fn poll(&mut self) -> usize {
        let budget = self.entries.len();
        let mut ran = 0;
        let mut i = 0;
        for _ in 0..budget {
            if i >= self.entries.len() {
                break;
            }
            if self.entries[i].0.is_complete() {
                let (_, callback) = self.entries.remove(i);
                callback();
                ran += 1;
            } else {
                i += 1;
            }
        }
        ran
    }

    /// Number of callbacks still waiting.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no callbacks are waiting.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every pending callback without running it.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
