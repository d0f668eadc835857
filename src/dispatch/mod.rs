//! Work distribution and result aggregation.
//!
//! Parallel mode is a producer/consumer pipeline over bounded crossbeam
//! channels. The work queue is sized to hold every item plus one stop
//! sentinel per worker, so filling it never blocks. Each worker pulls until
//! it dequeues its sentinel, then publishes its partial counters exactly
//! once on the result channel. The final drain is non-blocking: workers are
//! joined first, so everything that was published is already buffered, and a
//! worker that died without publishing can never hang the run — its share is
//! simply missing from the sum.
//!
//! Serial mode iterates on the calling thread and fails fast on anything the
//! engine does not classify as a per-file outcome.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use anyhow::Result;
use crossbeam::channel::{Receiver, Sender, bounded};
use tracing::{debug, warn};

use crate::engine::{BatchContext, Counters, Transform, TransformError};
use crate::error::BatchError;

/// Cooperative cancellation flag, checked at every loop head in both modes.
/// A cancelled worker stops pulling work but still publishes whatever it has
/// finished, so the aggregate reflects true work done.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One queue slot: a relative input path, or the per-worker stop sentinel.
type WorkItem = Option<String>;

pub struct Dispatcher {
    workers: usize,
}

impl Dispatcher {
    /// A requested worker count above one selects the parallel pipeline;
    /// zero or one runs serially on the calling thread. The mode is picked
    /// once and never changes mid-run.
    pub fn new(workers: usize) -> Self {
        Self { workers }
    }

    /// Run the whole batch and return the summed counters.
    pub fn run(
        &self,
        ctx: Arc<BatchContext>,
        relatives: Vec<String>,
        engine: Arc<dyn Transform>,
        cancel: CancelToken,
    ) -> Result<Counters> {
        if self.workers <= 1 {
            self.run_serial(&ctx, &relatives, engine.as_ref(), &cancel)
        } else {
            Ok(self.run_parallel(ctx, relatives, engine, cancel))
        }
    }

    fn run_serial(
        &self,
        ctx: &BatchContext,
        relatives: &[String],
        engine: &dyn Transform,
        cancel: &CancelToken,
    ) -> Result<Counters> {
        let mut totals = Counters::default();
        for relative in relatives {
            if cancel.is_cancelled() {
                debug!(done = totals.total, "cancelled, stopping the serial run");
                break;
            }
            match engine.invoke(ctx, relative) {
                Ok(outcome) => totals += outcome,
                // A verify mismatch is a correctness claim failing; in
                // serial mode it is surfaced instead of counted.
                Err(TransformError::VerifyMismatch { path }) => {
                    return Err(BatchError::VerifyMismatch { path }.into());
                }
                Err(TransformError::Fatal(err)) => return Err(err),
            }
        }
        Ok(totals)
    }

    fn run_parallel(
        &self,
        ctx: Arc<BatchContext>,
        relatives: Vec<String>,
        engine: Arc<dyn Transform>,
        cancel: CancelToken,
    ) -> Counters {
        let workers = self.workers;
        // Every item plus every sentinel fits, so filling never blocks.
        let (work_tx, work_rx) = bounded::<WorkItem>(relatives.len() + workers);
        let (result_tx, result_rx) = bounded::<Counters>(workers);

        for relative in relatives {
            let _ = work_tx.send(Some(relative));
        }
        for _ in 0..workers {
            let _ = work_tx.send(None);
        }
        drop(work_tx);

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            let ctx = Arc::clone(&ctx);
            let engine = Arc::clone(&engine);
            let cancel = cancel.clone();
            handles.push(thread::spawn(move || {
                worker_loop(worker_id, &ctx, engine.as_ref(), &work_rx, &result_tx, &cancel);
            }));
        }
        drop(result_tx);

        for handle in handles {
            if handle.join().is_err() {
                warn!("a worker died before publishing its counters");
            }
        }

        // All workers are done or dead, so every published partial is
        // already buffered: try_recv drains them without ever waiting for a
        // publish that will never come.
        let mut totals = Counters::default();
        while let Ok(partial) = result_rx.try_recv() {
            totals += partial;
        }
        totals
    }
}

fn worker_loop(
    worker_id: usize,
    ctx: &BatchContext,
    engine: &dyn Transform,
    work_rx: &Receiver<WorkItem>,
    result_tx: &Sender<Counters>,
    cancel: &CancelToken,
) {
    let mut partial = Counters::default();
    loop {
        if cancel.is_cancelled() {
            debug!(worker_id, done = partial.total, "cancelled, publishing partials");
            break;
        }
        match work_rx.recv() {
            Ok(Some(relative)) => match engine.invoke(ctx, &relative) {
                Ok(outcome) => partial += outcome,
                Err(TransformError::VerifyMismatch { path }) => {
                    warn!(worker_id, %path, "verification failed");
                    partial += Counters::one_verify_failed();
                }
                Err(TransformError::Fatal(err)) => {
                    warn!(worker_id, error = %err, "file failed");
                    partial += Counters::one_failed();
                }
            },
            // The sentinel and a closed queue both mean no more work.
            Ok(None) | Err(_) => break,
        }
    }
    // Exactly one publish per worker, even when cancelled early.
    let _ = result_tx.send(partial);
}
