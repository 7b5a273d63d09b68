//! Job Scheduler
//!
//! The scheduler coalesces update jobs so that many synchronous state changes
//! cause one re-render per component.
//!
//! # Algorithm
//!
//! 1. [`queue_job`] appends a job unless the queue already holds the same job
//!    (compared by identity). The first job queued in a tick marks a flush as
//!    pending.
//!
//! 2. A flush takes a snapshot of the queue, empties it and runs the
//!    snapshot in insertion order. Jobs queued while the snapshot runs start
//!    a new batch, which the same flush picks up afterwards.
//!
//! 3. A flush stops after [`recursion_limit`](crate::config::RuntimeConfig)
//!    consecutive batches. Remaining jobs are dropped and
//!    [`RuntimeError::RecursionLimit`] is reported.
//!
//! Flushes happen at a microtask-like boundary: either [`next_tick`] awaited
//! on the tokio runtime, or an explicit [`flush_pending`].

use std::cell::RefCell;
use std::sync::Arc;

use tokio::runtime::RuntimeFlavor;

use crate::config;
use crate::error::{report, RuntimeError};

/// A unit of deferred work, deduplicated by identity.
pub type Job = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct QueueState {
    queue: Vec<Job>,
    flush_pending: bool,
}

thread_local! {
    static QUEUE: RefCell<QueueState> = RefCell::new(QueueState::default());
}

/// Queue `job` for the next flush, unless it is already queued.
pub fn queue_job(job: Job) {
    QUEUE.with(|state| {
        let mut state = state.borrow_mut();
        if state.queue.iter().any(|queued| Arc::ptr_eq(queued, &job)) {
            return;
        }
        state.queue.push(job);
        if !state.flush_pending {
            state.flush_pending = true;
            tracing::trace!("flush scheduled");
        }
    });
}

/// Remove a queued job, e.g. because its owner updated synchronously.
pub fn invalidate_job(job: &Job) {
    QUEUE.with(|state| {
        state
            .borrow_mut()
            .queue
            .retain(|queued| !Arc::ptr_eq(queued, job));
    });
}

/// Whether a flush is pending on this thread.
pub fn has_pending_jobs() -> bool {
    QUEUE.with(|state| state.borrow().flush_pending)
}

/// Number of jobs waiting in the queue.
pub fn queued_job_count() -> usize {
    QUEUE.with(|state| state.borrow().queue.len())
}

/// Run queued jobs until the queue is empty.
///
/// Returns the number of batches flushed.
pub fn flush_pending() -> usize {
    let limit = config::current().recursion_limit;
    let mut batches = 0;

    loop {
        let batch = QUEUE.with(|state| {
            let mut state = state.borrow_mut();
            if !state.flush_pending && state.queue.is_empty() {
                return None;
            }
            state.flush_pending = false;
            Some(std::mem::take(&mut state.queue))
        });
        let Some(batch) = batch else {
            break;
        };

        if batches >= limit {
            tracing::error!(limit, dropped = batch.len(), "recursive updates detected");
            report(RuntimeError::RecursionLimit { limit });
            break;
        }

        tracing::trace!(jobs = batch.len(), batch = batches, "flushing jobs");
        for job in &batch {
            job();
        }
        batches += 1;
    }

    batches
}

/// Yield to the tokio runtime, then flush pending jobs.
///
/// Awaiting this after a state change guarantees the resulting re-renders
/// have been applied.
///
/// The job queue is per thread, so this must run on a current-thread
/// runtime (the `#[tokio::test]` default). On a multi-thread runtime the
/// task may resume on another worker and flush that worker's queue.
pub async fn next_tick() {
    debug_assert!(
        tokio::runtime::Handle::try_current()
            .map_or(true, |handle| handle.runtime_flavor() == RuntimeFlavor::CurrentThread),
        "next_tick requires a current-thread tokio runtime"
    );
    tokio::task::yield_now().await;
    flush_pending();
}

// ---- Tests ----
