//! Shared shutdown signal and failure collector for one pipeline run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use log::{debug, error};
use parking_lot::Mutex;

use crate::PipelineError;

/// Something blocked threads may be waiting on.
pub(crate) trait Interrupt: Send + Sync {
    /// Wake every waiter and discard buffered records.
    fn interrupt(&self);
}

#[derive(Default)]
struct Failures {
    root: Option<PipelineError>,
    suppressed: usize,
}

#[derive(Default)]
struct Inner {
    aborted: AtomicBool,
    queues: Mutex<Vec<Weak<dyn Interrupt>>>,
    failures: Mutex<Failures>,
}

/// Cancellation context shared by every task of a pipeline.
///
/// The first error that is not [`PipelineError::Aborted`] becomes the root
/// cause. Reporting any error aborts the pipeline: every queue created
/// under the context wakes its blocked threads, which then unwind with
/// [`PipelineError::Aborted`].
#[derive(Clone, Default)]
pub struct PipelineContext {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("aborted", &self.is_aborted())
            .finish_non_exhaustive()
    }
}

impl PipelineContext {
    /// Create a context with no failure recorded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::Acquire)
    }

    /// Request shutdown and wake every blocked thread.
    pub fn abort(&self) {
        if self.inner.aborted.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!("pipeline shutdown requested");
        let queues = std::mem::take(&mut *self.inner.queues.lock());
        for queue in queues.iter().filter_map(Weak::upgrade) {
            queue.interrupt();
        }
    }

    /// Record a task failure and abort the pipeline.
    pub fn report(&self, task: &str, err: PipelineError) {
        {
            let mut failures = self.inner.failures.lock();
            if err.is_abort() || failures.root.is_some() {
                debug!("task '{task}' stopped: {err}");
                failures.suppressed += 1;
            } else {
                error!("task '{task}' failed: {err}");
                failures.root = Some(err);
            }
        }
        self.abort();
    }

    /// Take the root-cause error, if one was recorded.
    ///
    /// An aborted context without a recorded root cause yields
    /// [`PipelineError::Aborted`].
    #[must_use]
    pub fn take_failure(&self) -> Option<PipelineError> {
        let root = self.inner.failures.lock().root.take();
        match root {
            Some(err) => Some(err),
            None if self.is_aborted() => Some(PipelineError::Aborted),
            None => None,
        }
    }

    /// Number of reported errors that were not the root cause.
    #[must_use]
    pub fn suppressed(&self) -> usize {
        self.inner.failures.lock().suppressed
    }

    /// Register a queue so [`Self::abort`] can wake it.
    pub(crate) fn register(&self, queue: Weak<dyn Interrupt>) {
        let mut queues = self.inner.queues.lock();
        if self.is_aborted() {
            drop(queues);
            if let Some(queue) = queue.upgrade() {
                queue.interrupt();
            }
            return;
        }
        queues.retain(|existing| existing.strong_count() > 0);
        queues.push(queue);
    }
}
