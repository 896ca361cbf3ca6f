//! Errors surfaced by pipeline tasks.

use std::error::Error as StdError;

use osmerge_core::{ConflictResolutionError, MergeError, Side, UnsortedInputError};
use thiserror::Error;

/// Failure of a pipeline task or of the pipeline as a whole.
///
/// [`PipelineError::Aborted`] is how a task unwinds after a sibling has
/// failed; it is never reported as the root cause while another error is
/// recorded.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A merge input violated the stream order.
    #[error("{source} (in the {side} input of task '{task}')")]
    UnsortedInput {
        /// Merge task that detected the violation.
        task: String,
        /// Input that delivered the offending record.
        side: Side,
        /// Ordering violation.
        #[source]
        source: UnsortedInputError,
    },
    /// Conflict resolution was invoked on mismatched keys.
    #[error("task '{task}': {source}")]
    ConflictResolution {
        /// Merge task that invoked resolution.
        task: String,
        /// Resolution failure.
        #[source]
        source: ConflictResolutionError,
    },
    /// A declared bound had to be removed and the merge forbids it.
    #[error(
        "task '{task}': the bound declared by the {side} input cannot be kept in the merged output"
    )]
    BoundRemoved {
        /// Merge task that removed the bound.
        task: String,
        /// Input that declared the bound.
        side: Side,
    },
    /// The pipeline was shut down while the task was running.
    #[error("pipeline aborted")]
    Aborted,
    /// A record was sent after its stream was finished.
    #[error("stream already finished")]
    StreamFinished,
    /// A task panicked.
    #[error("task '{task}' panicked: {message}")]
    Panicked {
        /// Task that panicked.
        task: String,
        /// Panic payload, when it was a string.
        message: String,
    },
    /// A task's own source or sink failed.
    #[error("task '{task}' failed: {source}")]
    Task {
        /// Failing task.
        task: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    /// A thread could not be started for a task.
    #[error("failed to start task '{task}': {source}")]
    Spawn {
        /// Task that could not be started.
        task: String,
        /// Operating system error.
        #[source]
        source: std::io::Error,
    },
    /// A stream buffer was configured with no room for records.
    #[error("buffer capacity must be at least 1")]
    InvalidCapacity,
}

impl PipelineError {
    /// Whether this error is shutdown noise rather than a root cause.
    #[must_use]
    pub const fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Wrap an arbitrary task failure.
    pub fn task(task: &str, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Task {
            task: task.to_owned(),
            source: Box::new(source),
        }
    }

    /// Attribute a merge failure to `task`.
    ///
    /// Failures of the channels feeding or draining the merge are passed
    /// through unchanged so shutdown noise stays recognisable.
    #[must_use]
    pub fn from_merge(task: &str, err: MergeError<Self>) -> Self {
        let task = task.to_owned();
        match err {
            MergeError::UnsortedInput { side, source } => Self::UnsortedInput {
                task,
                side,
                source,
            },
            MergeError::ConflictResolution(source) => Self::ConflictResolution { task, source },
            MergeError::BoundRemoved { side } => Self::BoundRemoved { task, side },
            MergeError::Input { source, .. } | MergeError::Output { source } => source,
        }
    }
}
