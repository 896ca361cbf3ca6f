//! Concurrency bridge for merge pipelines.
//!
//! Every task runs on its own thread. Tasks exchange records over bounded
//! blocking streams, so a slow consumer throttles its producers instead of
//! letting buffers grow. A shared [`PipelineContext`] carries the shutdown
//! signal and collects failures: the first real error is kept as the root
//! cause and the [`PipelineError::Aborted`] unwinding it triggers in other
//! tasks is suppressed.

#![forbid(unsafe_code)]

mod context;
mod error;
mod pipeline;
mod queue;

pub use context::PipelineContext;
pub use error::PipelineError;
pub use pipeline::{DEFAULT_BUFFER_CAPACITY, Pipeline, PipelineReport, TaskReport};
pub use queue::{RecordReceiver, RecordSender, channel};
