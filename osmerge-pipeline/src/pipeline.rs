//! Thread-per-task pipeline runner.
//!
//! Tasks are declared up front and started together by [`Pipeline::run`].
//! Each task runs on its own named thread and talks to its neighbours only
//! through bounded streams. The first task failure aborts every other task;
//! `run` reports that root cause once.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use log::{debug, info};
use osmerge_core::{
    ChangeMerger, ChangeRecord, ConflictResolutionMethod, EntityItem, EntityMerger, MergeOptions,
    RecordSink, RecordSource,
};

use crate::{PipelineContext, PipelineError, RecordReceiver, RecordSender, channel};

/// Buffer capacity used when none is configured.
pub const DEFAULT_BUFFER_CAPACITY: usize = 20;

type TaskBody = Box<dyn FnOnce() -> Result<u64, PipelineError> + Send + 'static>;

struct Task {
    name: String,
    body: TaskBody,
}

/// Outcome of one task in a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    /// Task name.
    pub name: String,
    /// Records the task produced, or consumed for sinks.
    pub records: u64,
}

/// Outcome of a successful run, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// One entry per task.
    pub tasks: Vec<TaskReport>,
}

impl PipelineReport {
    /// Report for the task called `name`.
    #[must_use]
    pub fn task(&self, name: &str) -> Option<&TaskReport> {
        self.tasks.iter().find(|task| task.name == name)
    }
}

/// Builder and runner for a graph of tasks.
///
/// # Examples
/// ```
/// use osmerge_core::test_support::{item, node_at};
/// use osmerge_core::{MergeOptions, VecSink, VecSource};
/// use osmerge_pipeline::Pipeline;
///
/// let mut pipeline = Pipeline::new();
/// let left = pipeline.source("read-left", VecSource::new([item(node_at(1, 1, 0))]))?;
/// let right = pipeline.source("read-right", VecSource::new([item(node_at(2, 1, 0))]))?;
/// let merged = pipeline.entity_merge("merge", left, right, MergeOptions::default())?;
/// pipeline.sink("write", merged, VecSink::new());
///
/// let report = pipeline.run()?;
/// assert_eq!(report.task("write").map(|task| task.records), Some(2));
/// # Ok::<(), osmerge_pipeline::PipelineError>(())
/// ```
pub struct Pipeline {
    context: PipelineContext,
    buffer_capacity: usize,
    tasks: Vec<Task>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.tasks.iter().map(|task| task.name.as_str()).collect();
        f.debug_struct("Pipeline")
            .field("buffer_capacity", &self.buffer_capacity)
            .field("tasks", &names)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Create a pipeline using [`DEFAULT_BUFFER_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            context: PipelineContext::new(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            tasks: Vec::new(),
        }
    }

    /// Create a pipeline whose streams buffer up to `capacity` records.
    ///
    /// # Errors
    /// Returns [`PipelineError::InvalidCapacity`] when `capacity` is zero.
    pub fn with_buffer_capacity(capacity: usize) -> Result<Self, PipelineError> {
        if capacity == 0 {
            return Err(PipelineError::InvalidCapacity);
        }
        Ok(Self {
            buffer_capacity: capacity,
            ..Self::new()
        })
    }

    /// Context shared by every task; aborting it cancels the run.
    #[must_use]
    pub const fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// Create a stream between two tasks of this pipeline.
    ///
    /// # Errors
    /// Propagates [`channel`] errors.
    pub fn channel<T: Send + 'static>(
        &self,
    ) -> Result<(RecordSender<T>, RecordReceiver<T>), PipelineError> {
        channel(&self.context, self.buffer_capacity)
    }

    /// Add a task that drains `source` into a new stream.
    ///
    /// # Errors
    /// Propagates [`channel`] errors.
    pub fn source<S>(
        &mut self,
        name: &str,
        mut source: S,
    ) -> Result<RecordReceiver<S::Record>, PipelineError>
    where
        S: RecordSource + Send + 'static,
        S::Record: Send + 'static,
    {
        let (mut tx, rx) = self.channel()?;
        let task = name.to_owned();
        self.push(name, move || {
            let mut records = 0;
            while let Some(record) = source
                .next_record()
                .map_err(|err| PipelineError::task(&task, err))?
            {
                tx.send(record)?;
                records += 1;
            }
            tx.finish()?;
            Ok(records)
        });
        Ok(rx)
    }

    /// Add a task merging two snapshot streams.
    ///
    /// # Errors
    /// Propagates [`channel`] errors.
    pub fn entity_merge(
        &mut self,
        name: &str,
        left: RecordReceiver<EntityItem>,
        right: RecordReceiver<EntityItem>,
        options: MergeOptions,
    ) -> Result<RecordReceiver<EntityItem>, PipelineError> {
        let (tx, rx) = self.channel()?;
        let task = name.to_owned();
        self.push(name, move || {
            EntityMerger::new(left, right, options)
                .run_into(tx)
                .map(|stats| stats.emitted)
                .map_err(|err| PipelineError::from_merge(&task, err))
        });
        Ok(rx)
    }

    /// Add a task merging two change streams.
    ///
    /// # Errors
    /// Propagates [`channel`] errors.
    pub fn change_merge(
        &mut self,
        name: &str,
        left: RecordReceiver<ChangeRecord>,
        right: RecordReceiver<ChangeRecord>,
        method: ConflictResolutionMethod,
    ) -> Result<RecordReceiver<ChangeRecord>, PipelineError> {
        let (tx, rx) = self.channel()?;
        let task = name.to_owned();
        self.push(name, move || {
            ChangeMerger::new(left, right, method)
                .run_into(tx)
                .map(|stats| stats.emitted)
                .map_err(|err| PipelineError::from_merge(&task, err))
        });
        Ok(rx)
    }

    /// Add a task that drains `input` into `sink`.
    pub fn sink<K>(&mut self, name: &str, mut input: RecordReceiver<K::Record>, mut sink: K)
    where
        K: RecordSink + Send + 'static,
        K::Record: Send + 'static,
    {
        let task = name.to_owned();
        self.push(name, move || {
            let mut records = 0;
            while let Some(record) = input.recv()? {
                sink.receive(record)
                    .map_err(|err| PipelineError::task(&task, err))?;
                records += 1;
            }
            sink.complete()
                .map_err(|err| PipelineError::task(&task, err))?;
            Ok(records)
        });
    }

    fn push(
        &mut self,
        name: &str,
        body: impl FnOnce() -> Result<u64, PipelineError> + Send + 'static,
    ) {
        self.tasks.push(Task {
            name: name.to_owned(),
            body: Box::new(body),
        });
    }

    /// Start every task, wait for all of them and report the outcome.
    ///
    /// # Errors
    /// Returns the root-cause [`PipelineError`] when any task failed, or
    /// [`PipelineError::Aborted`] when the run was cancelled externally.
    pub fn run(self) -> Result<PipelineReport, PipelineError> {
        let Self { context, tasks, .. } = self;
        let mut handles = Vec::with_capacity(tasks.len());
        for Task { name, body } in tasks {
            let worker_context = context.clone();
            let worker_name = name.clone();
            let spawned = thread::Builder::new()
                .name(name.clone())
                .spawn(move || run_task(&worker_context, &worker_name, body));
            match spawned {
                Ok(handle) => handles.push((name, Some(handle))),
                Err(source) => {
                    context.report(&name, PipelineError::Spawn {
                        task: name.clone(),
                        source,
                    });
                    handles.push((name, None));
                }
            }
        }

        let mut report = PipelineReport::default();
        for (name, handle) in handles {
            let Some(handle) = handle else { continue };
            match handle.join() {
                Ok(Some(records)) => report.tasks.push(TaskReport { name, records }),
                Ok(None) => {}
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    context.report(&name, PipelineError::Panicked {
                        task: name.clone(),
                        message,
                    });
                }
            }
        }

        if let Some(err) = context.take_failure() {
            return Err(err);
        }
        info!("pipeline finished: {} tasks completed", report.tasks.len());
        Ok(report)
    }
}

fn run_task(context: &PipelineContext, name: &str, body: TaskBody) -> Option<u64> {
    debug!("task '{name}' started");
    let outcome = panic::catch_unwind(AssertUnwindSafe(body));
    match outcome {
        Ok(Ok(records)) => {
            debug!("task '{name}' finished after {records} records");
            Some(records)
        }
        Ok(Err(err)) => {
            context.report(name, err);
            None
        }
        Err(payload) => {
            context.report(name, PipelineError::Panicked {
                task: name.to_owned(),
                message: panic_message(payload.as_ref()),
            });
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}
