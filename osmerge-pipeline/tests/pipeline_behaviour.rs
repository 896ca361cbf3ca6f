//! Behaviour tests for running merges across threads.

use std::cell::RefCell;

use osmerge_core::test_support::{item, node_at};
use osmerge_core::{EntityItem, EntityKey, Keyed, MergeOptions, RecordSink, VecSink, VecSource};
use osmerge_pipeline::{Pipeline, PipelineError, PipelineReport};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

/// Inputs and outcome of one pipeline run.
#[derive(Default)]
struct Run {
    left: Vec<i64>,
    right: Vec<i64>,
    capacity: usize,
    outcome: Option<Result<(PipelineReport, Vec<EntityItem>), PipelineError>>,
    leftover: Option<PipelineError>,
}

#[fixture]
fn run() -> RefCell<Run> {
    RefCell::new(Run {
        capacity: osmerge_pipeline::DEFAULT_BUFFER_CAPACITY,
        ..Run::default()
    })
}

fn source(ids: &[i64]) -> VecSource<EntityItem> {
    ids.iter().map(|&id| item(node_at(id, 1, 0))).collect()
}

/// Sink handing its records back over a standard channel once complete.
struct ReturningSink {
    inner: VecSink<EntityItem>,
    done: std::sync::mpsc::Sender<Vec<EntityItem>>,
}

impl RecordSink for ReturningSink {
    type Record = EntityItem;
    type Error = std::convert::Infallible;

    fn receive(&mut self, record: EntityItem) -> Result<(), Self::Error> {
        self.inner.receive(record)
    }

    fn complete(&mut self) -> Result<(), Self::Error> {
        let records = std::mem::take(&mut self.inner).into_records();
        let _ = self.done.send(records);
        Ok(())
    }
}

#[given("two sorted producers of overlapping nodes")]
fn overlapping_producers(#[from(run)] run: &RefCell<Run>) {
    let mut run = run.borrow_mut();
    run.left = (1..=300).filter(|id| id % 2 == 1).collect();
    run.right = (1..=300).filter(|id| id % 5 == 0).collect();
}

#[given("a left producer emitting node 5 before node 3")]
fn unsorted_producer(#[from(run)] run: &RefCell<Run>) {
    let mut run = run.borrow_mut();
    run.left = vec![5, 3];
    run.right = (1..=500).collect();
}

#[given("a buffer capacity of one record")]
fn tiny_buffers(#[from(run)] run: &RefCell<Run>) {
    run.borrow_mut().capacity = 1;
}

#[when("the merge pipeline runs")]
fn run_pipeline(#[from(run)] run: &RefCell<Run>) {
    let mut run = run.borrow_mut();
    let mut pipeline = Pipeline::with_buffer_capacity(run.capacity).expect("pipeline");
    let context = pipeline.context().clone();
    let left = pipeline.source("read-left", source(&run.left)).expect("left");
    let right = pipeline.source("read-right", source(&run.right)).expect("right");
    let merged = pipeline
        .entity_merge("merge", left, right, MergeOptions::default())
        .expect("merge");
    let (done, collected) = std::sync::mpsc::channel();
    pipeline.sink("write", merged, ReturningSink {
        inner: VecSink::new(),
        done,
    });

    let outcome = pipeline
        .run()
        .map(|report| (report, collected.try_recv().unwrap_or_default()));
    run.outcome = Some(outcome);
    run.leftover = context.take_failure();
}

#[then("the run succeeds")]
fn run_succeeds(#[from(run)] run: &RefCell<Run>) {
    let run = run.borrow();
    assert!(
        matches!(run.outcome, Some(Ok(_))),
        "{:?}",
        run.outcome.as_ref().map(|outcome| outcome.as_ref().err())
    );
}

#[then("the sink receives every distinct node in order")]
fn sink_receives_everything(#[from(run)] run: &RefCell<Run>) {
    let run = run.borrow();
    let Some(Ok((report, records))) = &run.outcome else {
        panic!("run did not succeed");
    };
    let expected: Vec<_> = (1..=300)
        .filter(|id| id % 2 == 1 || id % 5 == 0)
        .map(EntityKey::node)
        .collect();
    let keys: Vec<_> = records.iter().map(Keyed::key).collect();
    assert_eq!(keys, expected);
    assert_eq!(
        report.task("merge").map(|task| task.records),
        u64::try_from(expected.len()).ok()
    );
}

#[then("the run fails because the input is not sorted")]
fn run_fails_unsorted(#[from(run)] run: &RefCell<Run>) {
    let run = run.borrow();
    let Some(Err(err)) = &run.outcome else {
        panic!("run did not fail");
    };
    assert!(matches!(err, PipelineError::UnsortedInput { .. }), "{err:?}");
    assert!(err.to_string().starts_with("Pipeline entities are not sorted"));
}

#[then("no further root cause is recorded")]
fn no_further_root_cause(#[from(run)] run: &RefCell<Run>) {
    let run = run.borrow();
    assert!(run.leftover.as_ref().is_some_and(PipelineError::is_abort));
}

#[scenario(path = "tests/features/pipeline.feature", index = 0)]
fn sorted_merge_completes(run: RefCell<Run>) {
    let _ = run;
}

#[scenario(path = "tests/features/pipeline.feature", index = 1)]
fn unsorted_input_fails_once(run: RefCell<Run>) {
    let _ = run;
}
