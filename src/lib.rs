//! Facade crate for the osmerge streaming merge engine.
//!
//! Re-exports the record model, conflict resolution and merge-join types
//! from `osmerge-core`, and the threaded pipeline runtime from
//! `osmerge-pipeline`.

#![forbid(unsafe_code)]

pub use osmerge_core::{
    Bound, BoundRemovedAction, ChangeAction, ChangeMerger, ChangeRecord, ConflictResolutionError,
    ConflictResolutionMethod, Entity, EntityItem, EntityKey, EntityMerger, EntityType, Keyed,
    MergeError, MergeJoin, MergeOptions, MergePolicy, MergeStats, RecordSink, RecordSource,
    Resolvable, Side, UnsortedInputError, Winner,
};

pub use osmerge_pipeline::{Pipeline, PipelineContext, PipelineError, PipelineReport};
