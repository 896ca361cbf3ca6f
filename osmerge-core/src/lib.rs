//! Sorted merge-join engine for OpenStreetMap-style entity streams.
//!
//! The crate models entities, change records and dataset bounds, validates
//! that streams arrive in [`EntityKey`] order, and merges two sorted
//! streams into one while resolving records that share an identity.
//!
//! ```
//! use osmerge_core::{ConflictResolutionMethod, EntityItem, EntityMerger, MergeOptions, VecSource};
//! use osmerge_core::test_support::node_at;
//!
//! let left = VecSource::new([EntityItem::from(node_at(1, 1, 10))]);
//! let right = VecSource::new([EntityItem::from(node_at(1, 2, 5))]);
//! let options = MergeOptions::with_method(ConflictResolutionMethod::Version);
//!
//! let merged = EntityMerger::new(left, right, options).into_records()?;
//! assert_eq!(merged, vec![EntityItem::from(node_at(1, 2, 5))]);
//! # Ok::<(), osmerge_core::MergeError<std::convert::Infallible>>(())
//! ```

#![forbid(unsafe_code)]

mod bound;
mod change;
mod entity;
mod key;
pub mod merge;
mod order;
mod record;
mod resolve;
mod stream;
pub mod test_support;

pub use bound::Bound;
pub use change::{ChangeAction, ChangeRecord};
pub use entity::{Entity, EntityUser, Geometry, RelationMember, Tags};
pub use key::{EntityKey, EntityType};
pub use merge::{
    BoundRemovedAction, ChangeMergePolicy, ChangeMerger, Collision, EntityMergePolicy,
    EntityMerger, MergeError, MergeJoin, MergeOptions, MergePolicy, MergeState, MergeStats,
    PeerState, PolicyError, Side,
};
pub use order::{
    OrderValidator, ReadError, UNSORTED_INPUT_PREFIX, UnsortedInputError, ValidatedSource,
};
pub use record::{EntityItem, Keyed, Resolvable};
pub use resolve::{ConflictResolutionError, ConflictResolutionMethod, Winner};
pub use stream::{RecordSink, RecordSource, VecSink, VecSource};
