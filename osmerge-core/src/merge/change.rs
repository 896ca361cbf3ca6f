//! Delta merge of change streams.

use super::{Collision, MergeJoin, MergePolicy, PolicyError};
use crate::{ChangeRecord, ConflictResolutionMethod, RecordSource};

/// [`MergePolicy`] for [`ChangeRecord`] streams.
///
/// The winning record is emitted whole, action included. Actions of
/// colliding records are never combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeMergePolicy {
    method: ConflictResolutionMethod,
}

impl ChangeMergePolicy {
    /// Create a policy resolving collisions with `method`.
    #[must_use]
    pub const fn new(method: ConflictResolutionMethod) -> Self {
        Self { method }
    }
}

impl MergePolicy for ChangeMergePolicy {
    type Record = ChangeRecord;

    fn collide(
        &mut self,
        left: ChangeRecord,
        right: ChangeRecord,
    ) -> Result<Collision<ChangeRecord>, PolicyError> {
        let (winner, record) = self.method.decide(left, right)?;
        Ok(Collision::Winner(winner, record))
    }
}

/// Merge of two change streams.
pub type ChangeMerger<L, R> = MergeJoin<L, R, ChangeMergePolicy>;

impl<L, R> MergeJoin<L, R, ChangeMergePolicy>
where
    L: RecordSource<Record = ChangeRecord>,
    R: RecordSource<Record = ChangeRecord, Error = L::Error>,
{
    /// Merge `left` and `right`, resolving collisions with `method`.
    pub const fn new(left: L, right: R, method: ConflictResolutionMethod) -> Self {
        Self::with_policy(left, right, ChangeMergePolicy::new(method))
    }
}
