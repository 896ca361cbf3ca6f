//! Dated change records describing deltas between dataset snapshots.

use crate::entity::Entity;

/// What a change record does to its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ChangeAction {
    /// The entity did not exist before.
    Create,
    /// The entity replaces an earlier revision.
    Modify,
    /// The entity is removed; the record carries its last revision.
    Delete,
}

impl ChangeAction {
    /// Return the action as a lowercase `&str`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Modify => "modify",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entity revision paired with the action that produced it.
///
/// Change streams are sorted by the key of the wrapped entity and hold at
/// most one record per key.
///
/// # Examples
/// ```
/// use chrono::DateTime;
/// use osmerge_core::{ChangeAction, ChangeRecord, Entity, EntityKey};
///
/// let timestamp = DateTime::from_timestamp(0, 0).unwrap_or_default();
/// let record = ChangeRecord::new(ChangeAction::Delete, Entity::way(5, 2, timestamp, vec![1, 2]));
///
/// assert_eq!(record.key(), EntityKey::way(5));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChangeRecord {
    /// Action applied to the entity.
    pub action: ChangeAction,
    /// Revision the action applies.
    pub entity: Entity,
}

impl ChangeRecord {
    /// Pair `entity` with `action`.
    #[must_use]
    pub const fn new(action: ChangeAction, entity: Entity) -> Self {
        Self { action, entity }
    }

    /// Key of the wrapped entity.
    #[must_use]
    pub const fn key(&self) -> crate::EntityKey {
        self.entity.key()
    }
}
