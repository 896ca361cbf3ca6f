//! Capabilities shared by every record that flows through a merge.

use chrono::{DateTime, Utc};

use crate::{Bound, ChangeRecord, Entity, EntityKey};

/// A record with an identity in the stream order.
pub trait Keyed {
    /// Identity used for ordering and conflict detection.
    fn key(&self) -> EntityKey;
}

/// A keyed record that carries the attributes conflict resolution inspects.
pub trait Resolvable: Keyed {
    /// Revision number of the record.
    fn version(&self) -> i32;
    /// Time the revision was made.
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Keyed for Entity {
    fn key(&self) -> EntityKey {
        Self::key(self)
    }
}

impl Resolvable for Entity {
    fn version(&self) -> i32 {
        self.version
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Keyed for ChangeRecord {
    fn key(&self) -> EntityKey {
        self.entity.key()
    }
}

// Change records resolve on the revision they carry.
impl Resolvable for ChangeRecord {
    fn version(&self) -> i32 {
        self.entity.version
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.entity.timestamp
    }
}

/// Element of a full snapshot stream: an optional leading bound, then
/// entities.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EntityItem {
    /// The dataset's declared extent.
    Bound(Bound),
    /// A map entity.
    Entity(Entity),
}

impl EntityItem {
    /// Return the entity, if this item is one.
    #[must_use]
    pub const fn as_entity(&self) -> Option<&Entity> {
        match self {
            Self::Entity(entity) => Some(entity),
            Self::Bound(_) => None,
        }
    }

    /// Return the bound, if this item is one.
    #[must_use]
    pub const fn as_bound(&self) -> Option<&Bound> {
        match self {
            Self::Bound(bound) => Some(bound),
            Self::Entity(_) => None,
        }
    }
}

impl Keyed for EntityItem {
    fn key(&self) -> EntityKey {
        match self {
            Self::Bound(_) => EntityKey::BOUND,
            Self::Entity(entity) => entity.key(),
        }
    }
}

impl From<Entity> for EntityItem {
    fn from(entity: Entity) -> Self {
        Self::Entity(entity)
    }
}

impl From<Bound> for EntityItem {
    fn from(bound: Bound) -> Self {
        Self::Bound(bound)
    }
}
