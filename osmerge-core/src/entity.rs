//! Map entities: nodes, ways and relations.
//!
//! Entities are plain values. Once a producer hands one to a stream it is
//! owned by that stream until a consumer takes it; nothing mutates it in
//! between.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use geo::Coord;

use crate::key::{EntityKey, EntityType};

/// Free-form key/value tags, kept sorted for deterministic output.
pub type Tags = BTreeMap<String, String>;

/// Author of an entity revision.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityUser {
    /// Numeric user identifier.
    pub id: i32,
    /// Display name at the time of the edit.
    pub name: String,
}

/// Member of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelationMember {
    /// Referenced entity.
    pub member: EntityKey,
    /// Role of the member within the relation; may be empty.
    pub role: String,
}

/// Type-specific payload of an entity.
///
/// The geometry decides the entity's [`EntityType`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "lowercase"))]
pub enum Geometry {
    /// A point. Coordinates are WGS84 with `x = longitude`, `y = latitude`.
    Node {
        /// Position of the node.
        location: Coord<f64>,
    },
    /// An ordered polyline over node identifiers.
    Way {
        /// Referenced node identifiers in path order.
        node_refs: Vec<i64>,
    },
    /// A group of members.
    Relation {
        /// Members in declaration order.
        members: Vec<RelationMember>,
    },
}

impl Geometry {
    /// Entity type implied by this geometry.
    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        match self {
            Self::Node { .. } => EntityType::Node,
            Self::Way { .. } => EntityType::Way,
            Self::Relation { .. } => EntityType::Relation,
        }
    }
}

/// A versioned map entity.
///
/// # Examples
/// ```
/// use chrono::DateTime;
/// use geo::Coord;
/// use osmerge_core::{Entity, EntityKey};
///
/// let timestamp = DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default();
/// let node = Entity::node(7, 3, timestamp, Coord { x: 13.4, y: 52.5 })
///     .with_tag("amenity", "cafe");
///
/// assert_eq!(node.key(), EntityKey::node(7));
/// assert_eq!(node.tags.get("amenity").map(String::as_str), Some("cafe"));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entity {
    /// Identifier, unique within the entity type.
    pub id: i64,
    /// Revision number; higher is newer.
    pub version: i32,
    /// Time the revision was made.
    pub timestamp: DateTime<Utc>,
    /// Author of the revision, when known.
    #[cfg_attr(feature = "serde", serde(default))]
    pub user: Option<EntityUser>,
    /// Changeset the revision belongs to.
    #[cfg_attr(feature = "serde", serde(default))]
    pub changeset_id: i64,
    /// Key/value tags.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tags: Tags,
    /// Type-specific payload.
    pub geometry: Geometry,
}

impl Entity {
    /// Construct an untagged entity from its parts.
    #[must_use]
    pub const fn new(id: i64, version: i32, timestamp: DateTime<Utc>, geometry: Geometry) -> Self {
        Self {
            id,
            version,
            timestamp,
            user: None,
            changeset_id: 0,
            tags: Tags::new(),
            geometry,
        }
    }

    /// Construct a node at `location`.
    #[must_use]
    pub const fn node(
        id: i64,
        version: i32,
        timestamp: DateTime<Utc>,
        location: Coord<f64>,
    ) -> Self {
        Self::new(id, version, timestamp, Geometry::Node { location })
    }

    /// Construct a way over `node_refs`.
    #[must_use]
    pub const fn way(id: i64, version: i32, timestamp: DateTime<Utc>, node_refs: Vec<i64>) -> Self {
        Self::new(id, version, timestamp, Geometry::Way { node_refs })
    }

    /// Construct a relation with `members`.
    #[must_use]
    pub const fn relation(
        id: i64,
        version: i32,
        timestamp: DateTime<Utc>,
        members: Vec<RelationMember>,
    ) -> Self {
        Self::new(id, version, timestamp, Geometry::Relation { members })
    }

    /// Attach a tag, replacing any previous value for `key`.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Attach the revision author.
    #[must_use]
    pub fn with_user(mut self, id: i32, name: impl Into<String>) -> Self {
        self.user = Some(EntityUser {
            id,
            name: name.into(),
        });
        self
    }

    /// Attach the changeset identifier.
    #[must_use]
    pub fn with_changeset(mut self, changeset_id: i64) -> Self {
        self.changeset_id = changeset_id;
        self
    }

    /// Type of this entity.
    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        self.geometry.entity_type()
    }

    /// Identity of this entity within a sorted stream.
    #[must_use]
    pub const fn key(&self) -> EntityKey {
        EntityKey::new(self.entity_type(), self.id)
    }
}
