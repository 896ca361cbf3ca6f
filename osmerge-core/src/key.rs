//! Identity keys and the total order every sorted stream must follow.
//!
//! Streams are ordered by entity type first and by identifier second. The
//! type rank is `Bound < Node < Way < Relation`, so a dataset's declared
//! bound always precedes the entities it describes.

use std::fmt;

/// Kind of record carried by a sorted stream.
///
/// The declaration order is the sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EntityType {
    /// Declared spatial extent of a dataset. Never a real entity.
    Bound,
    /// A point with a location.
    Node,
    /// An ordered list of node references.
    Way,
    /// A group of typed members.
    Relation,
}

impl EntityType {
    /// Return the type as a lowercase `&str`.
    ///
    /// # Examples
    /// ```
    /// use osmerge_core::EntityType;
    ///
    /// assert_eq!(EntityType::Way.as_str(), "way");
    /// ```
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bound => "bound",
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bound" => Ok(Self::Bound),
            "node" => Ok(Self::Node),
            "way" => Ok(Self::Way),
            "relation" => Ok(Self::Relation),
            _ => Err(format!("unknown entity type '{s}'")),
        }
    }
}

/// Identity of a record within a sorted stream.
///
/// Keys compare by [`EntityType`] rank, then by `id` ascending.
///
/// # Examples
/// ```
/// use osmerge_core::EntityKey;
///
/// assert!(EntityKey::node(900) < EntityKey::way(1));
/// assert!(EntityKey::way(1) < EntityKey::way(2));
/// assert!(EntityKey::BOUND < EntityKey::node(i64::MIN));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityKey {
    /// Type rank, compared first.
    pub entity_type: EntityType,
    /// Identifier, compared second.
    pub id: i64,
}

impl EntityKey {
    /// Key shared by every bound record.
    pub const BOUND: Self = Self::new(EntityType::Bound, 0);

    /// Construct a key from its parts.
    #[must_use]
    pub const fn new(entity_type: EntityType, id: i64) -> Self {
        Self { entity_type, id }
    }

    /// Key of the node with identifier `id`.
    #[must_use]
    pub const fn node(id: i64) -> Self {
        Self::new(EntityType::Node, id)
    }

    /// Key of the way with identifier `id`.
    #[must_use]
    pub const fn way(id: i64) -> Self {
        Self::new(EntityType::Way, id)
    }

    /// Key of the relation with identifier `id`.
    #[must_use]
    pub const fn relation(id: i64) -> Self {
        Self::new(EntityType::Relation, id)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entity_type {
            EntityType::Bound => f.write_str("bound"),
            other => write!(f, "{other} {}", self.id),
        }
    }
}
