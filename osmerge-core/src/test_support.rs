//! Builders for small hand-written streams used by unit tests, behaviour
//! tests and benchmarks.
//!
//! Every entity built here sits at the origin and carries no tags, so two
//! records differ only in the attributes conflict resolution inspects.

use chrono::{DateTime, Utc};
use geo::{Coord, Rect};

use crate::{Bound, ChangeAction, ChangeRecord, Entity, EntityItem};

/// Instant `secs` seconds after the Unix epoch.
///
/// Out-of-range values collapse to the epoch.
#[must_use]
pub fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Node `id` at the origin with the given version and timestamp.
#[must_use]
pub fn node_at(id: i64, version: i32, secs: i64) -> Entity {
    Entity::node(id, version, timestamp(secs), Coord { x: 0.0, y: 0.0 })
}

/// Way `id` with no node references.
#[must_use]
pub fn way_at(id: i64, version: i32, secs: i64) -> Entity {
    Entity::way(id, version, timestamp(secs), Vec::new())
}

/// Relation `id` with no members.
#[must_use]
pub fn relation_at(id: i64, version: i32, secs: i64) -> Entity {
    Entity::relation(id, version, timestamp(secs), Vec::new())
}

/// Square bound spanning `min..=max` on both axes.
#[must_use]
pub fn square_bound(min: f64, max: f64, origin: &str) -> Bound {
    Bound::new(Rect::new(Coord { x: min, y: min }, Coord { x: max, y: max })).with_origin(origin)
}

/// Wrap an entity as a snapshot stream item.
#[must_use]
pub fn item(entity: Entity) -> EntityItem {
    EntityItem::Entity(entity)
}

/// Wrap an entity in a change record.
#[must_use]
pub const fn change(action: ChangeAction, entity: Entity) -> ChangeRecord {
    ChangeRecord::new(action, entity)
}
