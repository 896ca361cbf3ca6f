//! Full-snapshot merge of entity streams.

use std::fmt;

use log::warn;

use super::{Collision, MergeJoin, MergePolicy, PeerState, PolicyError, Side};
use crate::{ConflictResolutionError, ConflictResolutionMethod, EntityItem, Keyed, RecordSource};

/// Reaction when a declared bound cannot be carried into the merged output.
///
/// A bound is removed when only one input declares it while the other
/// contributes entities: the declared extent no longer describes the merged
/// dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BoundRemovedAction {
    /// Drop the bound silently.
    #[default]
    Ignore,
    /// Drop the bound and log a warning.
    Warn,
    /// Abort the merge.
    Fail,
}

impl BoundRemovedAction {
    /// Return the configuration keyword for this action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Warn => "warn",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for BoundRemovedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BoundRemovedAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "warn" => Ok(Self::Warn),
            "fail" => Ok(Self::Fail),
            _ => Err(format!(
                "unknown bound removed action '{s}' (expected ignore, warn or fail)"
            )),
        }
    }
}

/// Options of an entity merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct MergeOptions {
    /// Strategy applied to colliding entities.
    pub conflict_resolution_method: ConflictResolutionMethod,
    /// Reaction to a removed bound.
    pub bound_removed_action: BoundRemovedAction,
}

impl MergeOptions {
    /// Options using `method` and the default bound policy.
    #[must_use]
    pub const fn with_method(method: ConflictResolutionMethod) -> Self {
        Self {
            conflict_resolution_method: method,
            bound_removed_action: BoundRemovedAction::Ignore,
        }
    }

    /// Replace the bound policy.
    #[must_use]
    pub const fn bound_removed_action(mut self, action: BoundRemovedAction) -> Self {
        self.bound_removed_action = action;
        self
    }
}

/// [`MergePolicy`] for [`EntityItem`] streams.
///
/// Colliding entities are resolved whole. Two bounds combine into their
/// union; a bound present on one side only is handled by
/// [`BoundRemovedAction`], unless the other input is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityMergePolicy {
    options: MergeOptions,
}

impl EntityMergePolicy {
    /// Create a policy from `options`.
    #[must_use]
    pub const fn new(options: MergeOptions) -> Self {
        Self { options }
    }

    /// Options in effect.
    #[must_use]
    pub const fn options(&self) -> MergeOptions {
        self.options
    }
}

impl MergePolicy for EntityMergePolicy {
    type Record = EntityItem;

    fn collide(
        &mut self,
        left: EntityItem,
        right: EntityItem,
    ) -> Result<Collision<EntityItem>, PolicyError> {
        match (left, right) {
            (EntityItem::Bound(left), EntityItem::Bound(right)) => {
                Ok(Collision::Combined(EntityItem::Bound(left.union(&right))))
            }
            (EntityItem::Entity(left), EntityItem::Entity(right)) => {
                let (winner, entity) = self
                    .options
                    .conflict_resolution_method
                    .decide(left, right)?;
                Ok(Collision::Winner(winner, EntityItem::Entity(entity)))
            }
            (left, right) => Err(ConflictResolutionError {
                left: left.key(),
                right: right.key(),
            }
            .into()),
        }
    }

    fn unmatched(
        &mut self,
        side: Side,
        record: EntityItem,
        peer: PeerState,
    ) -> Result<Option<EntityItem>, PolicyError> {
        if !matches!(record, EntityItem::Bound(_)) || peer == PeerState::Empty {
            return Ok(Some(record));
        }
        match self.options.bound_removed_action {
            BoundRemovedAction::Ignore => Ok(None),
            BoundRemovedAction::Warn => {
                warn!(
                    "the {} input declares a bound but the {} input does not; \
                     the bound has been removed from the merged output",
                    side,
                    side.opposite()
                );
                Ok(None)
            }
            BoundRemovedAction::Fail => Err(PolicyError::BoundRemoved { side }),
        }
    }
}

/// Merge of two full-snapshot entity streams.
pub type EntityMerger<L, R> = MergeJoin<L, R, EntityMergePolicy>;

impl<L, R> MergeJoin<L, R, EntityMergePolicy>
where
    L: RecordSource<Record = EntityItem>,
    R: RecordSource<Record = EntityItem, Error = L::Error>,
{
    /// Merge `left` and `right` with `options`.
    ///
    /// # Examples
    /// ```
    /// use chrono::DateTime;
    /// use geo::Coord;
    /// use osmerge_core::{ConflictResolutionMethod, Entity, EntityItem, EntityMerger, MergeOptions, VecSource};
    ///
    /// let at = |secs| DateTime::from_timestamp(secs, 0).unwrap_or_default();
    /// let node = |id, secs| EntityItem::from(Entity::node(id, 1, at(secs), Coord { x: 0.0, y: 0.0 }));
    /// let left = VecSource::new([node(1, 10), node(2, 10)]);
    /// let right = VecSource::new([node(2, 20), node(3, 10)]);
    ///
    /// let merger = EntityMerger::new(left, right, MergeOptions::with_method(ConflictResolutionMethod::Timestamp));
    /// let merged = merger.into_records()?;
    /// assert_eq!(merged, vec![node(1, 10), node(2, 20), node(3, 10)]);
    /// # Ok::<(), osmerge_core::MergeError<std::convert::Infallible>>(())
    /// ```
    pub const fn new(left: L, right: R, options: MergeOptions) -> Self {
        Self::with_policy(left, right, EntityMergePolicy::new(options))
    }
}
