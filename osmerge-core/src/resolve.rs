//! Conflict resolution between two records sharing one identity.
//!
//! Resolution always selects one whole record. It never merges attributes
//! and never synthesises a new record.

use std::fmt;

use thiserror::Error;

use crate::{EntityKey, Resolvable};

/// Strategy used to pick a winner when both inputs carry the same key.
///
/// # Examples
/// ```
/// use std::str::FromStr;
/// use osmerge_core::ConflictResolutionMethod;
///
/// let method = ConflictResolutionMethod::from_str("lastSource")?;
/// assert_eq!(method, ConflictResolutionMethod::LastSource);
/// assert_eq!(ConflictResolutionMethod::default().to_string(), "timestamp");
/// # Ok::<(), String>(())
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum ConflictResolutionMethod {
    /// The later timestamp wins; the right input wins ties.
    #[default]
    Timestamp,
    /// The higher version wins; the right input wins ties.
    Version,
    /// The right input always wins.
    LastSource,
}

/// Input whose record was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Winner {
    /// The first-declared input.
    Left,
    /// The second-declared input.
    Right,
}

/// Resolution was requested for records with different identities.
///
/// The merge driver only resolves equal keys, so this signals a bug in the
/// caller rather than bad input data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot resolve a conflict between {left} and {right}: keys differ")]
pub struct ConflictResolutionError {
    /// Key of the left record.
    pub left: EntityKey,
    /// Key of the right record.
    pub right: EntityKey,
}

impl ConflictResolutionMethod {
    /// Return the configuration keyword for this method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::Version => "version",
            Self::LastSource => "lastSource",
        }
    }

    /// Decide which of two same-key records wins without moving them.
    ///
    /// Keys are not checked; see [`Self::resolve`].
    #[must_use]
    pub fn choose<T: Resolvable>(self, left: &T, right: &T) -> Winner {
        let left_wins = match self {
            Self::Timestamp => left.timestamp() > right.timestamp(),
            Self::Version => left.version() > right.version(),
            Self::LastSource => false,
        };
        if left_wins { Winner::Left } else { Winner::Right }
    }

    /// Select the winning record and report which input it came from.
    ///
    /// # Errors
    /// Returns [`ConflictResolutionError`] when the keys differ.
    pub fn decide<T: Resolvable>(
        self,
        left: T,
        right: T,
    ) -> Result<(Winner, T), ConflictResolutionError> {
        let (left_key, right_key) = (left.key(), right.key());
        if left_key != right_key {
            return Err(ConflictResolutionError {
                left: left_key,
                right: right_key,
            });
        }
        Ok(match self.choose(&left, &right) {
            Winner::Left => (Winner::Left, left),
            Winner::Right => (Winner::Right, right),
        })
    }

    /// Select the winning record of two same-key candidates.
    ///
    /// # Examples
    /// ```
    /// use chrono::DateTime;
    /// use geo::Coord;
    /// use osmerge_core::{ConflictResolutionMethod, Entity};
    ///
    /// let at = |secs| DateTime::from_timestamp(secs, 0).unwrap_or_default();
    /// let origin = Coord { x: 0.0, y: 0.0 };
    /// let older = Entity::node(1, 2, at(10), origin);
    /// let newer = Entity::node(1, 1, at(20), origin);
    ///
    /// let winner = ConflictResolutionMethod::Timestamp.resolve(newer.clone(), older)?;
    /// assert_eq!(winner, newer);
    /// # Ok::<(), osmerge_core::ConflictResolutionError>(())
    /// ```
    ///
    /// # Errors
    /// Returns [`ConflictResolutionError`] when the keys differ.
    pub fn resolve<T: Resolvable>(self, left: T, right: T) -> Result<T, ConflictResolutionError> {
        self.decide(left, right).map(|(_, record)| record)
    }
}

impl fmt::Display for ConflictResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConflictResolutionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "timestamp" => Ok(Self::Timestamp),
            "version" => Ok(Self::Version),
            "lastsource" | "last-source" => Ok(Self::LastSource),
            _ => Err(format!(
                "unknown conflict resolution method '{s}' (expected timestamp, version or lastSource)"
            )),
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}
