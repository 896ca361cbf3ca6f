//! Declared spatial extent of a dataset.

use geo::{Coord, Rect};

/// Bounding box a dataset claims to cover.
///
/// Coordinates are WGS84 with `x = longitude` and `y = latitude`. Extents
/// crossing the antimeridian are not modelled.
///
/// # Examples
/// ```
/// use geo::{Coord, Rect};
/// use osmerge_core::Bound;
///
/// let west = Bound::new(Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }));
/// let east = Bound::new(Rect::new(Coord { x: 2.0, y: -1.0 }, Coord { x: 3.0, y: 0.5 }));
/// let both = west.union(&east);
///
/// assert_eq!(both.extent.min(), Coord { x: 0.0, y: -1.0 });
/// assert_eq!(both.extent.max(), Coord { x: 3.0, y: 1.0 });
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bound {
    /// Covered area.
    pub extent: Rect<f64>,
    /// Free-text description of where the data came from.
    #[cfg_attr(feature = "serde", serde(default))]
    pub origin: Option<String>,
}

impl Bound {
    /// Construct a bound without an origin.
    #[must_use]
    pub const fn new(extent: Rect<f64>) -> Self {
        Self {
            extent,
            origin: None,
        }
    }

    /// Attach an origin description.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Smallest bound covering both `self` and `other`.
    ///
    /// Differing origins are joined with `"; "` in lexicographic order, so
    /// the union does not depend on which bound comes first.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let (lhs, rhs) = (self.extent, other.extent);
        let min = Coord {
            x: lhs.min().x.min(rhs.min().x),
            y: lhs.min().y.min(rhs.min().y),
        };
        let max = Coord {
            x: lhs.max().x.max(rhs.max().x),
            y: lhs.max().y.max(rhs.max().y),
        };
        let origin = match (&self.origin, &other.origin) {
            (Some(left), Some(right)) if left != right => {
                let (first, second) = if left < right {
                    (left, right)
                } else {
                    (right, left)
                };
                Some(format!("{first}; {second}"))
            }
            (Some(origin), _) | (None, Some(origin)) => Some(origin.clone()),
            (None, None) => None,
        };
        Self {
            extent: Rect::new(min, max),
            origin,
        }
    }
}
