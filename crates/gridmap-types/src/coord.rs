//! Coordinate algebra for fragments and pyramid tiles.
//!
//! A [`Coord`] addresses one cell of a map's coordinate space at a given
//! zoom level. The parent of a cell at level `z` is the cell at level `z + 1`
//! that covers it; parents are computed with floor division so that the
//! pyramid stays aligned across the origin.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Integer cell position inside one map.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

/// Error returned when a coordinate key cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid coordinate key: {0:?}")]
pub struct ParseCoordError(pub String);

impl Coord {
    pub const ORIGIN: Coord = Coord { x: 0, y: 0 };

    /// Largest accepted absolute value of either axis.
    ///
    /// [`Coord::children`] of an in-range cell and the shift between two
    /// in-range cells cannot overflow `i32`.
    pub const LIMIT: i32 = 1 << 28;

    /// Whether both axes lie in `-LIMIT..=LIMIT`.
    pub fn in_range(self) -> bool {
        let limit = Self::LIMIT.unsigned_abs();
        self.x.unsigned_abs() <= limit && self.y.unsigned_abs() <= limit
    }

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The cell one zoom level up that contains this one.
    ///
    /// Rounds toward negative infinity: `(-1, -1)` and `(-2, -2)` both map
    /// to `(-1, -1)`.
    pub fn parent(self) -> Coord {
        Coord {
            x: self.x.div_euclid(2),
            y: self.y.div_euclid(2),
        }
    }

    /// Apply [`Coord::parent`] `levels` times.
    pub fn ancestor(self, levels: u8) -> Coord {
        (0..levels).fold(self, |c, _| c.parent())
    }

    /// The four cells one zoom level down, in `(dx, dy)` order
    /// `(0,0), (1,0), (0,1), (1,1)`.
    pub fn children(self) -> [(u32, u32, Coord); 4] {
        let base = Coord::new(self.x * 2, self.y * 2);
        [
            (0, 0, base),
            (1, 0, base.offset(1, 0)),
            (0, 1, base.offset(0, 1)),
            (1, 1, base.offset(1, 1)),
        ]
    }

    /// Translate by `(dx, dy)`.
    pub fn offset(self, dx: i32, dy: i32) -> Coord {
        Coord::new(self.x + dx, self.y + dy)
    }

    /// Translate by another coordinate treated as a vector.
    pub fn shifted(self, by: Coord) -> Coord {
        self.offset(by.x, by.y)
    }

    /// Vector from `other` to `self`.
    pub fn minus(self, other: Coord) -> Coord {
        Coord::new(self.x - other.x, self.y - other.y)
    }

    /// Stable persistent key, `"{x}_{y}"`.
    pub fn name(self) -> String {
        format!("{}_{}", self.x, self.y)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.x, self.y)
    }
}

impl FromStr for Coord {
    type Err = ParseCoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ParseCoordError(s.to_string());
        let (x, y) = s.split_once('_').ok_or_else(bad)?;
        Ok(Coord {
            x: x.parse().map_err(|_| bad())?,
            y: y.parse().map_err(|_| bad())?,
        })
    }
}
