//! Grid geometry for the city map.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer cell coordinate on the city grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: i64,
    pub y: i64,
}

impl Coord {
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another cell.
    #[must_use]
    pub const fn manhattan(self, other: Self) -> i64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Whether `other` is within `reach` cells under Manhattan distance.
    ///
    /// Pickups and dropoffs accept the exact cell or any orthogonal
    /// neighbor, so reach is normally 1.
    #[must_use]
    pub const fn within_reach(self, other: Self, reach: i64) -> bool {
        self.manhattan(other) <= reach
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i64, i64)> for Coord {
    fn from(value: (i64, i64)) -> Self {
        Self::new(value.0, value.1)
    }
}
