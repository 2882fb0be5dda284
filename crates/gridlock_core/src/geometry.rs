//! Integer tile geometry.
//!
//! Positions are signed so that neighbour candidates one step off the board
//! can be represented and rejected instead of wrapping. Areas are half-open:
//! `min` is inclusive, `max` is exclusive.

use serde::{Deserialize, Serialize};

/// A tile position. `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Point {
    /// The zero point, also used as the "no step" offset.
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Create a point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Create a point from stored u16 coordinates.
    #[must_use]
    pub const fn from_u16(x: u16, y: u16) -> Self {
        Self {
            x: x as i32,
            y: y as i32,
        }
    }

    /// Component-wise sum.
    #[must_use]
    pub const fn offset(self, step: Self) -> Self {
        Self {
            x: self.x + step.x,
            y: self.y + step.y,
        }
    }

    /// Chebyshev distance between two points.
    #[must_use]
    pub const fn chebyshev(self, other: Self) -> i32 {
        let dx = (self.x - other.x).abs();
        let dy = (self.y - other.y).abs();
        if dx > dy {
            dx
        } else {
            dy
        }
    }

    /// Signed deltas from this point to the nearest tile of `area`.
    #[must_use]
    pub const fn deltas_to(self, area: Area) -> (i32, i32) {
        if area.contains(self) {
            return (0, 0);
        }
        let dx = if self.x < area.min.x {
            area.min.x - self.x
        } else if self.x >= area.max.x {
            area.max.x - self.x - 1
        } else {
            0
        };
        let dy = if self.y < area.min.y {
            area.min.y - self.y
        } else if self.y >= area.max.y {
            area.max.y - self.y - 1
        } else {
            0
        };
        (dx, dy)
    }

    /// Chebyshev distance to the nearest tile of `area` (0 when inside).
    #[must_use]
    pub const fn distance_to_area(self, area: Area) -> i32 {
        let (dx, dy) = self.deltas_to(area);
        let (dx, dy) = (dx.abs(), dy.abs());
        if dx > dy {
            dx
        } else {
            dy
        }
    }

    /// Manhattan distance to the nearest tile of `area` (0 when inside).
    #[must_use]
    pub const fn manhattan_to_area(self, area: Area) -> i32 {
        let (dx, dy) = self.deltas_to(area);
        dx.abs() + dy.abs()
    }
}

/// A half-open rectangle of tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Area {
    /// Inclusive top-left corner.
    pub min: Point,
    /// Exclusive bottom-right corner.
    pub max: Point,
}

impl Area {
    /// Area with origin `origin` and the given size.
    #[must_use]
    pub const fn new(origin: Point, width: i32, height: i32) -> Self {
        Self {
            min: origin,
            max: Point::new(origin.x + width, origin.y + height),
        }
    }

    /// The single tile at `p`.
    #[must_use]
    pub const fn tile(p: Point) -> Self {
        Self::new(p, 1, 1)
    }

    /// The square of tiles within Chebyshev radius `r` of `center`.
    #[must_use]
    pub const fn around(center: Point, r: i32) -> Self {
        Self {
            min: Point::new(center.x - r, center.y - r),
            max: Point::new(center.x + r + 1, center.y + r + 1),
        }
    }

    /// Width in tiles.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.max.x - self.min.x
    }

    /// Height in tiles.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.max.y - self.min.y
    }

    /// True if the area covers no tile.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y
    }

    /// True if `p` lies inside.
    #[must_use]
    pub const fn contains(&self, p: Point) -> bool {
        self.min.x <= p.x && p.x < self.max.x && self.min.y <= p.y && p.y < self.max.y
    }

    /// True if both areas are non-empty and share at least one tile.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    /// True if every tile of `self` is inside `outer`. An empty area is
    /// inside anything.
    #[must_use]
    pub const fn within(&self, outer: &Self) -> bool {
        if self.is_empty() {
            return true;
        }
        outer.min.x <= self.min.x
            && self.max.x <= outer.max.x
            && outer.min.y <= self.min.y
            && self.max.y <= outer.max.y
    }

    /// Iterate the tiles column-major: x outer, y inner.
    pub fn tiles(&self) -> impl Iterator<Item = Point> {
        let Self { min, max } = *self;
        (min.x..max.x).flat_map(move |x| (min.y..max.y).map(move |y| Point::new(x, y)))
    }
}
