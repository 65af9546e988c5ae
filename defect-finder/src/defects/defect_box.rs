//! Axis-aligned defect regions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rectangular block of defective pixels.
///
/// Stored as minimum corner plus extent, both in pixels. Ordering is
/// lexicographic on `(x, y, width, height)` and is only used to keep
/// [`DefectSet`](super::DefectSet) contents canonical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DefectBox {
    /// Minimum column
    pub x: usize,
    /// Minimum row
    pub y: usize,
    /// Extent in columns, at least 1
    pub width: usize,
    /// Extent in rows, at least 1
    pub height: usize,
}

impl DefectBox {
    /// Create a box from its minimum corner and extent.
    ///
    /// # Panics
    /// If `width` or `height` is zero.
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        assert!(
            width > 0 && height > 0,
            "Defect box extent must be at least 1x1, got {width}x{height}"
        );
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a box from inclusive minimum and maximum corners.
    pub fn from_corners(min_x: usize, min_y: usize, max_x: usize, max_y: usize) -> Self {
        assert!(
            min_x <= max_x && min_y <= max_y,
            "Inverted defect box corners ({min_x}, {min_y})..({max_x}, {max_y})"
        );
        Self::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
    }

    /// Inclusive maximum column
    pub fn max_x(&self) -> usize {
        self.x + self.width - 1
    }

    /// Inclusive maximum row
    pub fn max_y(&self) -> usize {
        self.y + self.height - 1
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x && x <= self.max_x() && y >= self.y && y <= self.max_y()
    }

    /// Columns `[x0, x1]` of this box, keeping its rows
    pub(crate) fn column_slice(&self, x0: usize, x1: usize) -> Self {
        debug_assert!(x0 >= self.x && x1 <= self.max_x());
        Self::from_corners(x0, self.y, x1, self.max_y())
    }

    /// `(x, y, width, height)`
    pub fn to_tuple(&self) -> (usize, usize, usize, usize) {
        (self.x, self.y, self.width, self.height)
    }
}

impl From<(usize, usize, usize, usize)> for DefectBox {
    fn from((x, y, width, height): (usize, usize, usize, usize)) -> Self {
        Self::new(x, y, width, height)
    }
}

impl fmt::Display for DefectBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}x{} at ({}, {})",
            self.width, self.height, self.x, self.y
        )
    }
}
