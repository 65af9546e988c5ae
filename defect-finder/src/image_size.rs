//! Grid dimensions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width and height of a pixel grid.
///
/// Uses usize for direct compatibility with ndarray indexing; note that
/// ndarray shapes are `(height, width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelShape {
    /// Grid width in pixels (number of columns)
    pub width: usize,
    /// Grid height in pixels (number of rows)
    pub height: usize,
}

impl PixelShape {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Total number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Shape in ndarray `(rows, cols)` order
    pub fn to_array_dim(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Build from an ndarray `(rows, cols)` dimension
    pub fn from_array_dim(dim: (usize, usize)) -> Self {
        Self::new(dim.1, dim.0)
    }

    /// Check if a point is within bounds
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }
}

impl From<(usize, usize)> for PixelShape {
    fn from(dimensions: (usize, usize)) -> Self {
        Self::new(dimensions.0, dimensions.1)
    }
}

impl fmt::Display for PixelShape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
