//! Non-science border marking

use tracing::debug;

use super::DefectBox;
use crate::error::DefectError;
use crate::image_size::PixelShape;
use crate::masked_image::PixelGrid;

/// Name of the plane set on border pixels
pub const EDGE_PLANE: &str = "EDGE";

/// Marks the pixels within fixed margins of the grid edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeMasker {
    /// Columns at each of the left and right edges
    pub left_right: usize,
    /// Rows at each of the top and bottom edges
    pub up_down: usize,
}

impl EdgeMasker {
    pub fn new(left_right: usize, up_down: usize) -> Self {
        Self {
            left_right,
            up_down,
        }
    }

    /// Set the EDGE bit on every border pixel of `grid`.
    ///
    /// The bit is OR-ed in, so applying the masker again changes nothing.
    /// Returns the number of border pixels.
    pub fn apply<G: PixelGrid>(&self, grid: &mut G) -> Result<usize, DefectError> {
        let bit = grid.plane_bit(EDGE_PLANE)?;
        let shape = grid.shape();
        let mut count = 0;
        for y in 0..shape.height {
            for x in 0..shape.width {
                if self.is_edge(shape, x, y) {
                    grid.set_mask_bits(x, y, bit);
                    count += 1;
                }
            }
        }
        debug!("Marked {} edge pixels on {} grid", count, shape);
        Ok(count)
    }

    pub fn is_edge(&self, shape: PixelShape, x: usize, y: usize) -> bool {
        x < self.left_right
            || x + self.left_right >= shape.width
            || y < self.up_down
            || y + self.up_down >= shape.height
    }

    /// Border strips as non-overlapping boxes: full-width top and bottom
    /// bands, then left and right bands between them.
    pub fn edge_boxes(&self, shape: PixelShape) -> Vec<DefectBox> {
        let PixelShape { width, height } = shape;
        if width == 0 || height == 0 {
            return Vec::new();
        }
        let band_h = self.up_down.min(height);
        let band_w = self.left_right.min(width);

        if 2 * band_h >= height || 2 * band_w >= width {
            return vec![DefectBox::new(0, 0, width, height)];
        }

        let mut boxes = Vec::with_capacity(4);
        if band_h > 0 {
            boxes.push(DefectBox::new(0, 0, width, band_h));
            boxes.push(DefectBox::new(0, height - band_h, width, band_h));
        }
        if band_w > 0 {
            let inner_h = height - 2 * band_h;
            boxes.push(DefectBox::new(0, band_h, band_w, inner_h));
            boxes.push(DefectBox::new(width - band_w, band_h, band_w, inner_h));
        }
        boxes
    }
}
