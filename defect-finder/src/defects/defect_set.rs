//! Collections of defect boxes attached to a grid shape

use ndarray::{s, Array2, ArrayView2};

use super::DefectBox;
use crate::algo::mask_to_boxes;
use crate::error::DefectError;
use crate::image_size::PixelShape;
use crate::masked_image::PixelGrid;

/// Defective-pixel catalog for one grid.
///
/// Boxes are kept sorted with exact duplicates removed, so two sets built from
/// the same boxes in any order are identical. Equality is pixel coverage: two
/// different box decompositions of the same pixels compare equal.
///
/// Sets are never modified in place once built; the operations that change
/// contents ([`without`](Self::without), [`extended`](Self::extended)) return
/// new sets.
#[derive(Debug, Clone)]
pub struct DefectSet {
    shape: PixelShape,
    boxes: Vec<DefectBox>,
}

impl DefectSet {
    /// Set with no defects
    pub fn empty(shape: PixelShape) -> Self {
        Self {
            shape,
            boxes: Vec::new(),
        }
    }

    /// Build a set, checking every box is non-empty and lies inside `shape`.
    pub fn from_boxes<I>(shape: PixelShape, boxes: I) -> Result<Self, DefectError>
    where
        I: IntoIterator<Item = DefectBox>,
    {
        let boxes: Vec<DefectBox> = boxes.into_iter().collect();
        if let Some(bbox) = boxes
            .iter()
            .find(|b| b.width == 0 || b.height == 0 || !shape.contains(b.max_x(), b.max_y()))
        {
            return Err(DefectError::BoxOutOfBounds { bbox: *bbox, shape });
        }
        Ok(Self::from_in_bounds(shape, boxes))
    }

    /// Extract the covering boxes of a `(rows, cols)` boolean mask.
    ///
    /// Connected regions (4-connectivity) that are rectangular become one box
    /// each; irregular regions are split so coverage is exact.
    pub fn from_mask(mask: &ArrayView2<bool>) -> Self {
        let (boxes, _) = mask_to_boxes(mask);
        Self::from_in_bounds(PixelShape::from_array_dim(mask.dim()), boxes)
    }

    pub(crate) fn from_in_bounds(shape: PixelShape, mut boxes: Vec<DefectBox>) -> Self {
        boxes.sort_unstable();
        boxes.dedup();
        Self { shape, boxes }
    }

    pub fn shape(&self) -> PixelShape {
        self.shape
    }

    pub fn boxes(&self) -> &[DefectBox] {
        &self.boxes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DefectBox> {
        self.boxes.iter()
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Rasterize into a `(rows, cols)` mask, `true` for defective pixels
    pub fn to_mask(&self) -> Array2<bool> {
        let mut mask = Array2::from_elem(self.shape.to_array_dim(), false);
        for b in &self.boxes {
            mask.slice_mut(s![b.y..b.y + b.height, b.x..b.x + b.width])
                .fill(true);
        }
        mask
    }

    /// Number of distinct pixels covered; overlapping boxes count once
    pub fn covered_pixels(&self) -> usize {
        self.to_mask().iter().filter(|&&m| m).count()
    }

    pub fn covers(&self, x: usize, y: usize) -> bool {
        self.shape.contains(x, y) && self.boxes.iter().any(|b| b.contains(x, y))
    }

    /// Copy of this set with one box removed (no-op if absent)
    pub fn without(&self, bbox: &DefectBox) -> Self {
        Self {
            shape: self.shape,
            boxes: self.boxes.iter().filter(|b| *b != bbox).copied().collect(),
        }
    }

    /// Copy of this set with extra boxes added
    pub fn extended<I>(&self, boxes: I) -> Result<Self, DefectError>
    where
        I: IntoIterator<Item = DefectBox>,
    {
        Self::from_boxes(self.shape, self.boxes.iter().copied().chain(boxes))
    }

    /// Set `plane` on every covered pixel of `grid`.
    pub fn mask_pixels<G: PixelGrid>(&self, grid: &mut G, plane: &str) -> Result<(), DefectError> {
        if grid.shape() != self.shape {
            return Err(DefectError::DimensionMismatch {
                expected: self.shape,
                found: grid.shape(),
            });
        }
        let bit = grid.plane_bit(plane)?;
        for b in &self.boxes {
            for y in b.y..b.y + b.height {
                for x in b.x..b.x + b.width {
                    grid.set_mask_bits(x, y, bit);
                }
            }
        }
        Ok(())
    }

    /// Boxes as `(x, y, width, height)` for catalog sinks
    pub fn to_tuples(&self) -> Vec<(usize, usize, usize, usize)> {
        self.boxes.iter().map(DefectBox::to_tuple).collect()
    }
}

impl PartialEq for DefectSet {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && (self.boxes == other.boxes || self.to_mask() == other.to_mask())
    }
}

impl<'a> IntoIterator for &'a DefectSet {
    type Item = &'a DefectBox;
    type IntoIter = std::slice::Iter<'a, DefectBox>;

    fn into_iter(self) -> Self::IntoIter {
        self.boxes.iter()
    }
}
