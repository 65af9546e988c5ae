//! Pixel grids with named mask planes.
//!
//! [`PixelGrid`] is the seam between defect finding and whatever produced the
//! calibrated exposure. [`MaskedImage`] is the in-memory implementation used by
//! the synthetic exposures, the demo binary and the tests.

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView2};
use num_traits::AsPrimitive;

use crate::error::DefectError;
use crate::image_size::PixelShape;

/// Planes registered on every new [`Mask`], in bit order.
pub const DEFAULT_MASK_PLANES: [&str; 9] = [
    "BAD",
    "SAT",
    "INTRP",
    "CR",
    "EDGE",
    "DETECTED",
    "DETECTED_NEGATIVE",
    "SUSPECT",
    "NO_DATA",
];

/// Read access to sample values plus read/write access to named mask bits.
pub trait PixelGrid {
    /// Grid dimensions
    fn shape(&self) -> PixelShape;

    /// Sample value at column `x`, row `y`
    fn value(&self, x: usize, y: usize) -> f64;

    /// Bit value assigned to the named plane
    fn plane_bit(&self, name: &str) -> Result<u32, DefectError>;

    /// All mask bits set on a pixel
    fn mask_at(&self, x: usize, y: usize) -> u32;

    /// OR `bits` into a pixel's mask
    fn set_mask_bits(&mut self, x: usize, y: usize, bits: u32);

    /// OR of the bits of several named planes
    fn plane_bits<S: AsRef<str>>(&self, names: &[S]) -> Result<u32, DefectError>
    where
        Self: Sized,
    {
        names
            .iter()
            .try_fold(0u32, |acc, name| Ok(acc | self.plane_bit(name.as_ref())?))
    }
}

/// Per-pixel bit mask with a name for each bit.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    bits: Array2<u32>,
    planes: BTreeMap<String, u32>,
}

impl Mask {
    /// Create an all-clear mask with the default planes registered.
    pub fn new(shape: PixelShape) -> Self {
        let planes = DEFAULT_MASK_PLANES
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), 1u32 << i))
            .collect();
        Self {
            bits: Array2::zeros(shape.to_array_dim()),
            planes,
        }
    }

    pub fn shape(&self) -> PixelShape {
        PixelShape::from_array_dim(self.bits.dim())
    }

    /// Register a plane, returning its bit. Existing planes keep their bit.
    pub fn add_plane(&mut self, name: &str) -> Result<u32, DefectError> {
        if let Some(&bit) = self.planes.get(name) {
            return Ok(bit);
        }
        if self.planes.len() >= u32::BITS as usize {
            return Err(DefectError::MaskPlanesExhausted(name.to_string()));
        }
        let bit = 1u32 << self.planes.len();
        self.planes.insert(name.to_string(), bit);
        Ok(bit)
    }

    pub fn plane_bit(&self, name: &str) -> Result<u32, DefectError> {
        self.planes
            .get(name)
            .copied()
            .ok_or_else(|| DefectError::UnknownMaskPlane(name.to_string()))
    }

    pub fn plane_names(&self) -> impl Iterator<Item = &str> {
        self.planes.keys().map(String::as_str)
    }

    pub fn get(&self, x: usize, y: usize) -> u32 {
        self.bits[[y, x]]
    }

    pub fn set(&mut self, x: usize, y: usize, bits: u32) {
        self.bits[[y, x]] |= bits;
    }

    /// Clear `bits` on a pixel, leaving other planes untouched
    pub fn clear(&mut self, x: usize, y: usize, bits: u32) {
        self.bits[[y, x]] &= !bits;
    }

    /// Number of pixels with any of `bits` set
    pub fn count(&self, bits: u32) -> usize {
        self.bits.iter().filter(|&&m| m & bits != 0).count()
    }

    pub fn view(&self) -> ArrayView2<u32> {
        self.bits.view()
    }
}

/// Sample image with a parallel [`Mask`].
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedImage {
    image: Array2<f64>,
    mask: Mask,
}

impl MaskedImage {
    /// Zero-valued image with an empty mask
    pub fn new(shape: PixelShape) -> Self {
        Self::from_image(Array2::zeros(shape.to_array_dim()))
    }

    /// Wrap an existing `(rows, cols)` image with an empty mask
    pub fn from_image(image: Array2<f64>) -> Self {
        let mask = Mask::new(PixelShape::from_array_dim(image.dim()));
        Self { image, mask }
    }

    /// Convert raw sensor samples (e.g. `u16` frames) into a masked image
    pub fn from_samples<T>(samples: &ArrayView2<T>) -> Self
    where
        T: AsPrimitive<f64>,
    {
        Self::from_image(samples.mapv(|v| v.as_()))
    }

    pub fn image(&self) -> ArrayView2<f64> {
        self.image.view()
    }

    pub fn image_mut(&mut self) -> &mut Array2<f64> {
        &mut self.image
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    pub fn mask_mut(&mut self) -> &mut Mask {
        &mut self.mask
    }
}

impl PixelGrid for MaskedImage {
    fn shape(&self) -> PixelShape {
        PixelShape::from_array_dim(self.image.dim())
    }

    fn value(&self, x: usize, y: usize) -> f64 {
        self.image[[y, x]]
    }

    fn plane_bit(&self, name: &str) -> Result<u32, DefectError> {
        self.mask.plane_bit(name)
    }

    fn mask_at(&self, x: usize, y: usize) -> u32 {
        self.mask.get(x, y)
    }

    fn set_mask_bits(&mut self, x: usize, y: usize, bits: u32) {
        self.mask.set(x, y, bits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_planes_are_distinct_bits() {
        let mask = Mask::new(PixelShape::new(4, 3));
        let bad = mask.plane_bit("BAD").unwrap();
        let no_data = mask.plane_bit("NO_DATA").unwrap();
        let edge = mask.plane_bit("EDGE").unwrap();
        assert_ne!(bad, no_data);
        assert_eq!(bad & no_data, 0);
        assert_eq!(edge.count_ones(), 1);
        assert_eq!(mask.plane_names().count(), DEFAULT_MASK_PLANES.len());
    }

    #[test]
    fn test_unknown_plane() {
        let mask = Mask::new(PixelShape::new(4, 3));
        assert_eq!(
            mask.plane_bit("VIGNETTED"),
            Err(DefectError::UnknownMaskPlane("VIGNETTED".to_string()))
        );
    }

    #[test]
    fn test_add_plane() {
        let mut mask = Mask::new(PixelShape::new(4, 3));
        let bit = mask.add_plane("VIGNETTED").unwrap();
        assert_eq!(mask.plane_bit("VIGNETTED").unwrap(), bit);
        assert_eq!(mask.add_plane("VIGNETTED").unwrap(), bit);
        assert_eq!(mask.add_plane("BAD").unwrap(), 1);
    }

    #[test]
    fn test_plane_exhaustion() {
        let mut mask = Mask::new(PixelShape::new(1, 1));
        for i in DEFAULT_MASK_PLANES.len()..32 {
            mask.add_plane(&format!("P{i}")).unwrap();
        }
        assert!(matches!(
            mask.add_plane("ONE_TOO_MANY"),
            Err(DefectError::MaskPlanesExhausted(_))
        ));
    }

    #[test]
    fn test_set_clear_and_count() {
        let mut mask = Mask::new(PixelShape::new(4, 3));
        let bad = mask.plane_bit("BAD").unwrap();
        let sat = mask.plane_bit("SAT").unwrap();
        mask.set(1, 2, bad);
        mask.set(1, 2, sat);
        mask.set(3, 0, bad);
        assert_eq!(mask.count(bad), 2);
        assert_eq!(mask.count(sat), 1);

        mask.clear(1, 2, bad);
        assert_eq!(mask.count(bad), 1);
        assert_eq!(mask.get(1, 2), sat);
    }

    #[test]
    fn test_masked_image_indexing() {
        let samples = Array2::from_shape_vec((2, 3), vec![1u16, 2, 3, 4, 5, 6]).unwrap();
        let image = MaskedImage::from_samples(&samples.view());
        assert_eq!(image.shape(), PixelShape::new(3, 2));
        // x is the column, y the row
        assert_eq!(image.value(2, 0), 3.0);
        assert_eq!(image.value(0, 1), 4.0);
    }

    #[test]
    fn test_plane_bits_union() {
        let image = MaskedImage::new(PixelShape::new(2, 2));
        let bits = image.plane_bits(&["BAD", "NO_DATA"]).unwrap();
        assert_eq!(
            bits,
            image.plane_bit("BAD").unwrap() | image.plane_bit("NO_DATA").unwrap()
        );
        assert!(image.plane_bits(&["BAD", "NOPE"]).is_err());
        assert_eq!(image.plane_bits::<&str>(&[]).unwrap(), 0);
    }
}
