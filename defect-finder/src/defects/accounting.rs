//! Pixel counts for QA and for interpreting defect results

use super::DefectSet;
use crate::error::DefectError;
use crate::masked_image::PixelGrid;

/// Plane marking pixels without usable data
pub const NO_DATA_PLANE: &str = "NO_DATA";

/// Sum of box areas. Overlapping boxes are counted once per box; see
/// [`DefectSet::covered_pixels`] for the distinct pixel count.
pub fn area_of(defects: &DefectSet) -> usize {
    defects.iter().map(|b| b.area()).sum()
}

/// Number of pixels carrying the named plane.
pub fn count_masked_pixels<G: PixelGrid>(grid: &G, plane: &str) -> Result<usize, DefectError> {
    let bit = grid.plane_bit(plane)?;
    let shape = grid.shape();
    let mut count = 0;
    for y in 0..shape.height {
        for x in 0..shape.width {
            if grid.mask_at(x, y) & bit != 0 {
                count += 1;
            }
        }
    }
    Ok(count)
}

/// Pixels not carrying `plane` (NO_DATA when `None`).
///
/// Only the queried plane matters: pixels flagged under other planes are
/// still counted as good.
pub fn good_pixel_count<G: PixelGrid>(grid: &G, plane: Option<&str>) -> Result<usize, DefectError> {
    let masked = count_masked_pixels(grid, plane.unwrap_or(NO_DATA_PLANE))?;
    Ok(grid.shape().pixel_count() - masked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defects::DefectBox;
    use crate::image_size::PixelShape;
    use crate::masked_image::MaskedImage;

    fn flag(image: &mut MaskedImage, bbox: DefectBox, plane: &str) {
        DefectSet::from_boxes(image.shape(), [bbox])
            .unwrap()
            .mask_pixels(image, plane)
            .unwrap();
    }

    #[test]
    fn test_area_sums_boxes() {
        let set = DefectSet::from_boxes(
            PixelShape::new(10, 10),
            [DefectBox::new(0, 0, 2, 3), DefectBox::new(1, 1, 4, 1)],
        )
        .unwrap();
        assert_eq!(area_of(&set), 10);
        assert_eq!(set.covered_pixels(), 9);
        assert_eq!(area_of(&DefectSet::empty(PixelShape::new(3, 3))), 0);
    }

    #[test]
    fn test_good_pixels_default_plane() {
        let mut image = MaskedImage::new(PixelShape::new(12, 10));
        assert_eq!(good_pixel_count(&image, None).unwrap(), 120);
        flag(&mut image, DefectBox::new(2, 2, 3, 4), "NO_DATA");
        assert_eq!(good_pixel_count(&image, None).unwrap(), 108);
        assert_eq!(good_pixel_count(&image, Some("BAD")).unwrap(), 120);
    }

    #[test]
    fn test_planes_are_not_conflated() {
        let mut image = MaskedImage::new(PixelShape::new(12, 10));
        flag(&mut image, DefectBox::new(0, 0, 2, 2), "BAD");
        flag(&mut image, DefectBox::new(1, 1, 2, 2), "SAT");
        assert_eq!(count_masked_pixels(&image, "BAD").unwrap(), 4);
        assert_eq!(count_masked_pixels(&image, "SAT").unwrap(), 4);
        assert_eq!(good_pixel_count(&image, Some("BAD")).unwrap(), 116);
        assert_eq!(good_pixel_count(&image, None).unwrap(), 120);
    }

    #[test]
    fn test_unknown_plane() {
        let image = MaskedImage::new(PixelShape::new(2, 2));
        assert_eq!(
            count_masked_pixels(&image, "HOT"),
            Err(DefectError::UnknownMaskPlane("HOT".to_string()))
        );
    }
}
