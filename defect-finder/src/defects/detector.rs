//! Hot and cold pixel detection on a single exposure

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{DefectSet, FindDefectsConfig};
use crate::algo::{sigma_clipped_stats, ClippedStats, SigmaClip};
use crate::error::DefectError;
use crate::image_size::PixelShape;
use crate::masked_image::PixelGrid;

/// Kind of calibration exposure being searched.
///
/// Dark exposures only show bright defects (hot pixels); flats can show
/// defects of either polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExposureKind {
    Flat,
    Dark,
}

impl ExposureKind {
    /// Whether pixels below the population are searched for
    pub fn searches_dark(&self) -> bool {
        matches!(self, ExposureKind::Flat)
    }
}

/// Flags pixels that deviate from the clipped population by more than a
/// configured number of sigma.
#[derive(Debug, Clone)]
pub struct HotColdPixelDetector {
    pub n_sigma_bright: f64,
    pub n_sigma_dark: f64,
    pub border_left_right: usize,
    pub border_up_down: usize,
    pub excluded_planes: Vec<String>,
    pub clip: SigmaClip,
}

impl HotColdPixelDetector {
    pub fn from_config(config: &FindDefectsConfig) -> Self {
        Self {
            n_sigma_bright: config.n_sigma_bright,
            n_sigma_dark: config.n_sigma_dark,
            border_left_right: config.n_pix_border_left_right,
            border_up_down: config.n_pix_border_up_down,
            excluded_planes: config.excluded_mask_planes.clone(),
            clip: config.sigma_clip(),
        }
    }

    /// Half-open column and row ranges left after removing the border margins.
    fn interior(&self, shape: PixelShape) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
        let x0 = self.border_left_right.min(shape.width);
        let x1 = shape.width.saturating_sub(self.border_left_right).max(x0);
        let y0 = self.border_up_down.min(shape.height);
        let y1 = shape.height.saturating_sub(self.border_up_down).max(y0);
        (x0..x1, y0..y1)
    }

    /// Clipped mean and corrected sigma of the interior, unmasked, finite pixels.
    pub fn statistics<G: PixelGrid>(&self, grid: &G) -> Result<ClippedStats, DefectError> {
        let shape = grid.shape();
        let excluded_bits = grid.plane_bits(self.excluded_planes.as_slice())?;
        let (xs, ys) = self.interior(shape);

        let mut population = Vec::with_capacity(xs.len() * ys.len());
        let mut excluded = 0;
        for y in ys {
            for x in xs.clone() {
                if grid.mask_at(x, y) & excluded_bits != 0 {
                    excluded += 1;
                    continue;
                }
                population.push(grid.value(x, y));
            }
        }

        sigma_clipped_stats(&population, &self.clip)
            .ok_or(DefectError::EmptyPopulation { shape, excluded })
    }

    /// Find the defective regions of one exposure.
    ///
    /// Border pixels are never flagged. Pixels carrying an excluded plane are
    /// left out of the statistics but are still tested against the thresholds.
    pub fn detect<G: PixelGrid>(&self, grid: &G, kind: ExposureKind) -> Result<DefectSet, DefectError> {
        let shape = grid.shape();
        let stats = self.statistics(grid)?;
        let upper = stats.mean + self.n_sigma_bright * stats.std_dev;
        let lower = if kind.searches_dark() {
            stats.mean - self.n_sigma_dark * stats.std_dev
        } else {
            f64::NEG_INFINITY
        };
        debug!(
            "Population mean {:.3}, sigma {:.3} from {} pixels; thresholds [{:.3}, {:.3}]",
            stats.mean, stats.std_dev, stats.count, lower, upper
        );

        let (xs, ys) = self.interior(shape);
        let mut flagged = Array2::from_elem(shape.to_array_dim(), false);
        let mut n_flagged = 0usize;
        for y in ys {
            for x in xs.clone() {
                let v = grid.value(x, y);
                if v > upper || v < lower {
                    flagged[[y, x]] = true;
                    n_flagged += 1;
                }
            }
        }

        let defects = DefectSet::from_mask(&flagged.view());
        info!(
            "{:?} exposure {}: {} defective pixels in {} regions",
            kind,
            shape,
            n_flagged,
            defects.len()
        );
        Ok(defects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::sigma_clip_correction;
    use crate::defects::DefectBox;
    use crate::masked_image::MaskedImage;
    use crate::synthetic::{inject_offset, normal_image};
    use approx::assert_relative_eq;

    const MEAN: f64 = 2000.0;
    const SIGMA: f64 = 20.0;

    fn detector(border: usize) -> HotColdPixelDetector {
        HotColdPixelDetector::from_config(&FindDefectsConfig {
            n_sigma_bright: 8.0,
            n_sigma_dark: 8.0,
            n_pix_border_left_right: border,
            n_pix_border_up_down: border,
            ..Default::default()
        })
    }

    fn flat() -> MaskedImage {
        MaskedImage::from_image(normal_image(PixelShape::new(64, 48), MEAN, SIGMA, 7))
    }

    #[test]
    fn test_statistics_recover_population() {
        let mut image = flat();
        inject_offset(&mut image, &DefectBox::new(20, 20, 4, 4), 50.0 * SIGMA);
        let stats = detector(0).statistics(&image).unwrap();
        assert_relative_eq!(stats.mean, MEAN, epsilon = 2.0);
        assert_relative_eq!(stats.std_dev, SIGMA, max_relative = 0.1);
    }

    #[test]
    fn test_statistics_carry_clip_correction() {
        // Balanced 990/1000/1010 pattern plus one hot pixel outside every window
        let mut image = MaskedImage::from_image(Array2::from_shape_fn((12, 12), |(r, c)| {
            1000.0 + 10.0 * (((r + c) % 3) as f64 - 1.0)
        }));
        image.image_mut()[[5, 5]] = 1500.0;

        let inliers: Vec<f64> = image.image().iter().copied().filter(|&v| v < 1100.0).collect();
        let n = inliers.len() as f64;
        let mean = inliers.iter().sum::<f64>() / n;
        let raw_std = (inliers.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();

        let det = HotColdPixelDetector::from_config(&FindDefectsConfig {
            clip_sigma: 2.0,
            n_pix_border_left_right: 0,
            n_pix_border_up_down: 0,
            ..Default::default()
        });
        let stats = det.statistics(&image).unwrap();
        assert_eq!(stats.count, 143);
        assert_relative_eq!(stats.mean, mean, epsilon = 1e-9);
        assert_relative_eq!(
            stats.std_dev,
            raw_std * sigma_clip_correction(2.0),
            max_relative = 1e-9
        );
        assert!(stats.std_dev / raw_std > 1.1);
    }

    #[test]
    fn test_quantized_dark_has_no_defects() {
        let raw = Array2::from_shape_fn((64, 64), |(r, c)| match (r * 64 + c) % 14 {
            0 => 99u16,
            7 => 101,
            _ => 100,
        });
        let image = MaskedImage::from_samples(&raw.view());
        let det = detector(0);
        assert!(det.statistics(&image).unwrap().std_dev > 0.0);

        let found = HotColdPixelDetector::from_config(&FindDefectsConfig {
            n_pix_border_left_right: 0,
            n_pix_border_up_down: 0,
            ..Default::default()
        })
        .detect(&image, ExposureKind::Dark)
        .unwrap();
        assert!(found.is_empty());
        assert!(det.detect(&image, ExposureKind::Flat).unwrap().is_empty());
    }

    #[test]
    fn test_detects_both_polarities_on_flat() {
        let mut image = flat();
        let bright = DefectBox::new(10, 10, 2, 3);
        let dark = DefectBox::new(40, 30, 3, 1);
        inject_offset(&mut image, &bright, 20.0 * SIGMA);
        inject_offset(&mut image, &dark, -20.0 * SIGMA);

        let found = detector(2).detect(&image, ExposureKind::Flat).unwrap();
        let expected = DefectSet::from_boxes(image.shape(), [bright, dark]).unwrap();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_dark_exposure_ignores_cold_pixels() {
        let mut image = flat();
        let bright = DefectBox::new(10, 10, 2, 3);
        inject_offset(&mut image, &bright, 20.0 * SIGMA);
        inject_offset(&mut image, &DefectBox::new(40, 30, 3, 1), -20.0 * SIGMA);

        let found = detector(2).detect(&image, ExposureKind::Dark).unwrap();
        assert_eq!(found.boxes(), &[bright]);
    }

    #[test]
    fn test_border_never_flagged() {
        let mut image = flat();
        let corner = DefectBox::new(0, 0, 2, 2);
        inject_offset(&mut image, &corner, 20.0 * SIGMA);

        assert!(detector(3).detect(&image, ExposureKind::Flat).unwrap().is_empty());
        let full = detector(0).detect(&image, ExposureKind::Flat).unwrap();
        assert_eq!(full.boxes(), &[corner]);
    }

    #[test]
    fn test_excluded_pixels_still_flagged() {
        let mut image = flat();
        let bbox = DefectBox::new(30, 20, 2, 2);
        inject_offset(&mut image, &bbox, 20.0 * SIGMA);
        let set = DefectSet::from_boxes(image.shape(), [bbox]).unwrap();
        set.mask_pixels(&mut image, "BAD").unwrap();

        let found = detector(0).detect(&image, ExposureKind::Flat).unwrap();
        assert_eq!(found, set);
    }

    #[test]
    fn test_empty_population_is_error() {
        let image = flat();
        let err = detector(40).detect(&image, ExposureKind::Flat).unwrap_err();
        assert!(matches!(err, DefectError::EmptyPopulation { excluded: 0, .. }));
    }

    #[test]
    fn test_fully_masked_population_is_error() {
        let mut image = flat();
        let shape = image.shape();
        DefectSet::from_boxes(shape, [DefectBox::new(0, 0, shape.width, shape.height)])
            .unwrap()
            .mask_pixels(&mut image, "NO_DATA")
            .unwrap();
        let err = detector(0).statistics(&image).unwrap_err();
        assert_eq!(
            err,
            DefectError::EmptyPopulation {
                shape,
                excluded: shape.pixel_count()
            }
        );
    }

    #[test]
    fn test_unknown_excluded_plane() {
        let mut det = detector(0);
        det.excluded_planes = vec!["NOT_A_PLANE".to_string()];
        assert_eq!(
            det.statistics(&flat()).unwrap_err(),
            DefectError::UnknownMaskPlane("NOT_A_PLANE".to_string())
        );
    }
}
