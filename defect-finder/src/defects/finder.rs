//! End-to-end defect finding over a list of calibration exposures

use rayon::prelude::*;
use tracing::info;

use super::{
    DefectSet, DefectSetConsolidator, EdgeMasker, ExposureKind, FindDefectsConfig,
    HotColdPixelDetector, IntermittentColumnMerger, ValidationReporter,
};
use crate::error::DefectError;
use crate::masked_image::PixelGrid;

/// Runs detection and column merging per exposure, then consolidates.
///
/// Construction validates the configuration, so a `DefectFinder` never runs
/// with a setting that would have been rejected.
#[derive(Debug, Clone)]
pub struct DefectFinder {
    config: FindDefectsConfig,
    detector: HotColdPixelDetector,
    merger: IntermittentColumnMerger,
}

impl DefectFinder {
    pub fn new(
        config: FindDefectsConfig,
        reporter: &mut dyn ValidationReporter,
    ) -> Result<Self, DefectError> {
        config.validate(reporter)?;
        Ok(Self {
            detector: HotColdPixelDetector::from_config(&config),
            merger: IntermittentColumnMerger::from_config(&config),
            config,
        })
    }

    pub fn config(&self) -> &FindDefectsConfig {
        &self.config
    }

    pub fn edge_masker(&self) -> EdgeMasker {
        EdgeMasker::new(
            self.config.n_pix_border_left_right,
            self.config.n_pix_border_up_down,
        )
    }

    /// Detect and merge intermittent columns on one exposure.
    pub fn find_in_exposure<G: PixelGrid>(
        &self,
        grid: &G,
        kind: ExposureKind,
    ) -> Result<DefectSet, DefectError> {
        let raw = self.detector.detect(grid, kind)?;
        Ok(self.merger.merge(&raw))
    }

    /// Defects of every exposure, consolidated into one set.
    ///
    /// Exposures are processed in parallel; the first error aborts the run.
    /// When `edges_as_defects` is set the border strips are added to the
    /// consolidated result.
    pub fn find_in_exposures<G>(
        &self,
        exposures: &[(&G, ExposureKind)],
    ) -> Result<DefectSet, DefectError>
    where
        G: PixelGrid + Sync,
    {
        let first = exposures.first().ok_or(DefectError::NoDefectSets)?;
        let shape = first.0.shape();

        let per_exposure = exposures
            .par_iter()
            .map(|(grid, kind)| self.find_in_exposure(*grid, *kind))
            .collect::<Result<Vec<_>, _>>()?;

        let mode = self.config.combination_mode()?;
        let mut result = DefectSetConsolidator::new(shape, mode).consolidate(&per_exposure)?;

        if self.config.edges_as_defects {
            result = result.extended(self.edge_masker().edge_boxes(shape))?;
        }

        info!(
            "Found {} defect boxes covering {} pixels from {} exposures",
            result.len(),
            result.covered_pixels(),
            exposures.len()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defects::{CollectingReporter, CombinationModeName, DefectBox};
    use crate::image_size::PixelShape;
    use crate::masked_image::MaskedImage;
    use crate::synthetic::{inject_offset, normal_image};

    const SIGMA: f64 = 10.0;

    fn config() -> FindDefectsConfig {
        FindDefectsConfig {
            n_sigma_bright: 8.0,
            n_sigma_dark: 8.0,
            n_pix_border_left_right: 2,
            n_pix_border_up_down: 2,
            bad_on_and_off_pixel_column_threshold: 3,
            good_pixel_column_gap_threshold: 4,
            combination_mode: CombinationModeName::Fraction,
            combination_fraction: 0.6,
            ..Default::default()
        }
    }

    fn exposure(seed: u64, defects: &[DefectBox]) -> MaskedImage {
        let mut image =
            MaskedImage::from_image(normal_image(PixelShape::new(40, 32), 500.0, SIGMA, seed));
        for bbox in defects {
            inject_offset(&mut image, bbox, 30.0 * SIGMA);
        }
        image
    }

    #[test]
    fn test_rejects_invalid_config() {
        let bad = FindDefectsConfig {
            combination_fraction: 2.0,
            ..config()
        };
        let err = DefectFinder::new(bad, &mut CollectingReporter::default()).unwrap_err();
        assert_eq!(err, DefectError::InvalidFraction(2.0));
    }

    #[test]
    fn test_single_exposure_merges_columns() {
        let finder = DefectFinder::new(config(), &mut CollectingReporter::default()).unwrap();
        let image = exposure(
            3,
            &[
                DefectBox::new(10, 5, 1, 1),
                DefectBox::new(10, 8, 1, 2),
                DefectBox::new(10, 13, 1, 1),
            ],
        );
        let found = finder.find_in_exposure(&image, ExposureKind::Dark).unwrap();
        assert_eq!(found.boxes(), &[DefectBox::new(10, 5, 1, 9)]);
    }

    #[test]
    fn test_consolidates_by_fraction() {
        let finder = DefectFinder::new(config(), &mut CollectingReporter::default()).unwrap();
        let common = DefectBox::new(20, 20, 2, 2);
        let rare = DefectBox::new(5, 25, 1, 1);
        let images = [
            exposure(1, &[common, rare]),
            exposure(2, &[common]),
            exposure(3, &[common]),
        ];
        let exposures: Vec<_> = images.iter().map(|i| (i, ExposureKind::Flat)).collect();

        let result = finder.find_in_exposures(&exposures).unwrap();
        assert_eq!(result.boxes(), &[common]);
    }

    #[test]
    fn test_edges_as_defects() {
        let finder = DefectFinder::new(
            FindDefectsConfig {
                edges_as_defects: true,
                ..config()
            },
            &mut CollectingReporter::default(),
        )
        .unwrap();
        let image = exposure(9, &[]);
        let result = finder
            .find_in_exposures(&[(&image, ExposureKind::Flat)])
            .unwrap();
        let shape = image.shape();
        let masker = finder.edge_masker();
        assert_eq!(
            result.covered_pixels(),
            masker.edge_boxes(shape).iter().map(DefectBox::area).sum::<usize>()
        );
        assert!(result.covers(0, 0));
        assert!(!result.covers(2, 2));
    }

    #[test]
    fn test_no_exposures() {
        let finder = DefectFinder::new(config(), &mut CollectingReporter::default()).unwrap();
        let none: [(&MaskedImage, ExposureKind); 0] = [];
        assert_eq!(finder.find_in_exposures(&none), Err(DefectError::NoDefectSets));
    }

    #[test]
    fn test_exposures_must_share_shape() {
        let finder = DefectFinder::new(config(), &mut CollectingReporter::default()).unwrap();
        let small = exposure(4, &[]);
        let large = MaskedImage::from_image(normal_image(PixelShape::new(48, 32), 500.0, SIGMA, 5));
        let result = finder.find_in_exposures(&[
            (&small, ExposureKind::Flat),
            (&large, ExposureKind::Flat),
        ]);
        assert_eq!(
            result,
            Err(DefectError::DimensionMismatch {
                expected: PixelShape::new(40, 32),
                found: PixelShape::new(48, 32),
            })
        );
    }
}
