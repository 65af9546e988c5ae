//! Reduction of several defect sets into one by per-pixel vote

use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, info};

use super::{CombinationModeName, DefectSet};
use crate::error::DefectError;
use crate::image_size::PixelShape;

/// Policy deciding which pixels survive consolidation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CombinationMode {
    /// Defective in every input set
    And,
    /// Defective in at least one input set
    Or,
    /// Defective in at least this fraction of the input sets, in (0, 1]
    Fraction(f64),
}

impl CombinationMode {
    /// FRACTION mode, rejecting thresholds outside (0, 1].
    pub fn fraction(fraction: f64) -> Result<Self, DefectError> {
        if fraction > 0.0 && fraction <= 1.0 {
            Ok(Self::Fraction(fraction))
        } else {
            Err(DefectError::InvalidFraction(fraction))
        }
    }

    /// Mode from its configuration name. `fraction` is only used by FRACTION.
    pub fn parse(name: &str, fraction: f64) -> Result<Self, DefectError> {
        match name.parse::<CombinationModeName>()? {
            CombinationModeName::And => Ok(Self::And),
            CombinationModeName::Or => Ok(Self::Or),
            CombinationModeName::Fraction => Self::fraction(fraction),
        }
    }

    /// Whether a pixel marked in `votes` of `total` sets is kept
    pub fn keeps(&self, votes: u32, total: u32) -> bool {
        match *self {
            Self::And => votes == total,
            Self::Or => votes >= 1,
            Self::Fraction(f) => votes as f64 / total as f64 >= f,
        }
    }
}

/// Combines defect sets that share one grid shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefectSetConsolidator {
    shape: PixelShape,
    mode: CombinationMode,
}

impl DefectSetConsolidator {
    pub fn new(shape: PixelShape, mode: CombinationMode) -> Self {
        Self { shape, mode }
    }

    pub fn mode(&self) -> CombinationMode {
        self.mode
    }

    /// Rasterize every set, count votes per pixel, apply the mode and
    /// re-extract boxes from the surviving pixels.
    ///
    /// The vote count does not depend on input order, so neither does the
    /// result. A single input set is returned as is.
    pub fn consolidate(&self, sets: &[DefectSet]) -> Result<DefectSet, DefectError> {
        if sets.is_empty() {
            return Err(DefectError::NoDefectSets);
        }
        if let Some(bad) = sets.iter().find(|s| s.shape() != self.shape) {
            return Err(DefectError::DimensionMismatch {
                expected: self.shape,
                found: bad.shape(),
            });
        }
        if let [only] = sets {
            return Ok(only.clone());
        }

        let dim = self.shape.to_array_dim();
        let votes = sets
            .par_iter()
            .map(|set| set.to_mask().mapv(u32::from))
            .reduce(|| Array2::zeros(dim), |a, b| a + b);

        let total = sets.len() as u32;
        let keep = votes.mapv(|v| self.mode.keeps(v, total));
        let result = DefectSet::from_mask(&keep.view());

        debug!(
            "Vote histogram max {} of {}",
            votes.iter().copied().max().unwrap_or(0),
            total
        );
        info!(
            "Consolidated {} defect sets with {:?}: {} boxes",
            total,
            self.mode,
            result.len()
        );
        Ok(result)
    }
}
