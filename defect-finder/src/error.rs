use thiserror::Error;

use crate::defects::DefectBox;
use crate::image_size::PixelShape;

/// Errors produced while configuring or running defect finding.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DefectError {
    /// Configuration validation failure.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Combination mode name is not one of AND, OR, FRACTION.
    #[error("unknown combination mode {0:?} (expected AND, OR or FRACTION)")]
    UnknownCombinationMode(String),

    /// FRACTION threshold outside (0, 1].
    #[error("combination fraction {0} is outside (0, 1]")]
    InvalidFraction(f64),

    /// Two grids or defect sets that must share a shape do not.
    #[error("grid dimensions mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Shape everything is rasterized onto.
        expected: PixelShape,
        /// Offending shape.
        found: PixelShape,
    },

    /// A box is empty or extends past the grid it is attached to.
    #[error("defect box {bbox} does not fit in a {shape} grid")]
    BoxOutOfBounds {
        /// Offending box.
        bbox: DefectBox,
        /// Grid shape.
        shape: PixelShape,
    },

    /// Border margins and exclusion planes left nothing to compute statistics on.
    #[error("no usable pixels for statistics in {shape} grid ({excluded} excluded by mask)")]
    EmptyPopulation {
        /// Grid shape.
        shape: PixelShape,
        /// Interior pixels rejected by the exclusion planes.
        excluded: usize,
    },

    /// Consolidation was asked to reduce an empty list.
    #[error("no defect sets to consolidate")]
    NoDefectSets,

    /// Mask plane name is not registered on the grid.
    #[error("unknown mask plane {0:?}")]
    UnknownMaskPlane(String),

    /// All 32 mask bits are already assigned.
    #[error("cannot add mask plane {0:?}: all mask bits are in use")]
    MaskPlanesExhausted(String),

    /// Upstream ISR configuration is unsuitable for defect finding.
    #[error("ISR configuration: {0}")]
    IsrConfig(String),
}
