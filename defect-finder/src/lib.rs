//! Defect finding for sensor calibration.
//!
//! Identifies electronically defective pixels from flat-field and dark
//! exposures and reduces the per-exposure results into one defect mask:
//!
//! - [`defects::HotColdPixelDetector`]: clipped-statistics hot/cold pixel finder
//! - [`defects::IntermittentColumnMerger`]: merges on/off bad runs along a column
//! - [`defects::DefectSetConsolidator`]: AND / OR / FRACTION vote across sets
//! - [`defects::EdgeMasker`]: flags the non-science border of a grid
//! - [`defects::DefectFinder`]: the end-to-end pipeline over several exposures

pub mod algo;
pub mod defects;
pub mod error;
pub mod image_size;
pub mod isr_check;
pub mod masked_image;
pub mod synthetic;

pub use defects::{
    CombinationMode, DefectBox, DefectFinder, DefectSet, ExposureKind, FindDefectsConfig,
};
pub use error::DefectError;
pub use image_size::PixelShape;
pub use masked_image::{Mask, MaskedImage, PixelGrid};
