//! Defect detection, column merging and consolidation
//!
//! Data flows leaf-first through these stages:
//!
//! - **detector**: per-exposure hot/cold pixel finding from clipped statistics
//! - **edge**: non-science border marking
//! - **column_merge**: intermittent column defects merged into single boxes
//! - **consolidate**: AND / OR / FRACTION vote over several defect sets
//! - **accounting**: area and good-pixel counts
//! - **finder**: the whole pipeline over a list of exposures

pub mod accounting;
pub mod column_merge;
pub mod config;
pub mod consolidate;
pub mod defect_box;
pub mod defect_set;
pub mod detector;
pub mod edge;
pub mod finder;

pub use accounting::{area_of, count_masked_pixels, good_pixel_count};
pub use column_merge::IntermittentColumnMerger;
pub use config::{
    CollectingReporter, CombinationModeName, FindDefectsConfig, TracingReporter,
    ValidationReporter,
};
pub use consolidate::{CombinationMode, DefectSetConsolidator};
pub use defect_box::DefectBox;
pub use defect_set::DefectSet;
pub use detector::{ExposureKind, HotColdPixelDetector};
pub use edge::EdgeMasker;
pub use finder::DefectFinder;
