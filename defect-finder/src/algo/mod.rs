//! Numeric building blocks shared by the defect finding stages
//!
//! - **stats**: normal distribution helpers and clipped population statistics
//! - **labeling**: connected-component labeling and box extraction over boolean masks

pub mod labeling;
pub mod stats;

pub use labeling::{connected_components, mask_to_boxes};
pub use stats::{
    normal_cdf, normal_pdf, sigma_clip_correction, sigma_clipped_stats, ClippedStats, SigmaClip,
};
