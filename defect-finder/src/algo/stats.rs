//! Statistical functions for robust population estimates

use scilib::math::basic::erf;
use std::f64::consts::{PI, SQRT_2};

/// Converts an interquartile range into a Gaussian sigma (1 / (2 * 0.6745)).
const IQR_TO_SIGMA: f64 = 0.741_301_109_252_801;

/// Probability density function for standard normal distribution
pub fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Cumulative distribution function for standard normal distribution
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

/// Scale factor that undoes the shrinkage of a sigma measured after clipping.
///
/// Rejecting points beyond a symmetric `±n_sigma_clip` threshold removes real
/// tail samples, so the standard deviation of what remains underestimates the
/// true sigma. The effect is about 1.5% at 3 sigma but roughly 12% at 2 sigma.
/// For a normal population the retained variance fraction is
/// `1 - 2kφ(k) / (Φ(k) - Φ(-k))`; the returned factor is its inverse square root.
///
/// # Arguments
/// * `n_sigma_clip` - Clip threshold in sigma, must be positive
pub fn sigma_clip_correction(n_sigma_clip: f64) -> f64 {
    let retained = normal_cdf(n_sigma_clip) - normal_cdf(-n_sigma_clip);
    let var_factor = 1.0 - (2.0 * n_sigma_clip * normal_pdf(n_sigma_clip)) / retained;
    1.0 / var_factor.sqrt()
}

/// Iterative symmetric sigma clipping parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmaClip {
    /// Half-width of the kept window, in units of the current sigma
    pub n_sigma: f64,
    /// Maximum number of clip/re-estimate rounds
    pub max_iterations: usize,
}

impl Default for SigmaClip {
    fn default() -> Self {
        Self {
            n_sigma: 3.0,
            max_iterations: 3,
        }
    }
}

/// Population estimate produced by [`sigma_clipped_stats`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClippedStats {
    /// Mean of the retained samples
    pub mean: f64,
    /// Clipping-corrected standard deviation of the retained samples
    pub std_dev: f64,
    /// Number of samples retained by the final clip
    pub count: usize,
}

/// Clipped mean and standard deviation of a sample.
///
/// Starts from the median and an IQR-derived sigma so that gross outliers do
/// not inflate the first window. Quantized data where half the samples share
/// one value has a zero IQR; the first window is then seeded from the sample
/// standard deviation of all finite values instead. It then alternates between keeping samples
/// within `n_sigma` of the current mean and re-estimating mean and standard
/// deviation from them. Iteration stops early once a round keeps the same
/// samples as the previous one. The final standard deviation is scaled by
/// [`sigma_clip_correction`].
///
/// Non-finite samples are ignored. Returns `None` if no finite samples remain.
pub fn sigma_clipped_stats(values: &[f64], clip: &SigmaClip) -> Option<ClippedStats> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut center = quantile_sorted(&sorted, 0.5);
    let mut width =
        IQR_TO_SIGMA * (quantile_sorted(&sorted, 0.75) - quantile_sorted(&sorted, 0.25));
    if !(width.is_finite() && width > 0.0) {
        width = mean_and_std(&sorted).1;
    }
    let mut kept = sorted.len();

    for _ in 0..clip.max_iterations {
        let limit = clip.n_sigma * width;
        // Sorted input, so the kept window is a contiguous slice
        let lo = sorted.partition_point(|&v| v < center - limit);
        let hi = sorted.partition_point(|&v| v <= center + limit);
        if hi <= lo {
            break;
        }

        let window = &sorted[lo..hi];
        let (mean, std_dev) = mean_and_std(window);
        center = mean;
        width = std_dev;

        if window.len() == kept {
            break;
        }
        kept = window.len();
    }

    Some(ClippedStats {
        mean: center,
        std_dev: width * sigma_clip_correction(clip.n_sigma),
        count: kept,
    })
}

/// Linearly interpolated quantile of an already sorted, non-empty slice.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Mean and sample standard deviation; the deviation is 0 for fewer than two samples.
fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, variance.sqrt())
}
