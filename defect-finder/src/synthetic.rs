//! Synthetic exposures for tests and demonstrations
//!
//! Generation is seeded and processed in fixed row chunks, each chunk with
//! its own RNG derived from the base seed, so output is reproducible while
//! still filled in parallel.

use ndarray::{s, Array2, ArrayViewMut2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal, Poisson};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::defects::DefectBox;
use crate::error::DefectError;
use crate::image_size::PixelShape;
use crate::masked_image::MaskedImage;

const CHUNK_ROWS: usize = 64;

fn fill_in_parallel_chunks<F>(shape: PixelShape, seed: u64, fill: F) -> Array2<f64>
where
    F: Fn(&mut ArrayViewMut2<f64>, &mut StdRng) + Send + Sync,
{
    let mut array = Array2::zeros(shape.to_array_dim());
    array
        .axis_chunks_iter_mut(Axis(0), CHUNK_ROWS)
        .into_par_iter()
        .enumerate()
        .for_each(|(chunk_idx, mut chunk)| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(chunk_idx as u64));
            fill(&mut chunk, &mut rng);
        });
    array
}

/// Image of independent Normal(mean, std_dev) samples.
///
/// # Panics
/// If `std_dev` is negative or not finite.
pub fn normal_image(shape: PixelShape, mean: f64, std_dev: f64, seed: u64) -> Array2<f64> {
    let normal = Normal::new(mean, std_dev)
        .expect("Normal distribution parameters must be valid (std_dev >= 0)");
    fill_in_parallel_chunks(shape, seed, |chunk, rng| {
        chunk.iter_mut().for_each(|px| *px = normal.sample(rng));
    })
}

/// Add `offset` to every pixel of `bbox`.
pub fn inject_offset(image: &mut MaskedImage, bbox: &DefectBox, offset: f64) {
    image
        .image_mut()
        .slice_mut(s![bbox.y..=bbox.max_y(), bbox.x..=bbox.max_x()])
        .mapv_inplace(|v| v + offset);
}

/// Parameters of a mock flat-field pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockFlatConfig {
    pub shape: PixelShape,
    /// Seconds
    pub exposure_time: f64,
    /// Electrons per ADU
    pub gain: f64,
    /// Read noise RMS in electrons
    pub read_noise_electrons: f64,
    /// Illumination in electrons per second
    pub flux_electrons: f64,
    pub seed_flat1: u64,
    pub seed_flat2: u64,
}

impl Default for MockFlatConfig {
    fn default() -> Self {
        Self {
            shape: PixelShape::new(128, 144),
            exposure_time: 1.0,
            gain: 1.0,
            read_noise_electrons: 5.0,
            flux_electrons: 1000.0,
            seed_flat1: 1984,
            seed_flat2: 666,
        }
    }
}

impl MockFlatConfig {
    /// Expected signal per pixel in ADU
    pub fn mean_signal_adu(&self) -> f64 {
        self.flux_electrons * self.exposure_time / self.gain
    }
}

/// Two flats with Poisson photon noise and Gaussian read noise, in ADU.
pub fn make_mock_flat_pair(
    config: &MockFlatConfig,
) -> Result<(MaskedImage, MaskedImage), DefectError> {
    if config.gain.is_nan() || config.gain <= 0.0 {
        return Err(DefectError::InvalidConfig(format!(
            "mock flat gain must be positive, got {}",
            config.gain
        )));
    }
    let electrons = config.flux_electrons * config.exposure_time;
    let photons = Poisson::new(electrons).map_err(|_| {
        DefectError::InvalidConfig(format!(
            "mock flat signal must be positive, got {electrons} e-"
        ))
    })?;
    let read_noise = Normal::new(0.0, config.read_noise_electrons).map_err(|_| {
        DefectError::InvalidConfig(format!(
            "read noise must be non-negative, got {} e-",
            config.read_noise_electrons
        ))
    })?;

    let flat = |seed| {
        let image = fill_in_parallel_chunks(config.shape, seed, |chunk, rng| {
            chunk.iter_mut().for_each(|px| {
                *px = (photons.sample(rng) + read_noise.sample(rng)) / config.gain;
            });
        });
        MaskedImage::from_image(image)
    };

    Ok((flat(config.seed_flat1), flat(config.seed_flat2)))
}
