//! Gaussian noise injection at a single fixed level.

use ndarray::{Array, Dimension};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Noise level the refiner was trained against.
pub const DEFAULT_NOISE_LEVEL: f32 = 0.1;

/// Add `level`-scaled standard normal noise to every element, then clamp to [0, 1].
///
/// The input is left untouched; the only state involved is `rng`.
pub fn add_noise<D, R>(tensor: &Array<f32, D>, level: f32, rng: &mut R) -> Array<f32, D>
where
    D: Dimension,
    R: Rng + ?Sized,
{
    tensor.mapv(|value| {
        let sample: f32 = StandardNormal.sample(&mut *rng);
        level.mul_add(sample, value).clamp(0.0, 1.0)
    })
}
