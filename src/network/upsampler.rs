//! Stage 1: sub-pixel convolutional upsampler.

use std::path::Path;

use candle_core::{Device, Tensor};
use candle_nn::{Conv2d, Module};

use crate::error::{Error, Result};
use crate::image::RGB_CHANNELS;
use crate::model::ParameterStore;

/// Upscale factor the pretrained weights were trained for.
pub const DEFAULT_UPSCALE: usize = 2;

const FEATURES_1: usize = 64;
const FEATURES_2: usize = 32;

/// Feature extraction followed by a parameter-free channel-to-space shuffle.
///
/// Fully convolutional: an `H x W` input always yields `H*U x W*U`.
#[derive(Debug, Clone)]
pub struct Upsampler {
    upscale_factor: usize,
    /// 5x5 conv, 3 -> 64 channels.
    extract: Conv2d,
    /// 3x3 conv, 64 -> 32 channels.
    shrink: Conv2d,
    /// 3x3 conv, 32 -> 3 * factor^2 channels.
    expand: Conv2d,
}

impl Upsampler {
    /// Load weights saved under the `features.{0,2,4}` names onto `device`.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob is unreadable, corrupt, or does not match
    /// this architecture exactly.
    pub fn load<P: AsRef<Path>>(path: P, upscale_factor: usize, device: &Device) -> Result<Self> {
        let mut store = ParameterStore::open(path, device)?;
        let model = Self::from_store(&mut store, upscale_factor)?;
        store.finish()?;
        Ok(model)
    }

    /// Build the layers from `store`, leaving any other tensors in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the factor is zero or a layer is missing or
    /// misshaped.
    pub fn from_store(store: &mut ParameterStore, upscale_factor: usize) -> Result<Self> {
        if upscale_factor == 0 {
            return Err(Error::InvalidParameter {
                name: "upscale_factor".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        let shuffled = RGB_CHANNELS * upscale_factor * upscale_factor;
        Ok(Self {
            upscale_factor,
            extract: store.take_conv2d("features.0", RGB_CHANNELS, FEATURES_1, 5, 2)?,
            shrink: store.take_conv2d("features.2", FEATURES_1, FEATURES_2, 3, 1)?,
            expand: store.take_conv2d("features.4", FEATURES_2, shuffled, 3, 1)?,
        })
    }

    /// Spatial scale between input and output.
    #[must_use]
    pub const fn upscale_factor(&self) -> usize {
        self.upscale_factor
    }

    /// Upscale a `(1, 3, H, W)` batch to `(1, 3, H*U, W*U)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input does not have 3 channels.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (_, channels, _, _) = x.dims4()?;
        if channels != RGB_CHANNELS {
            return Err(Error::ChannelCount {
                expected: RGB_CHANNELS,
                actual: channels,
            });
        }

        let h = self.extract.forward(x)?.tanh()?;
        let h = self.shrink.forward(&h)?.tanh()?;
        let h = self.expand.forward(&h)?;
        Ok(candle_nn::ops::pixel_shuffle(&h, self.upscale_factor)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::testing::{random_batch, random_upsampler, upsampler_tensors};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_output_is_factor_times_input() {
        let mut rng = StdRng::seed_from_u64(7);
        let model = random_upsampler(&mut rng, 2);
        let out = model.forward(&random_batch(&mut rng, 3, 10, 10)).unwrap();
        assert_eq!(out.dims4().unwrap(), (1, 3, 20, 20));

        let out = model.forward(&random_batch(&mut rng, 3, 7, 13)).unwrap();
        assert_eq!(out.dims4().unwrap(), (1, 3, 14, 26));
    }

    #[test]
    fn test_other_factors() {
        let mut rng = StdRng::seed_from_u64(8);
        let model = random_upsampler(&mut rng, 3);
        let out = model.forward(&random_batch(&mut rng, 3, 4, 5)).unwrap();
        assert_eq!(out.dims4().unwrap(), (1, 3, 12, 15));
    }

    #[test]
    fn test_deterministic() {
        let mut rng = StdRng::seed_from_u64(9);
        let model = random_upsampler(&mut rng, 2);
        let x = random_batch(&mut rng, 3, 12, 12);
        let first = model.forward(&x).unwrap().flatten_all().unwrap();
        let second = model.forward(&x).unwrap().flatten_all().unwrap();
        assert_eq!(
            first.to_vec1::<f32>().unwrap(),
            second.to_vec1::<f32>().unwrap()
        );
    }

    #[test]
    fn test_shuffle_uses_channel_blocks() {
        // Eight channels of one pixel become two 2x2 blocks, in channel order.
        let x = Tensor::arange(0_f32, 8.0, &Device::Cpu)
            .unwrap()
            .reshape((1, 8, 1, 1))
            .unwrap();
        let out = candle_nn::ops::pixel_shuffle(&x, 2).unwrap();
        assert_eq!(out.dims4().unwrap(), (1, 2, 2, 2));
        assert_eq!(
            out.flatten_all().unwrap().to_vec1::<f32>().unwrap(),
            vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]
        );
    }

    #[test]
    fn test_rejects_wrong_channel_count() {
        let mut rng = StdRng::seed_from_u64(10);
        let model = random_upsampler(&mut rng, 2);
        let err = model.forward(&random_batch(&mut rng, 4, 8, 8)).unwrap_err();
        assert!(matches!(err, Error::ChannelCount { expected: 3, actual: 4 }));
    }

    #[test]
    fn test_rejects_mismatched_factor() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut store =
            ParameterStore::from_tensors("espcn", upsampler_tensors(&mut rng, 2), &Device::Cpu)
                .unwrap();
        let err = Upsampler::from_store(&mut store, 3).unwrap_err();
        assert!(matches!(err, Error::LayerLoad { ref layer, .. } if layer == "features.4"));
    }

    #[test]
    fn test_rejects_zero_factor() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut store =
            ParameterStore::from_tensors("espcn", upsampler_tensors(&mut rng, 2), &Device::Cpu)
                .unwrap();
        assert!(matches!(
            Upsampler::from_store(&mut store, 0),
            Err(Error::InvalidParameter { .. })
        ));
    }
}
