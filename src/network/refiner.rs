//! Stage 2: conditional U-Net refiner.

use std::path::Path;

use candle_core::{Device, Tensor};
use candle_nn::{Conv2d, Module};

use crate::compute::resize_bilinear;
use crate::error::{Error, Result};
use crate::image::RGB_CHANNELS;
use crate::model::ParameterStore;

/// Channel depth of the three encoder levels.
pub const LEVEL_CHANNELS: [usize; 3] = [64, 128, 256];

/// Smallest spatial size that survives two 2x2 poolings.
pub const MIN_SIDE: usize = 4;

/// Two 3x3 convolutions, each followed by ReLU.
#[derive(Debug, Clone)]
struct DoubleConv {
    first: Conv2d,
    second: Conv2d,
}

impl DoubleConv {
    fn load(
        store: &mut ParameterStore,
        prefix: &str,
        in_channels: usize,
        out_channels: usize,
    ) -> Result<Self> {
        let first = format!("{prefix}.net.0");
        let second = format!("{prefix}.net.2");
        Ok(Self {
            first: store.take_conv2d(&first, in_channels, out_channels, 3, 1)?,
            second: store.take_conv2d(&second, out_channels, out_channels, 3, 1)?,
        })
    }
}

impl Module for DoubleConv {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        xs.apply(&self.first)?.relu()?.apply(&self.second)?.relu()
    }
}

/// Encoder-decoder with skip connections, conditioned on a coarse estimate.
///
/// One forward pass per call; the noise level is fixed by the caller.
#[derive(Debug, Clone)]
pub struct Refiner {
    down1: DoubleConv,
    down2: DoubleConv,
    down3: DoubleConv,
    up2: DoubleConv,
    up1: DoubleConv,
    /// 1x1 projection, 64 -> 3 channels.
    head: Conv2d,
}

impl Refiner {
    /// Load weights saved under the `down*`, `up*` and `final` names onto
    /// `device`.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob is unreadable, corrupt, or does not match
    /// this architecture exactly.
    pub fn load<P: AsRef<Path>>(path: P, device: &Device) -> Result<Self> {
        let mut store = ParameterStore::open(path, device)?;
        let model = Self::from_store(&mut store)?;
        store.finish()?;
        Ok(model)
    }

    /// Build the layers from `store`, leaving any other tensors in place.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer is missing or misshaped.
    pub fn from_store(store: &mut ParameterStore) -> Result<Self> {
        let [c1, c2, c3] = LEVEL_CHANNELS;
        Ok(Self {
            down1: DoubleConv::load(store, "down1", 2 * RGB_CHANNELS, c1)?,
            down2: DoubleConv::load(store, "down2", c1, c2)?,
            down3: DoubleConv::load(store, "down3", c2, c3)?,
            up2: DoubleConv::load(store, "up2", c3 + c2, c2)?,
            up1: DoubleConv::load(store, "up1", c2 + c1, c1)?,
            head: store.take_conv2d("final", c1, RGB_CHANNELS, 1, 0)?,
        })
    }

    /// Refine `x` `(1, 3, H, W)` using `cond` `(1, 3, h, w)` of any size.
    ///
    /// The result has the shape of `x` and is not clamped.
    ///
    /// # Errors
    ///
    /// Returns an error if either input lacks 3 channels or `x` is smaller
    /// than 4x4.
    pub fn forward(&self, x: &Tensor, cond: &Tensor) -> Result<Tensor> {
        for input in [x, cond] {
            let (_, channels, _, _) = input.dims4()?;
            if channels != RGB_CHANNELS {
                return Err(Error::ChannelCount {
                    expected: RGB_CHANNELS,
                    actual: channels,
                });
            }
        }
        let (_, _, height, width) = x.dims4()?;
        if height < MIN_SIDE || width < MIN_SIDE {
            return Err(Error::UnsupportedDimensions {
                width,
                height,
                reason: format!("refiner needs at least {MIN_SIDE}x{MIN_SIDE}"),
            });
        }

        let cond = resize_bilinear(cond, height, width)?;
        let fused = Tensor::cat(&[x, &cond], 1)?;

        let d1 = fused.apply(&self.down1)?;
        let d2 = d1.max_pool2d(2)?.apply(&self.down2)?;
        let d3 = d2.max_pool2d(2)?.apply(&self.down3)?;

        let u2 = upsample_onto(&d3, &d2)?.apply(&self.up2)?;
        let u1 = upsample_onto(&u2, &d1)?.apply(&self.up1)?;

        Ok(u1.apply(&self.head)?)
    }
}

/// Bilinearly upsample `deep` to the size of `skip` and stack them.
///
/// Resizing to the skip's exact size (rather than a blind 2x) keeps odd
/// sizes aligned after pooling dropped a row or column.
fn upsample_onto(deep: &Tensor, skip: &Tensor) -> Result<Tensor> {
    let (_, _, h, w) = skip.dims4()?;
    let up = resize_bilinear(deep, h, w)?;
    Ok(Tensor::cat(&[&up, skip], 1)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::testing::{random_batch, random_refiner};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_output_matches_x_shape() {
        let mut rng = StdRng::seed_from_u64(21);
        let model = random_refiner(&mut rng);
        let x = random_batch(&mut rng, 3, 16, 16);
        for (ch, cw) in [(8, 8), (16, 16), (5, 11)] {
            let cond = random_batch(&mut rng, 3, ch, cw);
            let out = model.forward(&x, &cond).unwrap();
            assert_eq!(out.dims4().unwrap(), (1, 3, 16, 16));
        }
    }

    #[test]
    fn test_odd_sizes() {
        let mut rng = StdRng::seed_from_u64(22);
        let model = random_refiner(&mut rng);
        let x = random_batch(&mut rng, 3, 13, 10);
        let cond = random_batch(&mut rng, 3, 6, 5);
        let out = model.forward(&x, &cond).unwrap();
        assert_eq!(out.dims4().unwrap(), (1, 3, 13, 10));
    }

    #[test]
    fn test_full_canonical_size() {
        let mut rng = StdRng::seed_from_u64(23);
        let model = random_refiner(&mut rng);
        let x = random_batch(&mut rng, 3, 160, 160);
        let cond = random_batch(&mut rng, 3, 80, 80);
        let out = model.forward(&x, &cond).unwrap();
        assert_eq!(out.dims4().unwrap(), (1, 3, 160, 160));
    }

    #[test]
    fn test_rejects_tiny_input() {
        let mut rng = StdRng::seed_from_u64(24);
        let model = random_refiner(&mut rng);
        let x = random_batch(&mut rng, 3, 3, 8);
        let err = model.forward(&x, &x).unwrap_err();
        assert!(matches!(err, Error::UnsupportedDimensions { .. }));
    }

    #[test]
    fn test_rejects_bad_condition_channels() {
        let mut rng = StdRng::seed_from_u64(25);
        let model = random_refiner(&mut rng);
        let x = random_batch(&mut rng, 3, 8, 8);
        let cond = random_batch(&mut rng, 1, 8, 8);
        let err = model.forward(&x, &cond).unwrap_err();
        assert!(matches!(err, Error::ChannelCount { actual: 1, .. }));
    }
}
