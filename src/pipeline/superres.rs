//! Two-stage super-resolution pipeline.

use std::path::PathBuf;
use std::time::Instant;

use ::image::RgbImage;
use candle_core::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::compute::{from_batch, to_batch, Device, DeviceKind};
use crate::error::{Error, Result};
use crate::image::{self, CropRect, ImageTensor};
use crate::model::{ModelKind, ModelStore};
use crate::network::{Refiner, Upsampler, DEFAULT_UPSCALE, MIN_SIDE};

use super::noise::{add_noise, DEFAULT_NOISE_LEVEL};

/// Largest accepted noise level.
const MAX_NOISE_LEVEL: f32 = 2.0;

/// Configuration for the super-resolution pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Standard deviation of the noise added to the high-resolution target.
    pub noise_level: f32,

    /// Side of the square the input is shrunk to before Stage 1.
    pub low_res_size: u32,

    /// Side of the square the input is resized to before Stage 2.
    pub high_res_size: u32,

    /// Stage 1 upscale factor. Must match the upsampler weights.
    pub upscale_factor: usize,

    /// Device the forward passes run on.
    pub device: DeviceKind,

    /// Random seed for the noise. None for a fresh seed per request.
    pub seed: Option<u64>,

    /// Directory holding the weight blobs. None for the default location.
    pub models_dir: Option<PathBuf>,

    /// Explicit Stage 1 weights, overriding `models_dir`.
    pub upsampler_weights: Option<PathBuf>,

    /// Explicit Stage 2 weights, overriding `models_dir`.
    pub refiner_weights: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            noise_level: DEFAULT_NOISE_LEVEL,
            low_res_size: 40,
            high_res_size: 160,
            upscale_factor: DEFAULT_UPSCALE,
            device: DeviceKind::Cpu,
            seed: None,
            models_dir: None,
            upsampler_weights: None,
            refiner_weights: None,
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if !self.noise_level.is_finite() || !(0.0..=MAX_NOISE_LEVEL).contains(&self.noise_level) {
            return Err(Error::InvalidParameter {
                name: "noise_level".to_string(),
                reason: format!("must be between 0.0 and {MAX_NOISE_LEVEL}"),
            });
        }

        if self.low_res_size == 0 {
            return Err(Error::InvalidParameter {
                name: "low_res_size".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if (self.high_res_size as usize) < MIN_SIDE {
            return Err(Error::InvalidParameter {
                name: "high_res_size".to_string(),
                reason: format!("must be at least {MIN_SIDE}"),
            });
        }

        if self.upscale_factor == 0 {
            return Err(Error::InvalidParameter {
                name: "upscale_factor".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Where the weights of `kind` are read from.
    #[must_use]
    pub fn weights_path(&self, kind: ModelKind) -> PathBuf {
        let explicit = match kind {
            ModelKind::Upsampler => &self.upsampler_weights,
            ModelKind::Refiner => &self.refiner_weights,
        };
        explicit.clone().unwrap_or_else(|| {
            self.models_dir
                .as_ref()
                .map_or_else(ModelStore::from_env, ModelStore::new)
                .path(kind)
        })
    }
}

/// The three images produced for one request.
#[derive(Debug, Clone)]
pub struct SuperResolution {
    /// Low-resolution input bicubically upscaled to the high-resolution size.
    pub preview: RgbImage,
    /// Stage 1 output.
    pub stage1: RgbImage,
    /// Stage 2 output.
    pub stage2: RgbImage,
}

/// Two-stage super-resolution pipeline.
///
/// Holds both networks and the compute device they were loaded onto. All
/// methods take `&self`; the parameters never change after construction.
#[derive(Debug)]
pub struct Pipeline {
    config: Config,
    device: Device,
    upsampler: Upsampler,
    refiner: Refiner,
}

impl Pipeline {
    /// Create a new pipeline, loading both networks from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the device cannot
    /// be opened, or either weight blob fails to load.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tracing::info!("Initializing pipeline with config: {config:?}");

        let device = config.device.resolve()?;

        let path = config.weights_path(ModelKind::Upsampler);
        tracing::info!("Loading upsampler from {}", path.display());
        let upsampler = Upsampler::load(&path, config.upscale_factor, &device)?;

        let path = config.weights_path(ModelKind::Refiner);
        tracing::info!("Loading refiner from {}", path.display());
        let refiner = Refiner::load(&path, &device)?;

        tracing::info!("Pipeline initialized on {}", config.device);

        Ok(Self {
            config,
            device,
            upsampler,
            refiner,
        })
    }

    /// Assemble a pipeline from networks already loaded onto `device`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or disagrees with
    /// the upsampler's factor.
    pub fn from_parts(
        config: Config,
        device: Device,
        upsampler: Upsampler,
        refiner: Refiner,
    ) -> Result<Self> {
        config.validate()?;
        if upsampler.upscale_factor() != config.upscale_factor {
            return Err(Error::InvalidParameter {
                name: "upscale_factor".to_string(),
                reason: format!(
                    "configured {} but the upsampler was built for {}",
                    config.upscale_factor,
                    upsampler.upscale_factor()
                ),
            });
        }
        Ok(Self {
            config,
            device,
            upsampler,
            refiner,
        })
    }

    /// Run Stage 1 alone on a CHW tensor.
    ///
    /// # Errors
    ///
    /// Returns an error if the tensor does not have 3 channels.
    pub fn run_stage1(&self, tensor: &ImageTensor) -> Result<ImageTensor> {
        let output = self.upsampler.forward(&to_batch(tensor, &self.device)?)?;
        from_batch(&output)
    }

    /// Process one image, seeding the noise from the configured seed.
    ///
    /// # Errors
    ///
    /// Returns an error if the crop is degenerate, the image is empty, or a
    /// forward pass fails. No images are produced on error.
    pub fn run(&self, input: &RgbImage, crop: Option<CropRect>) -> Result<SuperResolution> {
        let mut rng = self
            .config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        self.run_with_rng(input, crop, &mut rng)
    }

    /// Process one image, drawing the noise from `rng`.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::run`].
    pub fn run_with_rng<R: Rng + ?Sized>(
        &self,
        input: &RgbImage,
        crop: Option<CropRect>,
        rng: &mut R,
    ) -> Result<SuperResolution> {
        let started = Instant::now();

        let cropped;
        let source = match crop {
            Some(rect) => {
                cropped = rect.apply(input)?;
                tracing::debug!("Cropped {rect} to {}x{}", cropped.width(), cropped.height());
                &cropped
            }
            None => input,
        };
        if source.width() == 0 || source.height() == 0 {
            return Err(Error::UnsupportedDimensions {
                width: source.width() as usize,
                height: source.height() as usize,
                reason: "image is empty".to_string(),
            });
        }

        let (low, high) = (self.config.low_res_size, self.config.high_res_size);

        let low_res = image::resize_bicubic(source, low, low);
        let sr_low = self.upsampler.forward(&self.batch(&image::image_to_tensor(&low_res))?)?;
        tracing::debug!("Stage 1 produced {:?} after {:?}", sr_low.dims(), started.elapsed());

        let high_res = image::image_to_tensor(&image::resize_bicubic(source, high, high));
        let target = self.batch(&add_noise(&high_res, self.config.noise_level, rng))?;
        let sr_high = self.refiner.forward(&target, &sr_low)?.clamp(0_f32, 1_f32)?;
        tracing::debug!("Stage 2 produced {:?} after {:?}", sr_high.dims(), started.elapsed());

        let result = SuperResolution {
            preview: image::resize_bicubic(&low_res, high, high),
            stage1: image::tensor_to_image(&from_batch(&sr_low)?)?,
            stage2: image::tensor_to_image(&from_batch(&sr_high)?)?,
        };

        tracing::info!(
            "Processed {}x{} image in {:?}",
            source.width(),
            source.height(),
            started.elapsed()
        );
        Ok(result)
    }

    fn batch(&self, tensor: &ImageTensor) -> Result<Tensor> {
        to_batch(tensor, &self.device)
    }
}
