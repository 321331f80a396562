//! # duosr
//!
//! Two-stage image super-resolution.
//!
//! A small sub-pixel convolutional network (Stage 1) upsamples a 40x40
//! thumbnail to 80x80. A conditional U-Net (Stage 2) then takes the input
//! resized to 160x160, lightly noised, and refines it using the Stage 1
//! estimate as its conditioning signal. Everything runs inference-only on
//! frozen weights loaded once at startup.
//!
//! ## Example
//!
//! ```no_run
//! use duosr::{image, Config, Pipeline};
//!
//! # fn main() -> duosr::Result<()> {
//! let pipeline = Pipeline::new(Config::default())?;
//!
//! let input = image::load_image("photo.png")?;
//! let result = pipeline.run(&input, None)?;
//! image::save_image(&result.stage2, "sr160.png", 95)?;
//! # Ok(())
//! # }
//! ```

pub mod compute;
pub mod error;
pub mod image;
pub mod model;
pub mod network;
pub mod pipeline;

pub use compute::{Device, DeviceKind};
pub use error::{Error, ErrorKind, Result};
pub use pipeline::{Config, Pipeline, SuperResolution};
