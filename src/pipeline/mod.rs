//! Two-stage super-resolution: upsample, add noise, refine.

mod noise;
mod superres;

pub use noise::{add_noise, DEFAULT_NOISE_LEVEL};
pub use superres::{Config, Pipeline, SuperResolution};
