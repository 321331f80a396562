//! The two networks: a sub-pixel upsampler and a conditional U-Net refiner.
//!
//! Each network is a `candle` layer stack built once from a weight blob and
//! never mutated afterwards. Forward passes take `&self` and run on the
//! device the input tensors live on, so a loaded network can be shared
//! freely between threads.

mod refiner;
mod upsampler;

pub use refiner::{Refiner, LEVEL_CHANNELS, MIN_SIDE};
pub use upsampler::{Upsampler, DEFAULT_UPSCALE};
