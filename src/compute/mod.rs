//! Compute device and the glue between host images and device tensors.
//!
//! The networks themselves run on `candle`; this module only picks the
//! device and moves tensors on and off it.

mod device;
mod ops;

pub use candle_core::Device;
pub use device::DeviceKind;
pub use ops::{from_batch, resize_bilinear, to_batch};
