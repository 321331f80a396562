//! Image loading, conversion, cropping, and saving utilities.

mod convert;
mod crop;
mod load;
mod save;

pub use convert::{image_to_tensor, resize_bicubic, tensor_to_image};
pub use crop::CropRect;
pub use load::{decode_image, load_image};
pub use save::save_image;

use ndarray::Array3;

/// Image tensor in CHW format (channels, height, width), RGB, values in [0, 1].
pub type ImageTensor = Array3<f32>;

/// Number of channels in RGB images.
pub const RGB_CHANNELS: usize = 3;
