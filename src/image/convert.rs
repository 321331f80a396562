//! Conversions between raster images and tensors.

use image::{imageops, imageops::FilterType, RgbImage};
use ndarray::Array3;

use crate::error::{Error, Result};

use super::{ImageTensor, RGB_CHANNELS};

/// Bicubic resize to exactly `width` x `height`.
///
/// Catmull-Rom is the `a = -0.5` cubic that PIL calls bicubic.
#[must_use]
pub fn resize_bicubic(img: &RgbImage, width: u32, height: u32) -> RgbImage {
    if img.dimensions() == (width, height) {
        return img.clone();
    }
    imageops::resize(img, width, height, FilterType::CatmullRom)
}

/// Convert an RGB image to a CHW tensor with values in [0, 1].
#[must_use]
pub fn image_to_tensor(img: &RgbImage) -> ImageTensor {
    let (width, height) = img.dimensions();
    let mut tensor = Array3::<f32>::zeros((RGB_CHANNELS, height as usize, width as usize));

    for (x, y, pixel) in img.enumerate_pixels() {
        for c in 0..RGB_CHANNELS {
            tensor[[c, y as usize, x as usize]] = f32::from(pixel[c]) / 255.0;
        }
    }

    tensor
}

/// Convert a CHW tensor back to an RGB image.
///
/// Values are clamped to [0, 1], scaled to [0, 255] and rounded.
///
/// # Errors
///
/// Returns an error if the tensor does not have 3 channels or is too large
/// for an image.
#[allow(clippy::cast_possible_truncation)]
pub fn tensor_to_image(tensor: &ImageTensor) -> Result<RgbImage> {
    let (channels, height, width) = tensor.dim();
    if channels != RGB_CHANNELS {
        return Err(Error::ChannelCount {
            expected: RGB_CHANNELS,
            actual: channels,
        });
    }
    let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
        return Err(Error::UnsupportedDimensions {
            width,
            height,
            reason: "exceeds image size limits".to_string(),
        });
    };

    Ok(RgbImage::from_fn(w, h, |x, y| {
        let (x, y) = (x as usize, y as usize);
        image::Rgb([
            denormalize(tensor[[0, y, x]]),
            denormalize(tensor[[1, y, x]]),
            denormalize(tensor[[2, y, x]]),
        ])
    }))
}

/// Map a value from [0, 1] to [0, 255] with clamping and rounding.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn denormalize(value: f32) -> u8 {
    // Safe: clamped to [0, 255] before casting
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denormalize() {
        assert_eq!(denormalize(0.0), 0);
        assert_eq!(denormalize(0.5), 128);
        assert_eq!(denormalize(1.0), 255);
    }

    #[test]
    fn test_denormalize_clamp() {
        assert_eq!(denormalize(-2.0), 0);
        assert_eq!(denormalize(2.0), 255);
        assert_eq!(denormalize(f32::NAN), 0);
    }

    #[test]
    fn test_tensor_shape_and_range() {
        let img = RgbImage::from_pixel(7, 4, image::Rgb([255, 0, 51]));
        let tensor = image_to_tensor(&img);

        assert_eq!(tensor.shape(), &[3, 4, 7]);
        assert!((tensor[[0, 3, 6]] - 1.0).abs() < 1e-6);
        assert!(tensor[[1, 0, 0]].abs() < 1e-6);
        assert!((tensor[[2, 2, 2]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_image_survives_tensor_conversion() {
        let img = RgbImage::from_fn(5, 3, |x, y| image::Rgb([(x * 50) as u8, (y * 80) as u8, 7]));
        let back = tensor_to_image(&image_to_tensor(&img)).unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn test_tensor_to_image_rejects_gray() {
        let tensor = Array3::<f32>::zeros((1, 2, 2));
        assert!(matches!(
            tensor_to_image(&tensor),
            Err(Error::ChannelCount { actual: 1, .. })
        ));
    }

    #[test]
    fn test_resize_bicubic_exact_size() {
        let img = RgbImage::from_pixel(300, 200, image::Rgb([10, 20, 30]));
        let small = resize_bicubic(&img, 40, 40);
        assert_eq!(small.dimensions(), (40, 40));
        assert_eq!(small.get_pixel(20, 20), &image::Rgb([10, 20, 30]));
    }
}
