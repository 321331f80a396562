//! Image loading utilities.

use std::path::Path;

use image::{DynamicImage, RgbImage};

use crate::error::{Error, Result};

/// Load an image from disk as 8-bit RGB.
///
/// Any alpha channel is dropped and grayscale or 16-bit images are
/// converted, so the result always has three 8-bit channels.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let path = path.as_ref();

    let img = image::open(path).map_err(|source| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(into_rgb(img))
}

/// Decode an encoded image held in memory as 8-bit RGB.
///
/// # Errors
///
/// Returns an error if the format is unknown or the data is corrupt.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    let img = image::load_from_memory(bytes).map_err(|source| Error::ImageDecode { source })?;
    Ok(into_rgb(img))
}

fn into_rgb(img: DynamicImage) -> RgbImage {
    tracing::debug!("Decoded {}x{} {:?} image", img.width(), img.height(), img.color());
    match img {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.to_rgb8(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_decode_drops_alpha() {
        let rgba = image::RgbaImage::from_pixel(4, 3, image::Rgba([1, 2, 3, 0]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(rgba)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let rgb = decode_image(&bytes).unwrap();
        assert_eq!(rgb.dimensions(), (4, 3));
        assert_eq!(rgb.get_pixel(0, 0), &image::Rgb([1, 2, 3]));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_image("/nonexistent/input.png").unwrap_err();
        assert!(matches!(err, Error::ImageLoad { .. }));
    }
}
