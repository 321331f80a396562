//! Image saving utilities.

use std::path::Path;

use image::{DynamicImage, ImageFormat, RgbImage};

use crate::error::{Error, Result};

/// Save an RGB image.
///
/// The format is inferred from the extension, defaulting to PNG. JPEG output
/// uses `quality` (1-100); other formats ignore it.
///
/// # Errors
///
/// Returns an error if the image cannot be encoded or written.
pub fn save_image<P: AsRef<Path>>(img: &RgbImage, path: P, quality: u8) -> Result<()> {
    let path = path.as_ref();

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("png")
        .to_lowercase();

    match extension.as_str() {
        "jpg" | "jpeg" => {
            let mut output = std::fs::File::create(path)?;
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality);
            DynamicImage::ImageRgb8(img.clone())
                .write_with_encoder(encoder)
                .map_err(|source| Error::ImageSave {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        _ => {
            let format = ImageFormat::from_extension(&extension).unwrap_or(ImageFormat::Png);
            img.save_with_format(path, format).map_err(|source| Error::ImageSave {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }

    tracing::debug!("Saved {}", path.display());
    Ok(())
}
