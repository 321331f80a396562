//! Crop rectangles supplied by the acquisition layer.

use std::fmt;
use std::str::FromStr;

use image::{imageops, RgbImage};

use crate::error::{Error, Result};

/// A crop request in source pixel coordinates.
///
/// Coordinates may lie outside the image; [`CropRect::clamp_to`] pulls them
/// back inside before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl CropRect {
    /// Rectangle with origin `(x, y)`, not yet clamped.
    #[must_use]
    pub const fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clamp to a `image_width` x `image_height` image.
    ///
    /// The origin is pulled into the image, then width and height are cut
    /// so the rectangle ends at the image border. The size is not grown to
    /// compensate for a negative origin.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateCrop`] if the clamped rectangle is empty.
    pub fn clamp_to(&self, image_width: u32, image_height: u32) -> Result<Self> {
        let (iw, ih) = (i64::from(image_width), i64::from(image_height));
        let degenerate = || Error::DegenerateCrop {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            image_width,
            image_height,
        };
        if iw == 0 || ih == 0 {
            return Err(degenerate());
        }

        let x = self.x.clamp(0, iw - 1);
        let y = self.y.clamp(0, ih - 1);
        let width = self.width.min(iw - x);
        let height = self.height.min(ih - y);

        if width <= 0 || height <= 0 {
            return Err(degenerate());
        }
        Ok(Self::new(x, y, width, height))
    }

    /// Clamp to `img` and cut out the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateCrop`] if the clamped rectangle is empty.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn apply(&self, img: &RgbImage) -> Result<RgbImage> {
        let rect = self.clamp_to(img.width(), img.height())?;
        // Safe: clamped values are non-negative and within the u32 image size
        Ok(imageops::crop_imm(
            img,
            rect.x as u32,
            rect.y as u32,
            rect.width as u32,
            rect.height as u32,
        )
        .to_image())
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

impl FromStr for CropRect {
    type Err = String;

    /// Parse `x,y,width,height`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|part| part.trim().parse::<i64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| format!("invalid crop `{s}`: {err}"))?;

        match parts.as_slice() {
            &[x, y, width, height] => Ok(Self::new(x, y, width, height)),
            _ => Err(format!("invalid crop `{s}`: expected x,y,width,height")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oversized_crop_clamps_to_full_image() {
        let rect = CropRect::new(-5, -5, 10_000, 10_000).clamp_to(100, 100).unwrap();
        assert_eq!(rect, CropRect::new(0, 0, 100, 100));
    }

    #[test]
    fn test_inside_crop_unchanged() {
        let rect = CropRect::new(10, 20, 30, 40).clamp_to(100, 100).unwrap();
        assert_eq!(rect, CropRect::new(10, 20, 30, 40));
    }

    #[test]
    fn test_crop_past_the_edge_is_cut() {
        let rect = CropRect::new(90, 150, 50, 50).clamp_to(100, 100).unwrap();
        assert_eq!(rect, CropRect::new(90, 99, 10, 1));
    }

    #[test]
    fn test_negative_origin_keeps_size() {
        let rect = CropRect::new(-5, 0, 10, 10).clamp_to(100, 100).unwrap();
        assert_eq!(rect, CropRect::new(0, 0, 10, 10));
    }

    #[test]
    fn test_empty_crop_is_rejected() {
        for rect in [CropRect::new(0, 0, 0, 10), CropRect::new(5, 5, 10, -3)] {
            let err = rect.clamp_to(100, 100).unwrap_err();
            assert!(matches!(err, Error::DegenerateCrop { .. }));
        }
    }

    #[test]
    fn test_apply() {
        let img = RgbImage::from_fn(100, 100, |x, y| image::Rgb([x as u8, y as u8, 0]));
        let cropped = CropRect::new(10, 20, 30, 40).apply(&img).unwrap();
        assert_eq!(cropped.dimensions(), (30, 40));
        assert_eq!(cropped.get_pixel(0, 0), &image::Rgb([10, 20, 0]));
    }

    #[test]
    fn test_parse() {
        assert_eq!("1, -2,3,4".parse::<CropRect>(), Ok(CropRect::new(1, -2, 3, 4)));
        assert!("1,2,3".parse::<CropRect>().is_err());
        assert!("a,b,c,d".parse::<CropRect>().is_err());
    }
}
