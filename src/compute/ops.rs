//! Host/device tensor transfer and the resampling the networks need.

use candle_core::{DType, Device, Tensor};
use ndarray::Array3;

use crate::error::{Error, Result};
use crate::image::ImageTensor;

/// Copy a CHW tensor onto `device` as a `(1, C, H, W)` batch.
///
/// # Errors
///
/// Returns an error if the device rejects the allocation.
pub fn to_batch(tensor: &ImageTensor, device: &Device) -> Result<Tensor> {
    let (c, h, w) = tensor.dim();
    let data: Vec<f32> = tensor.iter().copied().collect();
    Ok(Tensor::from_vec(data, (1, c, h, w), device)?)
}

/// Copy a `(1, C, H, W)` batch back to the host as a CHW tensor.
///
/// # Errors
///
/// Returns an error if the batch is not 4D with a batch size of 1.
pub fn from_batch(batch: &Tensor) -> Result<ImageTensor> {
    let (n, c, h, w) = batch.dims4()?;
    if n != 1 {
        return Err(Error::ShapeMismatch {
            expected: "batch of 1".to_string(),
            actual: format!("batch of {n}"),
        });
    }
    let data = batch.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
    Ok(Array3::from_shape_vec((c, h, w), data)?)
}

/// Source index pair and blend weight for one output coordinate.
#[derive(Debug, Clone, Copy)]
struct Tap {
    lo: u32,
    hi: u32,
    frac: f32,
}

/// Half-pixel-centre sampling positions, clamped at the borders.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn linear_taps(in_len: usize, out_len: usize) -> Vec<Tap> {
    let scale = in_len as f32 / out_len as f32;
    let last = (in_len - 1) as u32;
    (0..out_len)
        .map(|i| {
            let src = ((i as f32 + 0.5) * scale - 0.5).max(0.0);
            let lo = (src.floor() as u32).min(last);
            Tap {
                lo,
                hi: (lo + 1).min(last),
                frac: src - lo as f32,
            }
        })
        .collect()
}

/// Linear interpolation along axis 2 (rows) or 3 (columns) of an NCHW tensor.
fn lerp_axis(x: &Tensor, axis: usize, in_len: usize, out_len: usize) -> Result<Tensor> {
    let taps = linear_taps(in_len, out_len);
    let device = x.device();

    let lo = Tensor::from_iter(taps.iter().map(|t| t.lo), device)?;
    let hi = Tensor::from_iter(taps.iter().map(|t| t.hi), device)?;
    let shape = match axis {
        2 => (1, 1, out_len, 1),
        _ => (1, 1, 1, out_len),
    };
    let frac = Tensor::from_iter(taps.iter().map(|t| t.frac), device)?
        .reshape(shape)?
        .to_dtype(x.dtype())?;

    let near = x.index_select(&lo, axis)?;
    let far = x.index_select(&hi, axis)?;
    Ok(near.broadcast_add(&far.sub(&near)?.broadcast_mul(&frac)?)?)
}

/// Bilinear resampling of the spatial axes of an NCHW tensor.
///
/// Sampling positions use pixel centres (no corner alignment), so a 2x
/// upsample blends each source pixel 3:1 with its neighbour.
///
/// # Errors
///
/// Returns an error if the input is not 4D or either size is empty.
pub fn resize_bilinear(x: &Tensor, out_h: usize, out_w: usize) -> Result<Tensor> {
    let (_, _, h, w) = x.dims4()?;
    if h == 0 || w == 0 || out_h == 0 || out_w == 0 {
        return Err(Error::UnsupportedDimensions {
            width: w,
            height: h,
            reason: format!("cannot resample to {out_w}x{out_h}"),
        });
    }
    if (h, w) == (out_h, out_w) {
        return Ok(x.clone());
    }

    let rows = lerp_axis(x, 2, h, out_h)?;
    lerp_axis(&rows, 3, w, out_w)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(t: &Tensor) -> Vec<f32> {
        t.flatten_all().unwrap().to_vec1::<f32>().unwrap()
    }

    #[test]
    fn test_bilinear_doubles_with_half_pixel_centres() {
        let x = Tensor::new(&[1.0_f32, 2.0, 3.0, 4.0], &Device::Cpu)
            .unwrap()
            .reshape((1, 1, 2, 2))
            .unwrap();
        let out = resize_bilinear(&x, 4, 4).unwrap();
        assert_eq!(out.dims4().unwrap(), (1, 1, 4, 4));
        assert_eq!(
            values(&out),
            vec![
                1.0, 1.25, 1.75, 2.0, //
                1.5, 1.75, 2.25, 2.5, //
                2.5, 2.75, 3.25, 3.5, //
                3.0, 3.25, 3.75, 4.0,
            ]
        );
    }

    #[test]
    fn test_bilinear_preserves_constant() {
        let x = Tensor::full(0.3_f32, (1, 3, 5, 7), &Device::Cpu).unwrap();
        let out = resize_bilinear(&x, 16, 9).unwrap();
        assert_eq!(out.dims4().unwrap(), (1, 3, 16, 9));
        assert!(values(&out).iter().all(|v| (v - 0.3).abs() < 1e-6));
    }

    #[test]
    fn test_bilinear_downsamples_odd_sizes() {
        let x = Tensor::arange(0_f32, 15.0, &Device::Cpu)
            .unwrap()
            .reshape((1, 1, 3, 5))
            .unwrap();
        let out = resize_bilinear(&x, 2, 2).unwrap();
        assert_eq!(out.dims4().unwrap(), (1, 1, 2, 2));
    }

    #[test]
    fn test_bilinear_rejects_empty_target() {
        let x = Tensor::zeros((1, 1, 2, 2), DType::F32, &Device::Cpu).unwrap();
        assert!(matches!(
            resize_bilinear(&x, 0, 4),
            Err(Error::UnsupportedDimensions { .. })
        ));
    }

    #[test]
    fn test_batch_transfer_keeps_layout() {
        let tensor = Array3::from_shape_fn((3, 2, 4), |(c, y, x)| (c * 100 + y * 10 + x) as f32);
        let batch = to_batch(&tensor, &Device::Cpu).unwrap();
        assert_eq!(batch.dims4().unwrap(), (1, 3, 2, 4));
        assert_eq!(from_batch(&batch).unwrap(), tensor);
    }

    #[test]
    fn test_from_batch_rejects_larger_batches() {
        let batch = Tensor::zeros((2, 3, 2, 2), DType::F32, &Device::Cpu).unwrap();
        assert!(matches!(
            from_batch(&batch),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
