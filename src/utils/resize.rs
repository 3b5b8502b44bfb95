//! Array resampling built on the `image` crate's resize primitive.
//!
//! The resampler works on interleaved buffers of at most 4 channels, so
//! images with more channels are split into channel groups, resized one
//! group at a time and restacked along the channel axis. Callers may supply
//! a staging buffer that is reused for the interleaving step to avoid
//! repeated allocation.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, LumaA, Pixel, Rgb, Rgba};
use ndarray::{Array3, ArrayD, ArrayView3, ArrayViewD, Axis, Ix3};

use crate::core::errors::{ProcessingStage, TransformError};
use crate::processors::types::Interpolation;

/// Maximum channel count the underlying resize primitive accepts per call.
const MAX_GROUP_CHANNELS: usize = 4;

/// Resizes one interleaved channel group, returning the resized interleaved
/// buffer and handing the staging allocation back for reuse.
fn resize_group<P>(
    staging: Vec<f32>,
    width: u32,
    height: u32,
    dst_width: u32,
    dst_height: u32,
    filter: FilterType,
) -> Result<(Vec<f32>, Vec<f32>), TransformError>
where
    P: Pixel<Subpixel = f32> + 'static,
{
    let buffer = ImageBuffer::<P, Vec<f32>>::from_raw(width, height, staging).ok_or_else(|| {
        TransformError::processing(
            ProcessingStage::Resize,
            "staging buffer does not match image dimensions".to_string(),
        )
    })?;
    let resized = imageops::resize(&buffer, dst_width, dst_height, filter);
    Ok((resized.into_raw(), buffer.into_raw()))
}

fn as_hwc(view: ArrayViewD<'_, f32>) -> Result<ArrayView3<'_, f32>, TransformError> {
    let view = match view.ndim() {
        2 => view.insert_axis(Axis(2)),
        3 => view,
        ndim => {
            return Err(TransformError::invalid_input(format!(
                "bad input dimensions; must be 2-d, or 3-d (with channels), got rank {ndim}"
            )));
        }
    };
    Ok(view.into_dimensionality::<Ix3>()?)
}

/// Resizes a rank-2 or rank-3 image array to the given destination size.
///
/// # Arguments
///
/// * `image` - The image to resize.
/// * `dst_width`, `dst_height` - Destination size in pixels, both positive.
/// * `interpolation` - The resampling kernel.
/// * `staging` - Optional staging buffer reused for channel interleaving;
///   pass `None` for a per-call allocation.
///
/// # Returns
///
/// The resized image with the input's rank and channel count preserved.
///
/// # Errors
///
/// Returns an error if the destination size is degenerate or the image rank
/// is unsupported.
pub fn resize_array(
    image: ArrayViewD<'_, f32>,
    dst_width: u32,
    dst_height: u32,
    interpolation: Interpolation,
    staging: Option<&mut Vec<f32>>,
) -> Result<ArrayD<f32>, TransformError> {
    if dst_width == 0 || dst_height == 0 {
        return Err(TransformError::processing(
            ProcessingStage::Resize,
            format!("degenerate destination size {dst_width}x{dst_height}"),
        ));
    }
    let rank = image.ndim();
    let view = as_hwc(image)?;
    let (height, width, channels) = view.dim();
    if height == 0 || width == 0 || channels == 0 {
        return Err(TransformError::invalid_input(format!(
            "cannot resize an empty image ({height}x{width}x{channels})"
        )));
    }

    let filter = interpolation.to_filter();
    let (dw, dh) = (dst_width as usize, dst_height as usize);
    let mut out = Array3::<f32>::zeros((dh, dw, channels));

    let mut local = Vec::new();
    let staging = staging.unwrap_or(&mut local);

    let mut group_start = 0;
    while group_start < channels {
        let group = (channels - group_start).min(MAX_GROUP_CHANNELS);

        staging.clear();
        staging.reserve(height * width * group);
        for y in 0..height {
            for x in 0..width {
                for ch in 0..group {
                    staging.push(view[[y, x, group_start + ch]]);
                }
            }
        }

        let taken = std::mem::take(staging);
        let (w, h) = (width as u32, height as u32);
        let (resized, recovered) = match group {
            1 => resize_group::<Luma<f32>>(taken, w, h, dst_width, dst_height, filter)?,
            2 => resize_group::<LumaA<f32>>(taken, w, h, dst_width, dst_height, filter)?,
            3 => resize_group::<Rgb<f32>>(taken, w, h, dst_width, dst_height, filter)?,
            _ => resize_group::<Rgba<f32>>(taken, w, h, dst_width, dst_height, filter)?,
        };
        *staging = recovered;

        for y in 0..dh {
            for x in 0..dw {
                for ch in 0..group {
                    out[[y, x, group_start + ch]] = resized[(y * dw + x) * group + ch];
                }
            }
        }
        group_start += group;
    }

    let out = out.into_dyn();
    Ok(if rank == 2 {
        out.index_axis_move(Axis(2), 0)
    } else {
        out
    })
}
