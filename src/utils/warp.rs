//! Affine warping over image arrays.
//!
//! The warp maps every destination pixel through the inverse transformation
//! and samples the source image, processing rows in parallel. Passing
//! `inverse_map` uses the given matrix directly as the destination-to-source
//! map, which is how a warp is undone without recomputing a matrix inverse
//! at every call site.

use nalgebra::{Matrix3, Vector3};
use ndarray::{ArrayD, ArrayView3, ArrayViewD, Axis, Ix3, IxDyn};
use rayon::prelude::*;

use crate::core::errors::{ProcessingStage, TransformError};
use crate::processors::types::{BorderMode, Interpolation};
use crate::utils::crop::border_index;

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

/// Fetches one source pixel channel, applying the border policy for
/// out-of-range coordinates.
#[inline]
fn fetch(
    src: &[f32],
    width: i64,
    height: i64,
    channels: usize,
    x: i64,
    y: i64,
    ch: usize,
    border: BorderMode,
) -> f32 {
    let sx = border_index(x, width, border);
    let sy = border_index(y, height, border);
    match (sx, sy) {
        (Some(sx), Some(sy)) => src[(sy as usize * width as usize + sx as usize) * channels + ch],
        _ => match border {
            BorderMode::Constant(value) => value,
            // Unreachable for replicate/reflect, which always map inside.
            _ => 0.0,
        },
    }
}

/// Warps an image with a 2×3 affine matrix.
///
/// # Arguments
///
/// * `image` - The image to warp, rank 2 or rank 3.
/// * `matrix` - The 2×3 transformation matrix in row-major order, mapping
///   source coordinates to destination coordinates.
/// * `inverse_map` - When true, `matrix` is used directly as the
///   destination-to-source map instead of being inverted.
/// * `out_width`, `out_height` - Destination size in pixels.
/// * `interpolation` - Sampling kernel; nearest is honored, every other
///   kernel samples bilinearly.
/// * `border` - Border policy for samples that fall outside the source.
///
/// # Returns
///
/// The warped image with the input's rank and channel count preserved.
///
/// # Errors
///
/// Returns an error if the image rank is unsupported, the destination size
/// is degenerate, or the matrix is singular.
#[allow(clippy::too_many_arguments)]
pub fn warp_affine(
    image: ArrayViewD<'_, f32>,
    matrix: &[f32; 6],
    inverse_map: bool,
    out_width: u32,
    out_height: u32,
    interpolation: Interpolation,
    border: BorderMode,
) -> Result<ArrayD<f32>, TransformError> {
    if out_width == 0 || out_height == 0 {
        return Err(TransformError::processing(
            ProcessingStage::Warp,
            format!("degenerate output size {out_width}x{out_height}"),
        ));
    }
    let rank = image.ndim();
    let view = as_hwc(image)?;
    let (height, width, channels) = view.dim();
    if height == 0 || width == 0 || channels == 0 {
        return Err(TransformError::invalid_input(
            "cannot warp an empty image".to_string(),
        ));
    }

    let full = Matrix3::new(
        matrix[0], matrix[1], matrix[2], matrix[3], matrix[4], matrix[5], 0.0, 0.0, 1.0,
    );
    let map = if inverse_map {
        full
    } else {
        full.try_inverse().ok_or_else(|| {
            TransformError::processing(
                ProcessingStage::Warp,
                "transformation matrix is singular".to_string(),
            )
        })?
    };

    let src_std = view.as_standard_layout();
    let src = src_std
        .as_slice()
        .expect("standard layout array is contiguous");
    let (w, h) = (width as i64, height as i64);
    let (ow, oh) = (out_width as usize, out_height as usize);
    let nearest = interpolation == Interpolation::Nearest;

    let mut out = vec![0.0f32; oh * ow * channels];
    out.par_chunks_mut(ow * channels)
        .enumerate()
        .for_each(|(dst_y, row)| {
            for dst_x in 0..ow {
                let p = map * Vector3::new(dst_x as f32, dst_y as f32, 1.0);
                let (sx, sy) = (p.x, p.y);
                let pixel = &mut row[dst_x * channels..(dst_x + 1) * channels];
                if nearest {
                    let (xi, yi) = (sx.round() as i64, sy.round() as i64);
                    for (ch, value) in pixel.iter_mut().enumerate() {
                        *value = fetch(src, w, h, channels, xi, yi, ch, border);
                    }
                } else {
                    let (x0, y0) = (sx.floor(), sy.floor());
                    let (dx, dy) = (sx - x0, sy - y0);
                    let (x0, y0) = (x0 as i64, y0 as i64);
                    for (ch, value) in pixel.iter_mut().enumerate() {
                        let p00 = fetch(src, w, h, channels, x0, y0, ch, border);
                        let p10 = fetch(src, w, h, channels, x0 + 1, y0, ch, border);
                        let p01 = fetch(src, w, h, channels, x0, y0 + 1, ch, border);
                        let p11 = fetch(src, w, h, channels, x0 + 1, y0 + 1, ch, border);
                        *value = (1.0 - dx) * (1.0 - dy) * p00
                            + dx * (1.0 - dy) * p10
                            + (1.0 - dx) * dy * p01
                            + dx * dy * p11;
                    }
                }
            }
        });

    let out = ArrayD::from_shape_vec(IxDyn(&[oh, ow, channels]), out)?;
    Ok(if rank == 2 {
        out.index_axis_move(Axis(2), 0)
    } else {
        out
    })
}

/// Builds the 2×3 matrix of a pure translation.
pub fn translation_matrix(x_shift: f32, y_shift: f32) -> [f32; 6] {
    [1.0, 0.0, x_shift, 0.0, 1.0, y_shift]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];

    fn ramp(height: usize, width: usize) -> ArrayD<f32> {
        Array2::from_shape_fn((height, width), |(y, x)| (y * width + x) as f32).into_dyn()
    }

    #[test]
    fn test_identity_warp_is_a_no_op() {
        let image = ramp(5, 7);
        let out = warp_affine(
            image.view(),
            &IDENTITY,
            false,
            7,
            5,
            Interpolation::Bilinear,
            BorderMode::default(),
        )
        .unwrap();
        assert_eq!(out, image);
    }

    #[test]
    fn test_integer_translation_moves_pixels() {
        let image = ramp(4, 4);
        let out = warp_affine(
            image.view(),
            &translation_matrix(1.0, 2.0),
            false,
            4,
            4,
            Interpolation::Nearest,
            BorderMode::Constant(0.0),
        )
        .unwrap();
        // Destination (1, 2) maps back to source (0, 0).
        assert_eq!(out[[2, 1]], image[[0, 0]]);
        // Pixels shifted in from outside take the constant fill.
        assert_eq!(out[[0, 0]], 0.0);
    }

    #[test]
    fn test_inverse_map_undoes_a_translation() {
        let mut image = Array2::<f32>::zeros((8, 8));
        image[[3, 3]] = 7.0;
        image[[4, 2]] = 3.0;
        let image = image.into_dyn();
        let matrix = translation_matrix(2.0, 1.0);
        let shifted = warp_affine(
            image.view(),
            &matrix,
            false,
            8,
            8,
            Interpolation::Nearest,
            BorderMode::Constant(0.0),
        )
        .unwrap();
        let restored = warp_affine(
            shifted.view(),
            &matrix,
            true,
            8,
            8,
            Interpolation::Nearest,
            BorderMode::Constant(0.0),
        )
        .unwrap();
        assert_eq!(restored, image);
    }

    #[test]
    fn test_singular_matrix_is_rejected() {
        let image = ramp(4, 4);
        let singular = [1.0, 1.0, 0.0, 1.0, 1.0, 0.0];
        assert!(
            warp_affine(
                image.view(),
                &singular,
                false,
                4,
                4,
                Interpolation::Bilinear,
                BorderMode::default(),
            )
            .is_err()
        );
    }

    #[test]
    fn test_channels_warp_independently() {
        let image = Array3::from_shape_fn((4, 4, 2), |(y, x, c)| {
            (y * 4 + x) as f32 + c as f32 * 100.0
        })
        .into_dyn();
        let out = warp_affine(
            image.view(),
            &IDENTITY,
            false,
            4,
            4,
            Interpolation::Bilinear,
            BorderMode::default(),
        )
        .unwrap();
        assert_eq!(out, image);
    }
}
