//! Safe bordered cropping.
//!
//! [`safe_crop`] is the one place boundary handling lives: every crop and
//! tile operation delegates here. A requested rectangle may extend outside
//! the image; the image is then padded according to the border policy so the
//! rectangle becomes valid, and the result always has exactly the requested
//! size.

use ndarray::{s, Array3, ArrayD, ArrayView3, ArrayViewD, Axis, Ix3};

use crate::core::errors::{ProcessingStage, TransformError};
use crate::processors::types::BorderMode;

/// Maps a possibly out-of-range index onto a source index according to the
/// border policy. Returns `None` for the constant policy, where out-of-range
/// pixels take the fill value instead of a source pixel.
pub(crate) fn border_index(index: i64, len: i64, mode: BorderMode) -> Option<i64> {
    if (0..len).contains(&index) {
        return Some(index);
    }
    match mode {
        BorderMode::Constant(_) => None,
        BorderMode::Replicate => Some(index.clamp(0, len - 1)),
        BorderMode::Reflect => {
            if len == 1 {
                return Some(0);
            }
            let mut i = index;
            while !(0..len).contains(&i) {
                if i < 0 {
                    i = -i;
                } else {
                    i = 2 * len - 2 - i;
                }
            }
            Some(i)
        }
    }
}

/// Normalizes a rank-2 or rank-3 view to H×W×C.
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

/// Extends an image on all four sides according to the border policy.
///
/// # Arguments
///
/// * `image` - The image to extend, as an H×W×C view.
/// * `top`, `bottom`, `left`, `right` - Padding amounts in pixels.
/// * `mode` - The border policy and fill value.
///
/// # Returns
///
/// The padded image, sized (H + top + bottom) × (W + left + right) × C.
pub fn make_border(
    image: ArrayView3<'_, f32>,
    top: usize,
    bottom: usize,
    left: usize,
    right: usize,
    mode: BorderMode,
) -> Array3<f32> {
    let (height, width, channels) = image.dim();
    let fill = match mode {
        BorderMode::Constant(value) => value,
        _ => 0.0,
    };
    let mut out = Array3::from_elem((height + top + bottom, width + left + right, channels), fill);
    let (h, w) = (height as i64, width as i64);
    for oy in 0..out.dim().0 {
        let sy = match border_index(oy as i64 - top as i64, h, mode) {
            Some(sy) => sy as usize,
            None => continue,
        };
        for ox in 0..out.dim().1 {
            let sx = match border_index(ox as i64 - left as i64, w, mode) {
                Some(sx) => sx as usize,
                None => continue,
            };
            for ch in 0..channels {
                out[[oy, ox, ch]] = image[[sy, sx, ch]];
            }
        }
    }
    out
}

/// Safely crops a region from within an image, padding borders if needed.
///
/// # Arguments
///
/// * `image` - The image to crop, rank 2 or rank 3.
/// * `tl` - The (x, y) coordinates of the top-left crop corner (inclusive);
///   may be negative.
/// * `br` - The (x, y) coordinates of the bottom-right crop corner
///   (exclusive); may exceed the image bounds.
/// * `mode` - The border policy used when the rectangle leaves the image.
///
/// # Returns
///
/// The cropped image, exactly (br.1 − tl.1) × (br.0 − tl.0) in the spatial
/// axes, with the input's rank and channel count preserved.
///
/// # Errors
///
/// Returns an error if the image rank is unsupported or the rectangle is
/// empty.
pub fn safe_crop(
    image: ArrayViewD<'_, f32>,
    tl: (i64, i64),
    br: (i64, i64),
    mode: BorderMode,
) -> Result<ArrayD<f32>, TransformError> {
    let rank = image.ndim();
    let view = as_hwc(image)?;
    if br.0 <= tl.0 || br.1 <= tl.1 {
        return Err(TransformError::processing(
            ProcessingStage::Crop,
            format!("empty crop rectangle (tl=({},{}), br=({},{}))", tl.0, tl.1, br.0, br.1),
        ));
    }
    let (height, width, _) = view.dim();
    let (h, w) = (height as i64, width as i64);

    let (mut x0, mut y0) = tl;
    let (mut x1, mut y1) = br;
    let out3 = if x0 < 0 || y0 < 0 || x1 > w || y1 > h {
        let padded = make_border(
            view,
            (-y0).max(0) as usize,
            (y1 - h).max(0) as usize,
            (-x0).max(0) as usize,
            (x1 - w).max(0) as usize,
            mode,
        );
        if x0 < 0 {
            x1 -= x0;
            x0 = 0;
        }
        if y0 < 0 {
            y1 -= y0;
            y0 = 0;
        }
        padded
            .slice(s![y0 as isize..y1 as isize, x0 as isize..x1 as isize, ..])
            .to_owned()
    } else {
        view.slice(s![y0 as isize..y1 as isize, x0 as isize..x1 as isize, ..])
            .to_owned()
    };

    let out = out3.into_dyn();
    Ok(if rank == 2 {
        out.index_axis_move(Axis(2), 0)
    } else {
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    fn ramp(height: usize, width: usize) -> ArrayD<f32> {
        Array2::from_shape_fn((height, width), |(y, x)| (y * width + x) as f32).into_dyn()
    }

    fn ramp_rgb(height: usize, width: usize) -> ArrayD<f32> {
        Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
            (y * width + x) as f32 * 10.0 + c as f32
        })
        .into_dyn()
    }

    #[test]
    fn test_interior_crop_is_a_plain_slice() {
        let image = ramp_rgb(6, 6);
        let crop = safe_crop(image.view(), (1, 2), (4, 5), BorderMode::default()).unwrap();
        assert_eq!(crop.shape(), &[3, 3, 3]);
        assert_eq!(crop[[0, 0, 0]], image[[2, 1, 0]]);
        assert_eq!(crop[[2, 2, 2]], image[[4, 3, 2]]);
    }

    #[test]
    fn test_oversized_crop_pads_to_exact_size() {
        let image = ramp(4, 4);
        let crop = safe_crop(image.view(), (-2, -2), (6, 6), BorderMode::Constant(9.0)).unwrap();
        assert_eq!(crop.shape(), &[8, 8]);
        assert_eq!(crop[[0, 0]], 9.0);
        assert_eq!(crop[[2, 2]], image[[0, 0]]);
        assert_eq!(crop[[7, 7]], 9.0);
    }

    #[test]
    fn test_replicate_border_repeats_edge_pixels() {
        let image = ramp(3, 3);
        let crop = safe_crop(image.view(), (-1, 0), (3, 3), BorderMode::Replicate).unwrap();
        assert_eq!(crop.shape(), &[3, 4]);
        assert_eq!(crop[[0, 0]], image[[0, 0]]);
        assert_eq!(crop[[2, 0]], image[[2, 0]]);
    }

    #[test]
    fn test_reflect_border_mirrors_without_edge() {
        let image = ramp(1, 4);
        let crop = safe_crop(image.view(), (-2, 0), (4, 1), BorderMode::Reflect).unwrap();
        // Mirror of [0 1 2 3] extended by two on the left: [2 1 | 0 1 2 3].
        assert_eq!(crop.shape(), &[1, 6]);
        assert_eq!(crop[[0, 0]], 2.0);
        assert_eq!(crop[[0, 1]], 1.0);
        assert_eq!(crop[[0, 2]], 0.0);
    }

    #[test]
    fn test_rank_is_preserved() {
        let gray = ramp(5, 5);
        assert_eq!(
            safe_crop(gray.view(), (0, 0), (2, 2), BorderMode::default())
                .unwrap()
                .ndim(),
            2
        );
        let rgb = ramp_rgb(5, 5);
        assert_eq!(
            safe_crop(rgb.view(), (0, 0), (2, 2), BorderMode::default())
                .unwrap()
                .ndim(),
            3
        );
    }

    #[test]
    fn test_empty_rectangle_is_rejected() {
        let image = ramp(4, 4);
        assert!(safe_crop(image.view(), (2, 2), (2, 4), BorderMode::default()).is_err());
    }

    #[test]
    fn test_rank_4_is_rejected() {
        let image = ArrayD::<f32>::zeros(ndarray::IxDyn(&[2, 2, 2, 2]));
        assert!(safe_crop(image.view(), (0, 0), (1, 1), BorderMode::default()).is_err());
    }
}
