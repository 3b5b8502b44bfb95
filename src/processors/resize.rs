//! Deterministic resizing.

use std::sync::Mutex;

use serde::Deserialize;

use crate::core::errors::{ConfigError, ProcessingStage, TransformError};
use crate::core::sample::{ImageArray, Sample};
use crate::core::traits::Transform;
use crate::processors::types::Interpolation;
use crate::utils::resize::resize_array;

/// Resizes an image to an absolute destination size or by scale factors.
///
/// The destination is either `dsize` (both components positive, scale
/// factors ignored) or, when `dsize` is zero, the input size scaled by
/// `(fx, fy)`. Images with more than 4 channels are resized per channel
/// group and restacked. The output is always rank 3; a rank-2 result is
/// normalized to H×W×1.
///
/// The optional buffered mode keeps the interleaving staging allocation
/// inside the operation to avoid repeated allocation. A buffered instance
/// must be treated as exclusively owned by a single worker: concurrent
/// callers serialize on the internal lock and defeat the optimization.
/// Disable buffering when one pipeline instance is shared across workers.
///
/// Inversion is unavailable: the original size is not known from the output.
#[derive(Debug)]
pub struct Resize {
    dsize: (u32, u32),
    fx: f64,
    fy: f64,
    interpolation: Interpolation,
    buffer: bool,
    staging: Mutex<Vec<f32>>,
}

/// Declarative parameters for [`Resize`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResizeConfig {
    /// Destination size (width, height); zero means "use scale factors".
    #[serde(default)]
    pub dsize: (u32, u32),
    /// Horizontal scale factor; zero means ignored.
    #[serde(default)]
    pub fx: f64,
    /// Vertical scale factor; zero means ignored.
    #[serde(default)]
    pub fy: f64,
    /// Interpolation kernel.
    #[serde(default)]
    pub interpolation: Interpolation,
    /// Whether to keep a staging buffer inside the operation.
    #[serde(default)]
    pub buffer: bool,
}

impl Resize {
    /// Validates and initializes resize parameters.
    ///
    /// # Arguments
    ///
    /// * `dsize` - Destination size (width, height). Both components must be
    ///   positive, or both zero to resolve the size from the scale factors.
    /// * `fx`, `fy` - Scale factors; must both be positive when `dsize` is
    ///   zero, and are ignored otherwise.
    /// * `interpolation` - Resampling kernel.
    /// * `buffer` - Keep a staging buffer inside the operation (see the type
    ///   documentation for the ownership contract).
    ///
    /// # Errors
    ///
    /// Returns an error if neither a destination size nor a usable pair of
    /// scale factors is given.
    pub fn new(
        dsize: (u32, u32),
        fx: f64,
        fy: f64,
        interpolation: Interpolation,
        buffer: bool,
    ) -> Result<Self, ConfigError> {
        if fx < 0.0 || fy < 0.0 {
            return Err(ConfigError::invalid_range(format!(
                "scale factors should be zero (ignored) or positive (got fx={fx}, fy={fy})"
            )));
        }
        match dsize {
            (0, 0) => {
                if fx == 0.0 || fy == 0.0 {
                    return Err(ConfigError::invalid_config(
                        "need to specify either a destination size or both scale factors",
                    ));
                }
            }
            (w, h) if w == 0 || h == 0 => {
                return Err(ConfigError::invalid_size(format!(
                    "destination size components must both be positive or both zero (got {w}x{h})"
                )));
            }
            _ => {}
        }
        Ok(Self {
            dsize,
            fx,
            fy,
            interpolation,
            buffer,
            staging: Mutex::new(Vec::new()),
        })
    }

    /// Returns a resized copy of a single image, rank-normalized to H×W×C.
    pub fn resize(&self, image: &ImageArray) -> Result<ImageArray, TransformError> {
        let ndim = image.ndim();
        if !(2..=3).contains(&ndim) {
            return Err(TransformError::invalid_input(format!(
                "bad input dimensions; must be 2-d, or 3-d (with channels), got rank {ndim}"
            )));
        }
        let (height, width) = (image.shape()[0], image.shape()[1]);
        let (dst_w, dst_h) = if self.dsize != (0, 0) {
            self.dsize
        } else {
            let w = (width as f64 * self.fx).round() as i64;
            let h = (height as f64 * self.fy).round() as i64;
            if w < 1 || h < 1 {
                return Err(TransformError::processing(
                    ProcessingStage::Resize,
                    format!("scale factors produce a degenerate size ({w}x{h})"),
                ));
            }
            (w as u32, h as u32)
        };

        let resized = if self.buffer {
            let mut staging = self
                .staging
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            resize_array(
                image.view(),
                dst_w,
                dst_h,
                self.interpolation,
                Some(&mut staging),
            )?
        } else {
            resize_array(image.view(), dst_w, dst_h, self.interpolation, None)?
        };

        Ok(if resized.ndim() == 2 {
            resized.insert_axis(ndarray::Axis(2)).into_shared()
        } else {
            resized.into_shared()
        })
    }
}

impl TryFrom<ResizeConfig> for Resize {
    type Error = ConfigError;

    fn try_from(config: ResizeConfig) -> Result<Self, Self::Error> {
        Resize::new(
            config.dsize,
            config.fx,
            config.fy,
            config.interpolation,
            config.buffer,
        )
    }
}

impl Transform for Resize {
    fn name(&self) -> &'static str {
        "Resize"
    }

    fn apply(&self, sample: Sample) -> Result<Sample, TransformError> {
        let image = sample.into_single_array(self.name())?;
        Ok(Sample::from_array(self.resize(&image)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    fn rgb(height: usize, width: usize) -> ImageArray {
        Array3::from_shape_fn((height, width, 3), |(y, x, _)| (y * width + x) as f32)
            .into_dyn()
            .into_shared()
    }

    #[test]
    fn test_absolute_destination_size() {
        let resize = Resize::new((6, 4), 0.0, 0.0, Interpolation::Bilinear, false).unwrap();
        let out = resize.resize(&rgb(8, 8)).unwrap();
        assert_eq!(out.shape(), &[4, 6, 3]);
    }

    #[test]
    fn test_scale_factor_destination_size() {
        let resize = Resize::new((0, 0), 0.5, 2.0, Interpolation::Nearest, false).unwrap();
        let out = resize.resize(&rgb(4, 8)).unwrap();
        assert_eq!(out.shape(), &[8, 4, 3]);
    }

    #[test]
    fn test_rank_2_input_is_normalized_to_hwc() {
        let image = Array2::<f32>::zeros((8, 8)).into_dyn().into_shared();
        let resize = Resize::new((4, 4), 0.0, 0.0, Interpolation::Bilinear, false).unwrap();
        let out = resize.resize(&image).unwrap();
        assert_eq!(out.shape(), &[4, 4, 1]);
    }

    #[test]
    fn test_six_channel_image_is_resized_per_group() {
        let image = Array3::from_shape_fn((8, 8, 6), |(_, _, c)| c as f32)
            .into_dyn()
            .into_shared();
        let resize = Resize::new((4, 4), 0.0, 0.0, Interpolation::Bilinear, false).unwrap();
        let out = resize.resize(&image).unwrap();
        assert_eq!(out.shape(), &[4, 4, 6]);
        for c in 0..6 {
            assert!((out[[2, 2, c]] - c as f32).abs() < 1e-4);
        }
    }

    #[test]
    fn test_buffered_mode_matches_unbuffered() {
        let image = rgb(8, 8);
        let plain = Resize::new((4, 4), 0.0, 0.0, Interpolation::Bilinear, false).unwrap();
        let buffered = Resize::new((4, 4), 0.0, 0.0, Interpolation::Bilinear, true).unwrap();
        let a = plain.resize(&image).unwrap();
        let b = buffered.resize(&image).unwrap();
        let c = buffered.resize(&image).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_construction_validation() {
        assert!(Resize::new((0, 0), 0.0, 0.0, Interpolation::Bilinear, false).is_err());
        assert!(Resize::new((0, 4), 0.0, 0.0, Interpolation::Bilinear, false).is_err());
        assert!(Resize::new((0, 0), 0.5, 0.0, Interpolation::Bilinear, false).is_err());
        assert!(Resize::new((4, 4), -1.0, 0.0, Interpolation::Bilinear, false).is_err());
        assert!(Resize::new((0, 0), 0.5, 0.5, Interpolation::Bilinear, false).is_ok());
    }

    #[test]
    fn test_not_invertible() {
        let resize = Resize::new((4, 4), 0.0, 0.0, Interpolation::Bilinear, false).unwrap();
        assert!(Transform::as_invertible(&resize).is_none());
    }
}
