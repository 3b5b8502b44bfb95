//! Affine warps and random translation.

use rand::Rng;
use serde::Deserialize;

use crate::core::errors::{ConfigError, TransformError};
use crate::core::sample::{ImageArray, Sample};
use crate::core::traits::{InvertibleTransform, Transform};
use crate::processors::types::{AxisPair, BorderMode, Interpolation};
use crate::utils::warp::{translation_matrix, warp_affine};

/// Warps an image with a fixed 2×3 affine matrix.
///
/// The output size defaults to the input size, resolved per call; an
/// explicit `out_size` fixes it instead. Inversion reapplies the warp with
/// the matrix used directly as the destination-to-source map, and is only
/// available when `out_size` is unset: with a fixed output size the original
/// image size is unknown (and content may have been cropped away), so invert
/// fails.
#[derive(Debug, Clone)]
pub struct Affine {
    matrix: [f32; 6],
    out_size: Option<(u32, u32)>,
    interpolation: Interpolation,
    border: BorderMode,
}

/// Declarative parameters for [`Affine`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AffineConfig {
    /// The 2×3 transformation matrix, row-major, as 6 elements.
    pub transf: Vec<f32>,
    /// Optional fixed output size (width, height).
    #[serde(default)]
    pub out_size: Option<(u32, u32)>,
    /// Interpolation kernel.
    #[serde(default)]
    pub interpolation: Interpolation,
    /// Border policy for samples mapped outside the source.
    #[serde(default)]
    pub border: BorderMode,
}

impl Affine {
    /// Validates and initializes affine warp parameters.
    ///
    /// # Arguments
    ///
    /// * `matrix` - The 2×3 transformation matrix in row-major order.
    /// * `out_size` - Optional fixed output size (width, height); `None`
    ///   means "same as the input", resolved per call.
    /// * `interpolation` - Sampling kernel.
    /// * `border` - Border policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix contains non-finite values or the
    /// output size has a zero component.
    pub fn new(
        matrix: [f32; 6],
        out_size: Option<(u32, u32)>,
        interpolation: Interpolation,
        border: BorderMode,
    ) -> Result<Self, ConfigError> {
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::InvalidMatrix {
                message: format!("matrix elements must be finite (got {matrix:?})"),
            });
        }
        if let Some((w, h)) = out_size {
            if w == 0 || h == 0 {
                return Err(ConfigError::invalid_size(format!(
                    "output size components must be positive (got {w}x{h})"
                )));
            }
        }
        Ok(Self {
            matrix,
            out_size,
            interpolation,
            border,
        })
    }

    /// Warps a single image with the configured matrix.
    pub fn warp(&self, image: &ImageArray) -> Result<ImageArray, TransformError> {
        let (out_w, out_h) = self.output_size(image)?;
        Ok(
            warp_affine(image.view(), &self.matrix, false, out_w, out_h, self.interpolation, self.border)?
                .into_shared(),
        )
    }

    fn output_size(&self, image: &ImageArray) -> Result<(u32, u32), TransformError> {
        let ndim = image.ndim();
        if !(2..=3).contains(&ndim) {
            return Err(TransformError::invalid_input(format!(
                "bad input dimensions; must be 2-d, or 3-d (with channels), got rank {ndim}"
            )));
        }
        Ok(match self.out_size {
            Some(size) => size,
            None => (image.shape()[1] as u32, image.shape()[0] as u32),
        })
    }
}

impl TryFrom<AffineConfig> for Affine {
    type Error = ConfigError;

    fn try_from(config: AffineConfig) -> Result<Self, Self::Error> {
        let matrix: [f32; 6] = config.transf.as_slice().try_into().map_err(|_| {
            ConfigError::InvalidMatrix {
                message: format!(
                    "transformation matrix must be 6 elements (2x3), got {}",
                    config.transf.len()
                ),
            }
        })?;
        Affine::new(matrix, config.out_size, config.interpolation, config.border)
    }
}

impl Transform for Affine {
    fn name(&self) -> &'static str {
        "Affine"
    }

    fn apply(&self, sample: Sample) -> Result<Sample, TransformError> {
        let image = sample.into_single_array(self.name())?;
        Ok(Sample::from_array(self.warp(&image)?))
    }

    fn as_invertible(&self) -> Option<&dyn InvertibleTransform> {
        // Invertibility is a static property of the configuration: with a
        // fixed output size the original size is unknown.
        if self.out_size.is_none() {
            Some(self)
        } else {
            None
        }
    }
}

impl InvertibleTransform for Affine {
    fn invert(&self, sample: Sample) -> Result<Sample, TransformError> {
        if self.out_size.is_some() {
            return Err(TransformError::not_invertible(
                self.name(),
                "unknown original image size (explicit output size was configured)",
            ));
        }
        let image = sample.into_single_array(self.name())?;
        let (out_w, out_h) = self.output_size(&image)?;
        let restored = warp_affine(
            image.view(),
            &self.matrix,
            true,
            out_w,
            out_h,
            self.interpolation,
            self.border,
        )?;
        Ok(Sample::from_array(restored.into_shared()))
    }
}

/// Randomly translates an image within a configured per-axis range.
///
/// The x and y shifts are sampled uniformly and independently from
/// `[min, max]` per axis and applied through an affine translation warp, so
/// the output size always equals the input size. A probability gate may skip
/// the operation entirely.
///
/// This operation is stochastic and cannot be inverted.
#[derive(Debug, Clone)]
pub struct RandomShift {
    min: AxisPair,
    max: AxisPair,
    probability: f64,
    interpolation: Interpolation,
    border: BorderMode,
}

/// Declarative parameters for [`RandomShift`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomShiftConfig {
    /// Minimum pixel shift per axis (scalar or `[x, y]`).
    pub min: AxisPair,
    /// Maximum pixel shift per axis (scalar or `[x, y]`).
    pub max: AxisPair,
    /// Probability that the operation is applied.
    #[serde(default = "default_probability")]
    pub probability: f64,
    /// Interpolation kernel.
    #[serde(default)]
    pub interpolation: Interpolation,
    /// Border policy for pixels shifted in from outside.
    #[serde(default)]
    pub border: BorderMode,
}

fn default_probability() -> f64 {
    1.0
}

impl RandomShift {
    /// Validates and initializes shift parameters.
    ///
    /// # Arguments
    ///
    /// * `min`, `max` - Per-axis shift bounds in pixels; `max` must not be
    ///   smaller than `min` on either axis.
    /// * `probability` - Probability that the operation is applied.
    /// * `interpolation` - Sampling kernel.
    /// * `border` - Border policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the bounds are inverted or the probability is out
    /// of range.
    pub fn new(
        min: AxisPair,
        max: AxisPair,
        probability: f64,
        interpolation: Interpolation,
        border: BorderMode,
    ) -> Result<Self, ConfigError> {
        if max.x < min.x || max.y < min.y {
            return Err(ConfigError::invalid_range(format!(
                "shift bounds must satisfy min <= max per axis (got min={min:?}, max={max:?})"
            )));
        }
        if !(0.0..=1.0).contains(&probability) {
            return Err(ConfigError::InvalidProbability { value: probability });
        }
        Ok(Self {
            min,
            max,
            probability,
            interpolation,
            border,
        })
    }

    /// Translates a single image by a freshly sampled shift.
    pub fn shift(&self, image: &ImageArray) -> Result<ImageArray, TransformError> {
        let ndim = image.ndim();
        if !(2..=3).contains(&ndim) {
            return Err(TransformError::invalid_input(format!(
                "bad input dimensions; must be 2-d, or 3-d (with channels), got rank {ndim}"
            )));
        }
        let mut rng = rand::rng();
        if self.probability < 1.0 && rng.random_range(0.0..1.0) > self.probability {
            return Ok(image.clone());
        }
        let x_shift = rng.random_range(self.min.x..=self.max.x) as f32;
        let y_shift = rng.random_range(self.min.y..=self.max.y) as f32;
        let (height, width) = (image.shape()[0] as u32, image.shape()[1] as u32);
        Ok(warp_affine(
            image.view(),
            &translation_matrix(x_shift, y_shift),
            false,
            width,
            height,
            self.interpolation,
            self.border,
        )?
        .into_shared())
    }
}

impl TryFrom<RandomShiftConfig> for RandomShift {
    type Error = ConfigError;

    fn try_from(config: RandomShiftConfig) -> Result<Self, Self::Error> {
        RandomShift::new(
            config.min,
            config.max,
            config.probability,
            config.interpolation,
            config.border,
        )
    }
}

impl Transform for RandomShift {
    fn name(&self) -> &'static str {
        "RandomShift"
    }

    fn apply(&self, sample: Sample) -> Result<Sample, TransformError> {
        let image = sample.into_single_array(self.name())?;
        Ok(Sample::from_array(self.shift(&image)?))
    }
}
