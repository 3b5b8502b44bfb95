//! Per-channel affine normalization.
//!
//! Both operations transform samples as `out = (in - a) / b` and invert as
//! `out = in * b + a`, with `(a, b)` being `(mean, std)` or
//! `(min, max - min)`. They operate on any array-like numeric sample, not
//! only images: parameters broadcast over the last axis, and a
//! single-element parameter vector broadcasts as a scalar.

use ndarray::Axis;
use serde::Deserialize;

use crate::core::errors::{ConfigError, TransformError};
use crate::core::sample::{ImageArray, Sample};
use crate::core::traits::{InvertibleTransform, Transform};

/// Validates a `(subtract, divide)` parameter pair.
fn validate_params(name: &str, a: &[f32], b: &[f32]) -> Result<(), ConfigError> {
    if a.is_empty() || b.is_empty() {
        return Err(ConfigError::invalid_normalization(format!(
            "{name} parameters must not be empty"
        )));
    }
    if a.len() != b.len() {
        return Err(ConfigError::invalid_normalization(format!(
            "{name} parameters size mismatch ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    for (index, &divisor) in b.iter().enumerate() {
        if divisor == 0.0 || !divisor.is_finite() {
            return Err(ConfigError::invalid_normalization(format!(
                "{name} divisor at index {index} must be finite and non-zero (got {divisor})"
            )));
        }
    }
    Ok(())
}

/// Applies `(x - a) / b` (forward) or `x * b + a` (invert) with the
/// parameters broadcast over the last axis.
fn affine_channels(
    sample: &ImageArray,
    a: &[f32],
    b: &[f32],
    forward: bool,
) -> Result<ImageArray, TransformError> {
    if sample.ndim() == 0 {
        return Err(TransformError::invalid_input(
            "cannot normalize a zero-rank sample",
        ));
    }
    let last = Axis(sample.ndim() - 1);
    let channels = sample.shape()[sample.ndim() - 1];
    let mut out = sample.to_owned();
    if a.len() == 1 {
        let (a, b) = (a[0], b[0]);
        if forward {
            out.mapv_inplace(|x| (x - a) / b);
        } else {
            out.mapv_inplace(|x| x * b + a);
        }
    } else if a.len() == channels {
        for (channel, (&a, &b)) in a.iter().zip(b.iter()).enumerate() {
            let mut lane = out.index_axis_mut(last, channel);
            if forward {
                lane.mapv_inplace(|x| (x - a) / b);
            } else {
                lane.mapv_inplace(|x| x * b + a);
            }
        }
    } else {
        return Err(TransformError::invalid_input(format!(
            "channel count mismatch: sample has {channels} channels but normalization expects {}",
            a.len()
        )));
    }
    Ok(out.into_shared())
}

/// Normalizes samples with per-channel mean and standard deviation,
/// `s = (s - mean) / std`.
///
/// Inversion reapplies the exact affine inverse, so a round trip is exact
/// within `f32` precision.
#[derive(Debug, Clone)]
pub struct NormalizeZeroMeanUnitVar {
    mean: Vec<f32>,
    std: Vec<f32>,
}

/// Declarative parameters for [`NormalizeZeroMeanUnitVar`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizeZeroMeanUnitVarConfig {
    /// Per-channel mean values to subtract.
    pub mean: Vec<f32>,
    /// Per-channel standard deviations to divide with.
    pub std: Vec<f32>,
}

impl NormalizeZeroMeanUnitVar {
    /// Validates and initializes normalization parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter vectors are empty, mismatched in
    /// length, or contain a zero or non-finite standard deviation.
    pub fn new(mean: Vec<f32>, std: Vec<f32>) -> Result<Self, ConfigError> {
        validate_params("mean/std", &mean, &std)?;
        Ok(Self { mean, std })
    }

    /// Normalizes a single array sample.
    pub fn normalize(&self, sample: &ImageArray) -> Result<ImageArray, TransformError> {
        affine_channels(sample, &self.mean, &self.std, true)
    }

    /// Reverses the normalization on a single array sample.
    pub fn denormalize(&self, sample: &ImageArray) -> Result<ImageArray, TransformError> {
        affine_channels(sample, &self.mean, &self.std, false)
    }
}

impl TryFrom<NormalizeZeroMeanUnitVarConfig> for NormalizeZeroMeanUnitVar {
    type Error = ConfigError;

    fn try_from(config: NormalizeZeroMeanUnitVarConfig) -> Result<Self, Self::Error> {
        NormalizeZeroMeanUnitVar::new(config.mean, config.std)
    }
}

impl Transform for NormalizeZeroMeanUnitVar {
    fn name(&self) -> &'static str {
        "NormalizeZeroMeanUnitVar"
    }

    fn apply(&self, sample: Sample) -> Result<Sample, TransformError> {
        let array = sample.into_single_array(self.name())?;
        Ok(Sample::from_array(self.normalize(&array)?))
    }

    fn as_invertible(&self) -> Option<&dyn InvertibleTransform> {
        Some(self)
    }
}

impl InvertibleTransform for NormalizeZeroMeanUnitVar {
    fn invert(&self, sample: Sample) -> Result<Sample, TransformError> {
        let array = sample.into_single_array(self.name())?;
        Ok(Sample::from_array(self.denormalize(&array)?))
    }
}

/// Normalizes samples with per-channel minimum and maximum values,
/// `s = (s - min) / (max - min)`.
#[derive(Debug, Clone)]
pub struct NormalizeMinMax {
    min: Vec<f32>,
    diff: Vec<f32>,
}

/// Declarative parameters for [`NormalizeMinMax`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizeMinMaxConfig {
    /// Per-channel minimum values (a scalar is promoted to one channel).
    pub min: ScalarOrVec,
    /// Per-channel maximum values (a scalar is promoted to one channel).
    pub max: ScalarOrVec,
}

/// A scalar or a vector of per-channel values.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScalarOrVec {
    /// A vector of per-channel values.
    Vec(Vec<f32>),
    /// A single value promoted to a one-element vector.
    Scalar(f32),
}

impl From<ScalarOrVec> for Vec<f32> {
    fn from(value: ScalarOrVec) -> Self {
        match value {
            ScalarOrVec::Vec(v) => v,
            ScalarOrVec::Scalar(s) => vec![s],
        }
    }
}

impl NormalizeMinMax {
    /// Validates and initializes normalization parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter vectors are empty, mismatched in
    /// length, or any `max - min` difference is zero or non-finite.
    pub fn new(min: Vec<f32>, max: Vec<f32>) -> Result<Self, ConfigError> {
        if min.len() != max.len() {
            return Err(ConfigError::invalid_normalization(format!(
                "min/max parameters size mismatch ({} vs {})",
                min.len(),
                max.len()
            )));
        }
        let diff: Vec<f32> = max.iter().zip(min.iter()).map(|(hi, lo)| hi - lo).collect();
        validate_params("min/max", &min, &diff)?;
        Ok(Self { min, diff })
    }

    /// Normalizes a single array sample.
    pub fn normalize(&self, sample: &ImageArray) -> Result<ImageArray, TransformError> {
        affine_channels(sample, &self.min, &self.diff, true)
    }

    /// Reverses the normalization on a single array sample.
    pub fn denormalize(&self, sample: &ImageArray) -> Result<ImageArray, TransformError> {
        affine_channels(sample, &self.min, &self.diff, false)
    }
}

impl TryFrom<NormalizeMinMaxConfig> for NormalizeMinMax {
    type Error = ConfigError;

    fn try_from(config: NormalizeMinMaxConfig) -> Result<Self, Self::Error> {
        NormalizeMinMax::new(config.min.into(), config.max.into())
    }
}

impl Transform for NormalizeMinMax {
    fn name(&self) -> &'static str {
        "NormalizeMinMax"
    }

    fn apply(&self, sample: Sample) -> Result<Sample, TransformError> {
        let array = sample.into_single_array(self.name())?;
        Ok(Sample::from_array(self.normalize(&array)?))
    }

    fn as_invertible(&self) -> Option<&dyn InvertibleTransform> {
        Some(self)
    }
}

impl InvertibleTransform for NormalizeMinMax {
    fn invert(&self, sample: Sample) -> Result<Sample, TransformError> {
        let array = sample.into_single_array(self.name())?;
        Ok(Sample::from_array(self.denormalize(&array)?))
    }
}
