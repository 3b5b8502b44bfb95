//! Axis permutation.

use ndarray::IxDyn;
use serde::Deserialize;

use crate::core::errors::{ConfigError, TransformError};
use crate::core::sample::{ImageArray, Sample};
use crate::core::traits::{InvertibleTransform, Transform};

/// Permutes the axes of an array.
///
/// The inverse permutation is computed at construction time, so applying
/// invert after apply is the identity on axis order. This is the only
/// geometric operation that is always exactly invertible.
#[derive(Debug, Clone)]
pub struct Transpose {
    axes: Vec<usize>,
    axes_inv: Vec<usize>,
}

/// Declarative parameters for [`Transpose`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransposeConfig {
    /// The axis permutation to apply.
    pub axes: Vec<usize>,
}

impl Transpose {
    /// Validates and initializes transpose parameters.
    ///
    /// # Arguments
    ///
    /// * `axes` - The axis permutation; must be a permutation of
    ///   `0..axes.len()`.
    ///
    /// # Errors
    ///
    /// Returns an error if `axes` is empty, contains an out-of-bounds index
    /// or repeats an index.
    pub fn new(axes: Vec<usize>) -> Result<Self, ConfigError> {
        if axes.is_empty() {
            return Err(ConfigError::invalid_config("axes must not be empty"));
        }
        let mut axes_inv = vec![usize::MAX; axes.len()];
        for (position, &axis) in axes.iter().enumerate() {
            if axis >= axes.len() {
                return Err(ConfigError::invalid_config(format!(
                    "axis {axis} out of bounds for a {}-axis permutation",
                    axes.len()
                )));
            }
            if axes_inv[axis] != usize::MAX {
                return Err(ConfigError::invalid_config(format!(
                    "axis {axis} appears more than once"
                )));
            }
            axes_inv[axis] = position;
        }
        Ok(Self { axes, axes_inv })
    }

    fn permute(&self, image: ImageArray, axes: &[usize]) -> Result<ImageArray, TransformError> {
        if image.ndim() != axes.len() {
            return Err(TransformError::invalid_input(format!(
                "sample rank {} does not match the {}-axis permutation",
                image.ndim(),
                axes.len()
            )));
        }
        Ok(image.permuted_axes(IxDyn(axes)))
    }
}

impl TryFrom<TransposeConfig> for Transpose {
    type Error = ConfigError;

    fn try_from(config: TransposeConfig) -> Result<Self, Self::Error> {
        Transpose::new(config.axes)
    }
}

impl Transform for Transpose {
    fn name(&self) -> &'static str {
        "Transpose"
    }

    fn apply(&self, sample: Sample) -> Result<Sample, TransformError> {
        let image = sample.into_single_array(self.name())?;
        Ok(Sample::from_array(self.permute(image, &self.axes)?))
    }

    fn as_invertible(&self) -> Option<&dyn InvertibleTransform> {
        Some(self)
    }
}

impl InvertibleTransform for Transpose {
    fn invert(&self, sample: Sample) -> Result<Sample, TransformError> {
        let image = sample.into_single_array(self.name())?;
        Ok(Sample::from_array(self.permute(image, &self.axes_inv)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn rgb(height: usize, width: usize) -> ImageArray {
        Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
            (y * 100 + x * 10 + c) as f32
        })
        .into_dyn()
        .into_shared()
    }

    #[test]
    fn test_hwc_to_chw() {
        let transpose = Transpose::new(vec![2, 0, 1]).unwrap();
        let out = transpose
            .apply(Sample::from_array(rgb(4, 6)))
            .unwrap()
            .into_single_array("test")
            .unwrap();
        assert_eq!(out.shape(), &[3, 4, 6]);
        assert_eq!(out[[1, 2, 3]], rgb(4, 6)[[2, 3, 1]]);
    }

    #[test]
    fn test_invert_after_apply_is_identity() {
        let image = rgb(5, 7);
        let transpose = Transpose::new(vec![1, 0, 2]).unwrap();
        let swapped = transpose.apply(Sample::from_array(image.clone())).unwrap();
        let restored = transpose
            .invert(swapped)
            .unwrap()
            .into_single_array("test")
            .unwrap();
        assert_eq!(restored, image);
    }

    #[test]
    fn test_rank_mismatch_is_rejected() {
        let transpose = Transpose::new(vec![1, 0]).unwrap();
        assert!(transpose.apply(Sample::from_array(rgb(4, 4))).is_err());
    }

    #[test]
    fn test_construction_rejects_bad_permutations() {
        assert!(Transpose::new(vec![]).is_err());
        assert!(Transpose::new(vec![0, 2]).is_err());
        assert!(Transpose::new(vec![0, 0, 1]).is_err());
    }
}
