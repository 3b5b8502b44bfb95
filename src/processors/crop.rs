//! Center cropping.

use serde::{Deserialize, Serialize};

use crate::core::errors::{ConfigError, ProcessingStage, TransformError};
use crate::core::sample::{ImageArray, Sample};
use crate::core::traits::Transform;
use crate::processors::types::{BorderMode, SizeSpec};
use crate::utils::crop::safe_crop;

/// Extracts a centered crop of a configured size from an image.
///
/// The size is either absolute pixels or a fraction of the image, resolved
/// per sample. When the image is smaller than the requested crop, the crop
/// window extends past the image and the border policy fills the missing
/// pixels, so the output always has exactly the requested size.
///
/// This operation is deterministic but discards the pixels outside the
/// window, so it cannot be inverted.
#[derive(Debug, Clone)]
pub struct CenterCrop {
    size: SizeSpec,
    border: BorderMode,
}

/// Declarative parameters for [`CenterCrop`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CenterCropConfig {
    /// Target crop size (width, height), absolute or relative.
    pub size: SizeSpec,
    /// Border policy used when the image is too small for the crop.
    #[serde(default)]
    pub border: BorderMode,
}

impl CenterCrop {
    /// Validates and initializes center crop parameters.
    ///
    /// # Arguments
    ///
    /// * `size` - Target crop size (width, height); absolute components must
    ///   be positive, relative components must lie in (0, 1].
    /// * `border` - Border policy used when the image is too small for the
    ///   required crop size.
    ///
    /// # Errors
    ///
    /// Returns an error if the size parameters are malformed.
    pub fn new(size: SizeSpec, border: BorderMode) -> Result<Self, ConfigError> {
        size.validate()?;
        Ok(Self { size, border })
    }

    /// Extracts the centered crop from a single image.
    pub fn crop(&self, image: &ImageArray) -> Result<ImageArray, TransformError> {
        let ndim = image.ndim();
        if !(2..=3).contains(&ndim) {
            return Err(TransformError::invalid_input(format!(
                "bad input dimensions; must be 2-d, or 3-d (with channels), got rank {ndim}"
            )));
        }
        let (height, width) = (image.shape()[0], image.shape()[1]);
        let (crop_width, crop_height) = self.size.resolve(width, height);
        if crop_width < 1 || crop_height < 1 {
            return Err(TransformError::processing(
                ProcessingStage::Crop,
                format!("relative crop size rounds to zero on a {width}x{height} image"),
            ));
        }
        let tl = (
            width as i64 / 2 - crop_width / 2,
            height as i64 / 2 - crop_height / 2,
        );
        let br = (tl.0 + crop_width, tl.1 + crop_height);
        Ok(safe_crop(image.view(), tl, br, self.border)?.into_shared())
    }
}

impl TryFrom<CenterCropConfig> for CenterCrop {
    type Error = ConfigError;

    fn try_from(config: CenterCropConfig) -> Result<Self, Self::Error> {
        CenterCrop::new(config.size, config.border)
    }
}

impl Transform for CenterCrop {
    fn name(&self) -> &'static str {
        "CenterCrop"
    }

    fn apply(&self, sample: Sample) -> Result<Sample, TransformError> {
        let image = sample.into_single_array(self.name())?;
        Ok(Sample::from_array(self.crop(&image)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3, ArrayD, IxDyn};

    fn rgb(height: usize, width: usize) -> ImageArray {
        Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
            (y * width + x) as f32 + c as f32 * 0.1
        })
        .into_dyn()
        .into_shared()
    }

    #[test]
    fn test_absolute_crop_shape() {
        let crop = CenterCrop::new(SizeSpec::Abs(4, 4), BorderMode::default()).unwrap();
        let out = crop.crop(&rgb(10, 10)).unwrap();
        assert_eq!(out.shape(), &[4, 4, 3]);
    }

    #[test]
    fn test_crop_is_centered() {
        let image = rgb(6, 6);
        let crop = CenterCrop::new(SizeSpec::Abs(2, 2), BorderMode::default()).unwrap();
        let out = crop.crop(&image).unwrap();
        assert_eq!(out[[0, 0, 0]], image[[2, 2, 0]]);
        assert_eq!(out[[1, 1, 0]], image[[3, 3, 0]]);
    }

    #[test]
    fn test_relative_crop_resolves_against_image() {
        let crop = CenterCrop::new(SizeSpec::Rel(0.5, 0.5), BorderMode::default()).unwrap();
        let out = crop.crop(&rgb(8, 12)).unwrap();
        assert_eq!(out.shape(), &[4, 6, 3]);
    }

    #[test]
    fn test_small_image_is_padded_to_crop_size() {
        let crop = CenterCrop::new(SizeSpec::Abs(6, 6), BorderMode::Constant(5.0)).unwrap();
        let out = crop.crop(&rgb(4, 4)).unwrap();
        assert_eq!(out.shape(), &[6, 6, 3]);
        assert_eq!(out[[0, 0, 0]], 5.0);
    }

    #[test]
    fn test_rank_2_input() {
        let image = Array2::<f32>::zeros((10, 10)).into_dyn().into_shared();
        let crop = CenterCrop::new(SizeSpec::Abs(4, 4), BorderMode::default()).unwrap();
        assert_eq!(crop.crop(&image).unwrap().shape(), &[4, 4]);
    }

    #[test]
    fn test_rejects_invalid_size() {
        assert!(CenterCrop::new(SizeSpec::Abs(0, 4), BorderMode::default()).is_err());
        assert!(CenterCrop::new(SizeSpec::Rel(1.5, 0.5), BorderMode::default()).is_err());
    }

    #[test]
    fn test_not_invertible() {
        let crop = CenterCrop::new(SizeSpec::Abs(4, 4), BorderMode::default()).unwrap();
        assert!(Transform::as_invertible(&crop).is_none());
    }

    #[test]
    fn test_rank_4_rejected() {
        let image = ArrayD::<f32>::zeros(IxDyn(&[2, 2, 2, 2])).into_shared();
        let crop = CenterCrop::new(SizeSpec::Abs(2, 2), BorderMode::default()).unwrap();
        assert!(crop.crop(&image).is_err());
    }
}
