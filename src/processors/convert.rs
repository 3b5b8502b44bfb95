//! Representation conversion.

use serde::Deserialize;

use crate::core::errors::{ConfigError, TransformError};
use crate::core::sample::{ImageArray, ImageData, Sample};
use crate::core::traits::Transform;

/// Converts a sample into the numeric array representation.
///
/// Image objects are decoded into `f32` arrays; array samples pass through.
/// The channel order of rank-3 outputs can optionally be reversed (RGB to
/// BGR) for consumers that expect the reversed convention.
///
/// Inversion is unavailable: the original representation is not recorded.
#[derive(Debug, Clone)]
pub struct ToArray {
    reorder_bgr: bool,
}

/// Declarative parameters for [`ToArray`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToArrayConfig {
    /// Reverse the channel order of rank-3 outputs.
    #[serde(default)]
    pub reorder_bgr: bool,
}

impl ToArray {
    /// Initializes the conversion parameters.
    pub fn new(reorder_bgr: bool) -> Self {
        Self { reorder_bgr }
    }

    fn convert(&self, image: ImageData) -> Result<ImageArray, TransformError> {
        let array = image.into_array();
        if self.reorder_bgr && array.ndim() == 3 {
            let mut reversed = array.to_owned();
            reversed.invert_axis(ndarray::Axis(2));
            Ok(reversed.into_shared())
        } else {
            Ok(array)
        }
    }
}

impl TryFrom<ToArrayConfig> for ToArray {
    type Error = ConfigError;

    fn try_from(config: ToArrayConfig) -> Result<Self, Self::Error> {
        Ok(ToArray::new(config.reorder_bgr))
    }
}

impl Transform for ToArray {
    fn name(&self) -> &'static str {
        "ToArray"
    }

    fn apply(&self, sample: Sample) -> Result<Sample, TransformError> {
        let (images, was_list) = sample.into_parts();
        let converted = images
            .into_iter()
            .map(|image| self.convert(image).map(ImageData::Array))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Sample::from_parts(converted, was_list))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use ndarray::Array3;

    #[test]
    fn test_image_object_becomes_array() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([1, 2, 3]));
        img.put_pixel(1, 0, Rgb([4, 5, 6]));
        let sample = Sample::Single(ImageData::Image(DynamicImage::ImageRgb8(img)));
        let out = ToArray::new(false)
            .apply(sample)
            .unwrap()
            .into_single_array("test")
            .unwrap();
        assert_eq!(out.shape(), &[1, 2, 3]);
        assert_eq!(out[[0, 1, 0]], 4.0);
    }

    #[test]
    fn test_bgr_reorder_reverses_channels() {
        let array = Array3::from_shape_vec((1, 1, 3), vec![10.0, 20.0, 30.0])
            .unwrap()
            .into_dyn()
            .into_shared();
        let out = ToArray::new(true)
            .apply(Sample::from_array(array))
            .unwrap()
            .into_single_array("test")
            .unwrap();
        assert_eq!(out[[0, 0, 0]], 30.0);
        assert_eq!(out[[0, 0, 2]], 10.0);
    }

    #[test]
    fn test_not_invertible() {
        assert!(ToArray::new(false).as_invertible().is_none());
    }
}
