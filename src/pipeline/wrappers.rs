//! Wrappers adapting per-image operations and external probabilistic
//! engines to the pipeline's calling convention.

use std::fmt::Debug;

use image::DynamicImage;
use rand::Rng;

use crate::core::errors::{ConfigError, TransformError};
use crate::core::sample::{ImageData, Sample};
use crate::core::traits::Transform;
use crate::utils::image::dynamic_to_array;

/// Lifts a single-image operation over lists of images.
///
/// One random draw per invocation decides, for the entire list, whether the
/// wrapped operation is applied to every image or to none; it is never
/// applied partially. With `force_convert`, array images are converted to
/// the image-object representation around each per-image call and back,
/// for wrapped operations that expect conventional 8-bit images.
///
/// The shared gate's outcome is not recorded, so the wrapper cannot be
/// inverted.
#[derive(Debug)]
pub struct ImageTransformWrapper {
    operation: Box<dyn Transform>,
    probability: f64,
    force_convert: bool,
}

impl ImageTransformWrapper {
    /// Validates and initializes the wrapper.
    ///
    /// # Arguments
    ///
    /// * `operation` - The wrapped per-image operation.
    /// * `probability` - Probability that the wrapped operation is applied,
    ///   shared by every image of a list.
    /// * `force_convert` - Convert array images to the image-object
    ///   representation around each per-image call.
    ///
    /// # Errors
    ///
    /// Returns an error if the probability is out of range.
    pub fn new(
        operation: Box<dyn Transform>,
        probability: f64,
        force_convert: bool,
    ) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(ConfigError::InvalidProbability { value: probability });
        }
        Ok(Self {
            operation,
            probability,
            force_convert,
        })
    }

    fn apply_one(&self, image: ImageData) -> Result<ImageData, TransformError> {
        let convert = self.force_convert && image.is_array();
        let prepared = if convert {
            ImageData::Image(image.into_dynamic()?)
        } else {
            image
        };
        let result = match self.operation.apply(Sample::Single(prepared))? {
            Sample::Single(image) => image,
            Sample::List(_) => {
                return Err(TransformError::invalid_input(format!(
                    "wrapped operation {} produced a list for a single image",
                    self.operation.name()
                )));
            }
        };
        Ok(if convert {
            ImageData::Array(result.into_array())
        } else {
            result
        })
    }
}

impl Transform for ImageTransformWrapper {
    fn name(&self) -> &'static str {
        "ImageTransformWrapper"
    }

    fn apply(&self, sample: Sample) -> Result<Sample, TransformError> {
        let (images, was_list) = sample.into_parts();
        if images.is_empty() {
            return Ok(Sample::from_parts(images, was_list));
        }
        // One draw for the whole list: the wrapped operation runs on every
        // image or on none.
        let apply_all = self.probability >= 1.0 || rand::rng().random_bool(self.probability);
        if !apply_all {
            return Ok(Sample::from_parts(images, was_list));
        }
        let transformed = images
            .into_iter()
            .map(|image| self.apply_one(image))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Sample::from_parts(transformed, was_list))
    }
}

/// One operation of an external probabilistic augmentation engine.
///
/// Only the wrapper contract is specified here: each operation carries its
/// own per-call probability and transforms the whole current image list.
/// Implementations live outside this crate.
pub trait ExternalOperation: Send + Sync + Debug {
    /// The probability that this operation is applied on a given call.
    fn probability(&self) -> f64;

    /// Applies the operation to the whole current image list.
    fn perform(&self, images: Vec<DynamicImage>) -> Result<Vec<DynamicImage>, TransformError>;
}

/// Sequences an externally defined list of probabilistic per-image
/// operations.
///
/// Input is normalized to a list of image objects; each external operation
/// then draws its own probability check and, on success, transforms the
/// whole current list. On the way out, array inputs are converted back and
/// a singleton result is unwrapped when the input was not a list. That
/// unwrapping compensates a documented defect of the external engine, which
/// returns a one-element list where an unwrapped item is expected.
///
/// Not invertible: the external operations are stochastic.
#[derive(Debug)]
pub struct ExternalPipelineWrapper {
    operations: Vec<Box<dyn ExternalOperation>>,
}

impl ExternalPipelineWrapper {
    /// Validates and initializes the wrapper.
    ///
    /// # Errors
    ///
    /// Returns an error if any external operation reports a probability
    /// outside [0, 1].
    pub fn new(operations: Vec<Box<dyn ExternalOperation>>) -> Result<Self, ConfigError> {
        for operation in &operations {
            let probability = operation.probability();
            if !(0.0..=1.0).contains(&probability) {
                return Err(ConfigError::InvalidProbability { value: probability });
            }
        }
        Ok(Self { operations })
    }
}

impl Transform for ExternalPipelineWrapper {
    fn name(&self) -> &'static str {
        "ExternalPipelineWrapper"
    }

    fn apply(&self, sample: Sample) -> Result<Sample, TransformError> {
        let (images, was_list) = sample.into_parts();
        if images.is_empty() {
            return Ok(Sample::from_parts(images, was_list));
        }
        // The external engine only understands image objects; remember the
        // representative input representation to restore it afterwards.
        let from_arrays = images[0].is_array();
        let mut current = images
            .into_iter()
            .map(ImageData::into_dynamic)
            .collect::<Result<Vec<_>, _>>()?;

        let mut rng = rand::rng();
        for operation in &self.operations {
            let draw: f64 = rng.random_range(0.0..1.0);
            if draw <= operation.probability() {
                current = operation.perform(current)?;
            }
        }

        let restored: Vec<ImageData> = if from_arrays {
            current
                .iter()
                .map(|image| ImageData::Array(dynamic_to_array(image)))
                .collect()
        } else {
            current.into_iter().map(ImageData::Image).collect()
        };
        Ok(Sample::from_parts(restored, was_list))
    }
}
