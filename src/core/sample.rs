//! Sample and image representations flowing through the pipeline.
//!
//! Pixel data travels as [`ImageArray`], a shared (copy-on-write) `ndarray`
//! of `f32` with rank 2 (H×W) or rank 3 (H×W×C). The shared representation
//! makes fan-out duplication cheap: shallow copies alias the same storage
//! until one of them is replaced. The alternative [`image::DynamicImage`]
//! representation exists for the wrapper boundary, where an external
//! operation expects a conventional 8-bit image object.

use image::DynamicImage;
use ndarray::{ArcArray, Array2, IxDyn};

use crate::core::errors::TransformError;
use crate::utils::image::{array_to_dynamic, dynamic_to_array};

/// Numeric image array, rank 2 (H×W) or rank 3 (H×W×C), shared storage.
pub type ImageArray = ArcArray<f32, IxDyn>;

/// Region-of-interest mask paired with an image; nonzero pixels denote the
/// region of interest. Always rank 2, same H and W as its image.
pub type Mask = Array2<u8>;

/// One image in either of the two representations the pipeline understands.
#[derive(Debug, Clone)]
pub enum ImageData {
    /// A numeric array (H×W or H×W×C, `f32`).
    Array(ImageArray),
    /// A conventional image object, used at the external-wrapper boundary.
    Image(DynamicImage),
}

impl ImageData {
    /// Returns true if this image is held in the array representation.
    pub fn is_array(&self) -> bool {
        matches!(self, ImageData::Array(_))
    }

    /// Converts this image into the array representation.
    ///
    /// Array images are returned as-is; image objects are decoded into an
    /// `f32` array with values in the 0..=255 range.
    pub fn into_array(self) -> ImageArray {
        match self {
            ImageData::Array(array) => array,
            ImageData::Image(image) => dynamic_to_array(&image),
        }
    }

    /// Converts this image into the `DynamicImage` representation.
    ///
    /// # Errors
    ///
    /// Returns an error if an array image has a rank or channel count that
    /// has no `DynamicImage` counterpart.
    pub fn into_dynamic(self) -> Result<DynamicImage, TransformError> {
        match self {
            ImageData::Array(array) => array_to_dynamic(&array),
            ImageData::Image(image) => Ok(image),
        }
    }
}

impl From<ImageArray> for ImageData {
    fn from(array: ImageArray) -> Self {
        ImageData::Array(array)
    }
}

impl From<DynamicImage> for ImageData {
    fn from(image: DynamicImage) -> Self {
        ImageData::Image(image)
    }
}

/// A sample passed through the pipeline: a single image or an ordered list
/// of images.
///
/// List identity is significant: wrappers restore the listness of their
/// input on output, and fan-out operations always produce a list.
#[derive(Debug, Clone)]
pub enum Sample {
    /// A single image.
    Single(ImageData),
    /// An ordered list of images.
    List(Vec<ImageData>),
}

impl Sample {
    /// Creates a single-image sample from an array.
    pub fn from_array(array: ImageArray) -> Self {
        Sample::Single(ImageData::Array(array))
    }

    /// Returns true if this sample is a list.
    pub fn is_list(&self) -> bool {
        matches!(self, Sample::List(_))
    }

    /// Decomposes the sample into its images and a flag recording whether
    /// the input was a list. Rebuild with [`Sample::from_parts`].
    pub fn into_parts(self) -> (Vec<ImageData>, bool) {
        match self {
            Sample::Single(image) => (vec![image], false),
            Sample::List(images) => (images, true),
        }
    }

    /// Rebuilds a sample from images and the recorded listness.
    ///
    /// A non-list input that ended up as exactly one image is unwrapped back
    /// to a single image; everything else stays a list.
    pub fn from_parts(mut images: Vec<ImageData>, was_list: bool) -> Self {
        if !was_list && images.len() == 1 {
            Sample::Single(images.remove(0))
        } else {
            Sample::List(images)
        }
    }

    /// Extracts a single image in array representation, converting an image
    /// object if needed.
    ///
    /// # Arguments
    ///
    /// * `operation` - The name of the calling operation, used in the error
    ///   message when the sample is a list.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample is a list; per-image operations must
    /// be lifted over lists explicitly (see `ImageTransformWrapper`).
    pub fn into_single_array(self, operation: &str) -> Result<ImageArray, TransformError> {
        match self {
            Sample::Single(image) => Ok(image.into_array()),
            Sample::List(_) => Err(TransformError::invalid_input(format!(
                "{operation} expects a single image, got a list; wrap it in ImageTransformWrapper to lift it over lists"
            ))),
        }
    }
}
