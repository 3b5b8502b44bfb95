//! Pipeline composition.
//!
//! [`Compose`] sequences operations: forward application folds the sample
//! through the operations in construction order, and inversion folds it
//! through their invert capabilities in reverse order. Invert availability
//! is a static property of the pipeline: if any stage lacks the capability,
//! inversion fails immediately and no stage is applied, even for samples
//! that would not have needed the missing stage.

pub mod wrappers;

use crate::core::errors::TransformError;
use crate::core::sample::Sample;
use crate::core::traits::{InvertibleTransform, Transform};

pub use wrappers::{ExternalOperation, ExternalPipelineWrapper, ImageTransformWrapper};

/// An ordered, immutable sequence of transformations applied as one.
#[derive(Debug)]
pub struct Compose {
    transforms: Vec<Box<dyn Transform>>,
}

impl Compose {
    /// Creates a pipeline from an ordered list of transformations.
    ///
    /// Ordering is semantically significant; an empty list is the identity
    /// pipeline.
    pub fn new(transforms: Vec<Box<dyn Transform>>) -> Self {
        Self { transforms }
    }

    /// Returns the composed transformations in application order.
    pub fn transforms(&self) -> &[Box<dyn Transform>] {
        &self.transforms
    }

    /// Returns the number of composed transformations.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Returns true if this is the identity pipeline.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Returns the name of the first stage without invert support, if any.
    pub fn first_non_invertible(&self) -> Option<&'static str> {
        self.transforms
            .iter()
            .find(|transform| transform.as_invertible().is_none())
            .map(|transform| transform.name())
    }

    /// Returns true if every stage of the pipeline supports inversion.
    pub fn supports_invert(&self) -> bool {
        self.first_non_invertible().is_none()
    }

    /// Reverses the transformations applied to a sample, in reverse order.
    ///
    /// # Errors
    ///
    /// Fails before applying anything if any stage lacks invert support,
    /// naming the first offending stage; otherwise propagates the first
    /// stage-level inversion error.
    pub fn invert(&self, sample: Sample) -> Result<Sample, TransformError> {
        if let Some(name) = self.first_non_invertible() {
            return Err(TransformError::not_invertible(
                "Compose",
                format!("missing invert op for transform {name}"),
            ));
        }
        self.transforms
            .iter()
            .rev()
            .try_fold(sample, |sample, transform| {
                let invertible = transform.as_invertible().ok_or_else(|| {
                    TransformError::not_invertible(
                        "Compose",
                        format!("missing invert op for transform {}", transform.name()),
                    )
                })?;
                invertible.invert(sample)
            })
    }
}

impl Transform for Compose {
    fn name(&self) -> &'static str {
        "Compose"
    }

    fn apply(&self, sample: Sample) -> Result<Sample, TransformError> {
        self.transforms
            .iter()
            .try_fold(sample, |sample, transform| transform.apply(sample))
    }

    fn as_invertible(&self) -> Option<&dyn InvertibleTransform> {
        if self.supports_invert() {
            Some(self)
        } else {
            None
        }
    }
}

impl InvertibleTransform for Compose {
    fn invert(&self, sample: Sample) -> Result<Sample, TransformError> {
        Compose::invert(self, sample)
    }
}
