//! Sample duplication (fan-out).

use serde::Deserialize;

use crate::core::errors::{ConfigError, TransformError};
use crate::core::sample::{ImageData, Sample};
use crate::core::traits::{InvertibleTransform, Transform};

/// Duplicates a sample into a list of `count` copies.
///
/// Shallow copies share storage copy-on-write; deep copies allocate fresh
/// storage per duplicate. Inversion is best-effort and lossy: it returns the
/// first element of a list of exactly `count` items, discarding whatever
/// later pipeline stages did to the other copies.
#[derive(Debug, Clone)]
pub struct Duplicator {
    count: usize,
    deep: bool,
}

/// Declarative parameters for [`Duplicator`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DuplicatorConfig {
    /// Number of copies to generate.
    pub count: usize,
    /// Whether to deep-copy storage instead of sharing it.
    #[serde(default)]
    pub deep: bool,
}

impl Duplicator {
    /// Validates and initializes duplication parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if `count` is zero.
    pub fn new(count: usize, deep: bool) -> Result<Self, ConfigError> {
        if count == 0 {
            return Err(ConfigError::invalid_config("invalid copy count"));
        }
        Ok(Self { count, deep })
    }

    fn copy(&self, image: &ImageData) -> ImageData {
        match image {
            ImageData::Array(array) if self.deep => {
                ImageData::Array(array.to_owned().into_shared())
            }
            other => other.clone(),
        }
    }
}

impl TryFrom<DuplicatorConfig> for Duplicator {
    type Error = ConfigError;

    fn try_from(config: DuplicatorConfig) -> Result<Self, Self::Error> {
        Duplicator::new(config.count, config.deep)
    }
}

impl Transform for Duplicator {
    fn name(&self) -> &'static str {
        "Duplicator"
    }

    fn apply(&self, sample: Sample) -> Result<Sample, TransformError> {
        match sample {
            Sample::Single(image) => Ok(Sample::List(
                (0..self.count).map(|_| self.copy(&image)).collect(),
            )),
            Sample::List(_) => Err(TransformError::invalid_input(
                "cannot duplicate a sample that is already a list",
            )),
        }
    }

    fn as_invertible(&self) -> Option<&dyn InvertibleTransform> {
        Some(self)
    }
}

impl InvertibleTransform for Duplicator {
    fn invert(&self, sample: Sample) -> Result<Sample, TransformError> {
        match sample {
            Sample::List(mut images) if images.len() == self.count => {
                Ok(Sample::Single(images.remove(0)))
            }
            Sample::List(images) => Err(TransformError::invalid_input(format!(
                "expected a list of exactly {} duplicates, got {}",
                self.count,
                images.len()
            ))),
            Sample::Single(_) => Err(TransformError::invalid_input(
                "expected a list of duplicates, got a single image",
            )),
        }
    }
}
