//! The core module of the transformation pipeline.
//!
//! This module contains the fundamental components of the pipeline:
//! - Error handling for construction-time and call-time failures
//! - Sample and image representations
//! - The `Transform` / `InvertibleTransform` trait pair
//! - The static operation registry and the declarative stage loader
//!
//! It also re-exports the commonly used types for convenience.

pub mod errors;
pub mod registry;
pub mod sample;
pub mod traits;

pub use errors::{ConfigError, ProcessingStage, TransformError};
pub use registry::{build_pipeline, build_transform, registered_operations, StageConfig};
pub use sample::{ImageArray, ImageData, Mask, Sample};
pub use traits::{InvertibleTransform, Transform};

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and
/// formatting layer. It's typically called at the start of an application to
/// enable logging.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
