//! # imaug
//!
//! Composable, partially invertible image transformation pipelines for
//! sample preprocessing and augmentation.
//!
//! A pipeline is an ordered, immutable sequence of parametrized operations
//! built once from a declarative description and applied per sample, many
//! times, by possibly many workers. Samples are single images, lists of
//! images, or (for tiling) an image paired with a region-of-interest mask.
//! Deterministic operations without information loss can be reversed back to
//! original pixel coordinates; asking a pipeline containing any stochastic
//! or lossy stage to invert fails loudly instead of approximating.
//!
//! ## Features
//!
//! - Geometric operations: center crop, randomized crop-and-resize, resize,
//!   affine warp, random shift, transpose, tiling
//! - Value operations: zero-mean/unit-variance and min-max normalization
//! - Fan-out operations turning one sample into many: duplication, tiling
//! - Wrappers lifting per-image operations over lists and sequencing
//!   external probabilistic augmentation engines
//! - A static operation registry resolving declarative stage lists
//!
//! ## Modules
//!
//! * [`core`] - Errors, sample representations, traits, and the registry
//! * [`processors`] - The operation set
//! * [`pipeline`] - Composition and the wrapper boundary
//! * [`utils`] - Shared crop/resize/warp primitives
//!
//! ## Quick start
//!
//! ```rust
//! use imaug::prelude::*;
//! use ndarray::{ArrayD, IxDyn};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Compose::new(vec![
//!     Box::new(CenterCrop::new(SizeSpec::Abs(4, 4), BorderMode::default())?),
//!     Box::new(NormalizeMinMax::new(vec![0.0], vec![255.0])?),
//! ]);
//!
//! let image = ArrayD::<f32>::zeros(IxDyn(&[10, 10, 3])).into_shared();
//! let out = pipeline.apply(Sample::from_array(image))?;
//! # let _ = out;
//! # Ok(())
//! # }
//! ```
//!
//! Pipelines can equally be resolved from declarative stage descriptors:
//!
//! ```rust
//! use imaug::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = build_pipeline(&[StageConfig {
//!     operation: "CenterCrop".to_string(),
//!     parameters: serde_json::json!({"size": [224, 224]}),
//! }])?;
//! assert_eq!(pipeline.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod pipeline;
pub mod processors;
pub mod utils;

/// Commonly used types, re-exported for convenience.
///
/// ```rust
/// use imaug::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        build_pipeline, build_transform, registered_operations, ConfigError, ImageArray,
        ImageData, InvertibleTransform, Mask, ProcessingStage, Sample, StageConfig, Transform,
        TransformError,
    };
    pub use crate::pipeline::{
        Compose, ExternalOperation, ExternalPipelineWrapper, ImageTransformWrapper,
    };
    pub use crate::processors::{
        Affine, AxisPair, BorderMode, CenterCrop, Duplicator, Interpolation, NormalizeMinMax,
        NormalizeZeroMeanUnitVar, RandomResizedCrop, RandomShift, RegionSampling, Resize,
        SizeRange, SizeSpec, Tile, TileRect, ToArray, Transpose,
    };
}
