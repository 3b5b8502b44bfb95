//! Core traits defining the calling convention of pipeline operations.
//!
//! Every operation implements [`Transform`]. Operations whose effect can be
//! reversed additionally implement [`InvertibleTransform`] and advertise it
//! through [`Transform::as_invertible`]; the composer inspects that
//! capability statically rather than probing at invert time. An operation
//! whose invertibility depends on its configuration (e.g. an affine warp
//! with an explicit output size) advertises the capability only for the
//! configurations that actually support it.

use std::fmt::Debug;

use crate::core::errors::TransformError;
use crate::core::sample::Sample;

/// A parametrized transformation over samples.
///
/// Implementations are immutable after construction and safe to share across
/// worker threads; randomness, where used, is drawn from the process-wide
/// source at call time.
pub trait Transform: Send + Sync + Debug {
    /// Returns the operation's name, used in error reporting.
    fn name(&self) -> &'static str;

    /// Applies the transformation to a sample.
    ///
    /// Per-image operations accept a single image and reject lists;
    /// wrappers and fan-out operations define their own cardinality rules.
    fn apply(&self, sample: Sample) -> Result<Sample, TransformError>;

    /// Returns this operation's invert capability, if the configured
    /// instance supports inversion.
    ///
    /// The default implementation reports no capability; stochastic and
    /// lossy operations keep it.
    fn as_invertible(&self) -> Option<&dyn InvertibleTransform> {
        None
    }
}

/// The invert capability: reconstruction of a pre-operation sample from a
/// post-operation sample.
pub trait InvertibleTransform: Transform {
    /// Reverses the transformation applied to a sample.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample does not match what the forward
    /// application would have produced, or if this particular configuration
    /// turns out to be non-invertible after all.
    fn invert(&self, sample: Sample) -> Result<Sample, TransformError>;
}
