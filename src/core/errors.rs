//! Error types for the transformation pipeline.
//!
//! Errors are split in two families: [`ConfigError`] covers everything that
//! can go wrong while constructing an operation from its parameters, and
//! [`TransformError`] covers everything that can go wrong while applying or
//! inverting an operation on a sample. Construction errors surface before any
//! sample is processed; call-time errors are fatal to that call and never
//! retried internally.

use thiserror::Error;

/// Enum representing different stages of processing in the pipeline.
///
/// This enum is used to identify which stage of the pipeline an error
/// occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Error occurred during crop extraction or border padding.
    Crop,
    /// Error occurred during image resizing.
    Resize,
    /// Error occurred during an affine warp.
    Warp,
    /// Error occurred during tile placement or extraction.
    Tile,
    /// Error occurred during sample normalization.
    Normalization,
    /// Error occurred while composing or traversing a pipeline.
    Composition,
    /// Error occurred while converting between image representations.
    Conversion,
    /// Generic processing error.
    Generic,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Crop => write!(f, "crop"),
            ProcessingStage::Resize => write!(f, "resize"),
            ProcessingStage::Warp => write!(f, "warp"),
            ProcessingStage::Tile => write!(f, "tile"),
            ProcessingStage::Normalization => write!(f, "normalization"),
            ProcessingStage::Composition => write!(f, "composition"),
            ProcessingStage::Conversion => write!(f, "conversion"),
            ProcessingStage::Generic => write!(f, "processing"),
        }
    }
}

/// Errors raised while validating operation parameters at construction time.
///
/// Callers are expected to build their pipeline once, at startup, so that
/// every variant of this enum surfaces before the first sample is processed.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A crop, tile or output size parameter is malformed.
    #[error("invalid size: {message}")]
    InvalidSize {
        /// A message describing the invalid size.
        message: String,
    },

    /// A sampling or shift range parameter is malformed.
    #[error("invalid range: {message}")]
    InvalidRange {
        /// A message describing the invalid range.
        message: String,
    },

    /// A probability parameter lies outside [0, 1].
    #[error("invalid probability {value} (range is [0, 1])")]
    InvalidProbability {
        /// The offending probability value.
        value: f64,
    },

    /// Normalization parameters are malformed (length mismatch, zero divisor).
    #[error("invalid normalization parameters: {message}")]
    InvalidNormalization {
        /// A message describing the invalid parameters.
        message: String,
    },

    /// An affine transformation matrix is malformed.
    #[error("invalid transformation matrix: {message}")]
    InvalidMatrix {
        /// A message describing the invalid matrix.
        message: String,
    },

    /// A stage descriptor names an operation the registry does not know.
    #[error("unknown operation: {name}")]
    UnknownOperation {
        /// The unresolved operation name.
        name: String,
    },

    /// A stage descriptor's parameter map could not be deserialized.
    #[error("invalid parameters for {operation}")]
    InvalidParameters {
        /// The operation whose parameters failed to deserialize.
        operation: String,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Any other invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// A message describing the configuration error.
        message: String,
    },
}

impl ConfigError {
    /// Creates a ConfigError for an invalid size parameter.
    pub fn invalid_size(message: impl Into<String>) -> Self {
        Self::InvalidSize {
            message: message.into(),
        }
    }

    /// Creates a ConfigError for an invalid range parameter.
    pub fn invalid_range(message: impl Into<String>) -> Self {
        Self::InvalidRange {
            message: message.into(),
        }
    }

    /// Creates a ConfigError for invalid normalization parameters.
    pub fn invalid_normalization(message: impl Into<String>) -> Self {
        Self::InvalidNormalization {
            message: message.into(),
        }
    }

    /// Creates a ConfigError for any other invalid configuration.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Errors raised while applying or inverting transformations on samples.
#[derive(Error, Debug)]
pub enum TransformError {
    /// Error occurred during processing.
    #[error("{stage} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        stage: ProcessingStage,
        /// Additional context about the error.
        context: String,
    },

    /// Error indicating an unsupported or mismatched sample.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating that an operation's transformation cannot be reversed.
    ///
    /// Raised for stochastic operations, lossy operations, and operations
    /// whose original geometry is unknown at invert time. Never silently
    /// approximated.
    #[error("{operation} cannot be inverted: {reason}")]
    NotInvertible {
        /// The name of the operation that refused to invert.
        operation: &'static str,
        /// The reason inversion is unavailable.
        reason: String,
    },

    /// A construction error observed at call time (e.g. nested stage
    /// resolution inside a wrapper).
    #[error("configuration")]
    Config(#[from] ConfigError),

    /// Error from array shape manipulation.
    #[error("shape error")]
    Shape(#[from] ndarray::ShapeError),
}

impl TransformError {
    /// Creates a TransformError for a failed processing step.
    ///
    /// # Arguments
    ///
    /// * `stage` - The stage of processing where the error occurred.
    /// * `context` - Additional context about the error.
    pub fn processing(stage: ProcessingStage, context: impl Into<String>) -> Self {
        Self::Processing {
            stage,
            context: context.into(),
        }
    }

    /// Creates a TransformError for an unsupported or mismatched sample.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a TransformError for an operation that cannot be reversed.
    ///
    /// # Arguments
    ///
    /// * `operation` - The name of the operation refusing to invert.
    /// * `reason` - The reason inversion is unavailable.
    pub fn not_invertible(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::NotInvertible {
            operation,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_stage_display() {
        assert_eq!(ProcessingStage::Crop.to_string(), "crop");
        assert_eq!(ProcessingStage::Normalization.to_string(), "normalization");
        assert_eq!(ProcessingStage::Generic.to_string(), "processing");
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = TransformError::processing(ProcessingStage::Tile, "mask mismatch");
        assert_eq!(err.to_string(), "tile failed: mask mismatch");

        let err = TransformError::not_invertible("CenterCrop", "data loss");
        assert!(err.to_string().contains("CenterCrop"));
        assert!(err.to_string().contains("data loss"));
    }

    #[test]
    fn test_config_error_converts_to_transform_error() {
        let err: TransformError = ConfigError::InvalidProbability { value: 1.5 }.into();
        assert!(matches!(err, TransformError::Config(_)));
    }
}
