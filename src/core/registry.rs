//! Static operation registry and declarative stage resolution.
//!
//! A pipeline is described as an ordered list of [`StageConfig`] descriptors
//! naming an operation and carrying its parameter map. Each name resolves
//! through a static registry to a typed factory, once, at pipeline
//! construction time; nothing is looked up per call. Parsing descriptor
//! lists out of configuration files is a caller concern.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::errors::ConfigError;
use crate::core::traits::Transform;
use crate::pipeline::{Compose, ImageTransformWrapper};
use crate::processors::{
    Affine, AffineConfig, CenterCrop, CenterCropConfig, Duplicator, DuplicatorConfig,
    NormalizeMinMax, NormalizeMinMaxConfig, NormalizeZeroMeanUnitVar,
    NormalizeZeroMeanUnitVarConfig, RandomResizedCrop, RandomResizedCropConfig, RandomShift,
    RandomShiftConfig, Resize, ResizeConfig, Tile, TileConfig, ToArray, ToArrayConfig, Transpose,
    TransposeConfig,
};

/// One stage of a declarative pipeline description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// The operation name, resolved through the registry.
    pub operation: String,
    /// The operation's parameter map; defaults to empty.
    #[serde(default)]
    pub parameters: serde_json::Value,
}

/// Declarative parameters for [`ImageTransformWrapper`], nesting the wrapped
/// operation's own stage descriptor fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ImageTransformWrapperConfig {
    /// Name of the wrapped operation.
    operation: String,
    /// Parameters of the wrapped operation.
    #[serde(default)]
    parameters: serde_json::Value,
    /// Probability shared by every image of a list.
    #[serde(default = "default_probability")]
    probability: f64,
    /// Convert array images to image objects around each per-image call.
    #[serde(default = "default_force_convert")]
    force_convert: bool,
}

fn default_probability() -> f64 {
    1.0
}

fn default_force_convert() -> bool {
    true
}

type Factory = fn(serde_json::Value) -> Result<Box<dyn Transform>, ConfigError>;

fn from_params<C: DeserializeOwned>(
    operation: &str,
    parameters: serde_json::Value,
) -> Result<C, ConfigError> {
    let parameters = if parameters.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        parameters
    };
    serde_json::from_value(parameters).map_err(|source| ConfigError::InvalidParameters {
        operation: operation.to_string(),
        source,
    })
}

fn build_image_transform_wrapper(
    parameters: serde_json::Value,
) -> Result<Box<dyn Transform>, ConfigError> {
    let config: ImageTransformWrapperConfig = from_params("ImageTransformWrapper", parameters)?;
    let inner = build_transform(&StageConfig {
        operation: config.operation,
        parameters: config.parameters,
    })?;
    Ok(Box::new(ImageTransformWrapper::new(
        inner,
        config.probability,
        config.force_convert,
    )?))
}

/// Macro to generate one deserialize-and-construct factory per operation.
macro_rules! register_operations {
    ($map:ident, $( $name:literal => ($config:ty, $op:ty) ),* $(,)?) => {
        $(
            {
                fn build(parameters: serde_json::Value) -> Result<Box<dyn Transform>, ConfigError> {
                    let config: $config = from_params($name, parameters)?;
                    Ok(Box::new(<$op>::try_from(config)?))
                }
                $map.insert($name, build as Factory);
            }
        )*
    };
}

static REGISTRY: Lazy<HashMap<&'static str, Factory>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, Factory> = HashMap::new();
    register_operations!(
        map,
        "CenterCrop" => (CenterCropConfig, CenterCrop),
        "RandomResizedCrop" => (RandomResizedCropConfig, RandomResizedCrop),
        "Resize" => (ResizeConfig, Resize),
        "Affine" => (AffineConfig, Affine),
        "RandomShift" => (RandomShiftConfig, RandomShift),
        "Transpose" => (TransposeConfig, Transpose),
        "ToArray" => (ToArrayConfig, ToArray),
        "Duplicator" => (DuplicatorConfig, Duplicator),
        "Tile" => (TileConfig, Tile),
        "NormalizeZeroMeanUnitVar" => (NormalizeZeroMeanUnitVarConfig, NormalizeZeroMeanUnitVar),
        "NormalizeMinMax" => (NormalizeMinMaxConfig, NormalizeMinMax),
    );
    map.insert("ImageTransformWrapper", build_image_transform_wrapper);
    map
});

/// Returns the sorted list of operation names the registry resolves.
pub fn registered_operations() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = REGISTRY.keys().copied().collect();
    names.sort_unstable();
    names
}

/// Resolves one stage descriptor into a constructed transformation.
///
/// # Errors
///
/// Returns an error if the operation name is unknown or its parameters are
/// malformed.
pub fn build_transform(stage: &StageConfig) -> Result<Box<dyn Transform>, ConfigError> {
    let factory = REGISTRY
        .get(stage.operation.as_str())
        .ok_or_else(|| ConfigError::UnknownOperation {
            name: stage.operation.clone(),
        })?;
    factory(stage.parameters.clone())
}

/// Resolves an ordered stage list into a pipeline.
///
/// An empty stage list yields the identity pipeline.
///
/// # Errors
///
/// Returns the first stage resolution error encountered, in order.
pub fn build_pipeline(stages: &[StageConfig]) -> Result<Compose, ConfigError> {
    debug!(stages = stages.len(), "building transform pipeline");
    let transforms = stages
        .iter()
        .map(build_transform)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Compose::new(transforms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sample::Sample;
    use ndarray::Array3;
    use serde_json::json;

    fn rgb(height: usize, width: usize) -> crate::core::sample::ImageArray {
        Array3::from_shape_fn((height, width, 3), |(y, x, _)| (y * width + x) as f32)
            .into_dyn()
            .into_shared()
    }

    fn stage(operation: &str, parameters: serde_json::Value) -> StageConfig {
        StageConfig {
            operation: operation.to_string(),
            parameters,
        }
    }

    #[test]
    fn test_every_registered_name_is_present() {
        let names = registered_operations();
        for expected in [
            "Affine",
            "CenterCrop",
            "Duplicator",
            "ImageTransformWrapper",
            "NormalizeMinMax",
            "NormalizeZeroMeanUnitVar",
            "RandomResizedCrop",
            "RandomShift",
            "Resize",
            "Tile",
            "ToArray",
            "Transpose",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn test_unknown_operation_is_rejected() {
        let err = build_transform(&stage("Sharpen", json!({}))).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOperation { .. }));
    }

    #[test]
    fn test_malformed_parameters_are_rejected() {
        let err = build_transform(&stage("CenterCrop", json!({"size": "big"}))).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameters { .. }));
    }

    #[test]
    fn test_stage_resolution_and_application() {
        let pipeline = build_pipeline(&[
            stage("CenterCrop", json!({"size": [4, 4]})),
            stage("NormalizeMinMax", json!({"min": 0.0, "max": 255.0})),
        ])
        .unwrap();
        let out = pipeline
            .apply(Sample::from_array(rgb(10, 10)))
            .unwrap()
            .into_single_array("test")
            .unwrap();
        assert_eq!(out.shape(), &[4, 4, 3]);
        assert!(out.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_wrapper_descriptor_nests_a_stage() {
        let pipeline = build_pipeline(&[
            stage("Duplicator", json!({"count": 3})),
            stage(
                "ImageTransformWrapper",
                json!({
                    "operation": "RandomResizedCrop",
                    "parameters": {
                        "output_size": [8, 8],
                        "input_size": [0.5, 1.0],
                        "ratio": 1.0,
                    },
                    "force_convert": false,
                }),
            ),
        ])
        .unwrap();
        match pipeline.apply(Sample::from_array(rgb(16, 16))).unwrap() {
            Sample::List(images) => {
                assert_eq!(images.len(), 3);
                for image in images {
                    assert_eq!(image.into_array().shape(), &[8, 8, 3]);
                }
            }
            Sample::Single(_) => panic!("expected a list"),
        }
    }

    #[test]
    fn test_invalid_nested_operation_surfaces_at_construction() {
        let err = build_transform(&stage(
            "ImageTransformWrapper",
            json!({"operation": "Nope", "probability": 0.5}),
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOperation { .. }));
    }

    #[test]
    fn test_missing_parameters_fall_back_to_defaults_where_possible() {
        // Resize with no usable parameters must fail its own validation.
        let err = build_transform(&stage("Resize", serde_json::Value::Null)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig { .. }));
    }
}
