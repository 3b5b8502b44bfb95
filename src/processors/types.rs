//! Parameter types shared by the transformation operations.
//!
//! These types capture the option surface of the operations: sizes that are
//! either absolute pixel counts or fractions of the image, sampling ranges,
//! interpolation kernels and border policies. Absolute and relative sizes
//! are distinguished by numeric kind in declarative descriptors (integers
//! are absolute, floats are relative), which the custom deserializers
//! enforce; mixing kinds inside one pair is rejected.

use serde::de::Error as DeError;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::errors::ConfigError;

/// A raw numeric dimension as found in a declarative descriptor.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum RawDim {
    /// An integer dimension (absolute pixels).
    Int(i64),
    /// A floating-point dimension (relative fraction).
    Float(f64),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawPair {
    Pair([RawDim; 2]),
    Scalar(RawDim),
}

impl RawPair {
    fn into_dims(self) -> (RawDim, RawDim) {
        match self {
            RawPair::Pair([a, b]) => (a, b),
            RawPair::Scalar(d) => (d, d),
        }
    }
}

/// A crop/tile/output size, absolute or relative to the image size.
///
/// Both components are always the same numeric kind; a single scalar in a
/// descriptor is expanded to a square size. The component order is
/// (width, height).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeSpec {
    /// Absolute size in pixels (width, height).
    Abs(u32, u32),
    /// Size relative to the image, as fractions in (0, 1] (width, height).
    Rel(f64, f64),
}

impl SizeSpec {
    /// Validates the size parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if an absolute component is zero or a relative
    /// component lies outside (0, 1].
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            SizeSpec::Abs(w, h) => {
                if w == 0 || h == 0 {
                    return Err(ConfigError::invalid_size(format!(
                        "absolute size components must be positive (got {w}x{h})"
                    )));
                }
            }
            SizeSpec::Rel(w, h) => {
                if !(w > 0.0 && w <= 1.0 && h > 0.0 && h <= 1.0) {
                    return Err(ConfigError::invalid_size(format!(
                        "relative size components must lie in (0, 1] (got {w}x{h})"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Resolves the size against an image, returning absolute pixel
    /// dimensions as (width, height). Relative components are rounded.
    pub fn resolve(&self, image_width: usize, image_height: usize) -> (i64, i64) {
        match *self {
            SizeSpec::Abs(w, h) => (i64::from(w), i64::from(h)),
            SizeSpec::Rel(w, h) => (
                (w * image_width as f64).round() as i64,
                (h * image_height as f64).round() as i64,
            ),
        }
    }

    /// Returns true if this size is relative to the image size.
    pub fn is_relative(&self) -> bool {
        matches!(self, SizeSpec::Rel(..))
    }
}

impl<'de> Deserialize<'de> for SizeSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (a, b) = RawPair::deserialize(deserializer)?.into_dims();
        match (a, b) {
            (RawDim::Int(w), RawDim::Int(h)) => {
                let w = u32::try_from(w)
                    .map_err(|_| D::Error::custom(format!("size component {w} out of range")))?;
                let h = u32::try_from(h)
                    .map_err(|_| D::Error::custom(format!("size component {h} out of range")))?;
                Ok(SizeSpec::Abs(w, h))
            }
            (RawDim::Float(w), RawDim::Float(h)) => Ok(SizeSpec::Rel(w, h)),
            _ => Err(D::Error::custom(
                "size components must be the same numeric kind (both int or both float)",
            )),
        }
    }
}

impl Serialize for SizeSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        match *self {
            SizeSpec::Abs(w, h) => {
                seq.serialize_element(&w)?;
                seq.serialize_element(&h)?;
            }
            SizeSpec::Rel(w, h) => {
                seq.serialize_element(&w)?;
                seq.serialize_element(&h)?;
            }
        }
        seq.end()
    }
}

/// A (min, max) sampling range for one extent, absolute or relative.
///
/// The bounds are normalized so that min ≤ max.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeRange {
    /// Absolute pixel range (min, max).
    Abs(u32, u32),
    /// Relative range in (0, 1] (min, max).
    Rel(f64, f64),
}

impl SizeRange {
    /// Validates the range bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if an absolute bound is zero or a relative bound
    /// lies outside (0, 1].
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            SizeRange::Abs(lo, hi) => {
                if lo == 0 || hi == 0 {
                    return Err(ConfigError::invalid_range(format!(
                        "absolute range bounds must be positive (got [{lo}, {hi}])"
                    )));
                }
            }
            SizeRange::Rel(lo, hi) => {
                if !(lo > 0.0 && lo <= 1.0 && hi > 0.0 && hi <= 1.0) {
                    return Err(ConfigError::invalid_range(format!(
                        "relative range bounds must lie in (0, 1] (got [{lo}, {hi}])"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns true if this range is relative to the image size.
    pub fn is_relative(&self) -> bool {
        matches!(self, SizeRange::Rel(..))
    }

    fn from_dims(a: RawDim, b: RawDim) -> Result<Self, String> {
        match (a, b) {
            (RawDim::Int(lo), RawDim::Int(hi)) => {
                let (lo, hi) = (lo.min(hi), lo.max(hi));
                let lo = u32::try_from(lo).map_err(|_| format!("range bound {lo} out of range"))?;
                let hi = u32::try_from(hi).map_err(|_| format!("range bound {hi} out of range"))?;
                Ok(SizeRange::Abs(lo, hi))
            }
            (RawDim::Float(lo), RawDim::Float(hi)) => Ok(SizeRange::Rel(lo.min(hi), lo.max(hi))),
            _ => Err("range bounds must be the same numeric kind (both int or both float)".into()),
        }
    }
}

impl<'de> Deserialize<'de> for SizeRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (a, b) = RawPair::deserialize(deserializer)?.into_dims();
        SizeRange::from_dims(a, b).map_err(D::Error::custom)
    }
}

impl Serialize for SizeRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        match *self {
            SizeRange::Abs(lo, hi) => {
                seq.serialize_element(&lo)?;
                seq.serialize_element(&hi)?;
            }
            SizeRange::Rel(lo, hi) => {
                seq.serialize_element(&lo)?;
                seq.serialize_element(&hi)?;
            }
        }
        seq.end()
    }
}

/// A per-axis pair of values, given as a scalar (duplicated) or `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisPair {
    /// Value along the x axis.
    pub x: f64,
    /// Value along the y axis.
    pub y: f64,
}

impl AxisPair {
    /// Creates a per-axis pair.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Creates a pair with the same value on both axes.
    pub fn splat(value: f64) -> Self {
        Self { x: value, y: value }
    }
}

impl<'de> Deserialize<'de> for AxisPair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Pair([f64; 2]),
            Scalar(f64),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Pair([x, y]) => AxisPair { x, y },
            Raw::Scalar(v) => AxisPair::splat(v),
        })
    }
}

/// Interpolation kernel used by resize and warp operations.
///
/// The warp primitive implements nearest and bilinear sampling; the
/// higher-order kernels apply to resizing only and fall back to bilinear
/// when used in a warp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Nearest-neighbour sampling.
    Nearest,
    /// Bilinear sampling.
    #[default]
    Bilinear,
    /// Catmull-Rom (bicubic) resampling.
    CatmullRom,
    /// Lanczos resampling with window 3.
    Lanczos3,
}

impl Interpolation {
    /// Maps the kernel to the resampler's filter type.
    pub fn to_filter(self) -> image::imageops::FilterType {
        match self {
            Interpolation::Nearest => image::imageops::FilterType::Nearest,
            Interpolation::Bilinear => image::imageops::FilterType::Triangle,
            Interpolation::CatmullRom => image::imageops::FilterType::CatmullRom,
            Interpolation::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// Border extrapolation policy used when a crop or warp reaches outside the
/// image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderMode {
    /// Fill with a constant value.
    Constant(f32),
    /// Replicate the nearest edge pixel.
    Replicate,
    /// Mirror around the edge pixel (the edge itself is not repeated).
    Reflect,
}

impl Default for BorderMode {
    fn default() -> Self {
        BorderMode::Constant(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_spec_integers_are_absolute() {
        let size: SizeSpec = serde_json::from_str("[224, 224]").unwrap();
        assert_eq!(size, SizeSpec::Abs(224, 224));
    }

    #[test]
    fn test_size_spec_floats_are_relative() {
        let size: SizeSpec = serde_json::from_str("[0.5, 0.25]").unwrap();
        assert_eq!(size, SizeSpec::Rel(0.5, 0.25));
    }

    #[test]
    fn test_size_spec_scalar_expands_to_square() {
        let size: SizeSpec = serde_json::from_str("64").unwrap();
        assert_eq!(size, SizeSpec::Abs(64, 64));
    }

    #[test]
    fn test_size_spec_mixed_kinds_rejected() {
        assert!(serde_json::from_str::<SizeSpec>("[4, 0.5]").is_err());
    }

    #[test]
    fn test_size_spec_validation() {
        assert!(SizeSpec::Abs(0, 4).validate().is_err());
        assert!(SizeSpec::Rel(0.0, 0.5).validate().is_err());
        assert!(SizeSpec::Rel(0.5, 1.5).validate().is_err());
        assert!(SizeSpec::Abs(4, 4).validate().is_ok());
    }

    #[test]
    fn test_size_spec_resolution() {
        assert_eq!(SizeSpec::Abs(4, 6).resolve(10, 10), (4, 6));
        assert_eq!(SizeSpec::Rel(0.5, 0.25).resolve(10, 8), (5, 2));
    }

    #[test]
    fn test_size_range_bounds_are_normalized() {
        let range: SizeRange = serde_json::from_str("[0.9, 0.1]").unwrap();
        assert_eq!(range, SizeRange::Rel(0.1, 0.9));
    }

    #[test]
    fn test_axis_pair_scalar_or_pair() {
        let pair: AxisPair = serde_json::from_str("2.5").unwrap();
        assert_eq!(pair, AxisPair::splat(2.5));
        let pair: AxisPair = serde_json::from_str("[-1.0, 3.0]").unwrap();
        assert_eq!(pair, AxisPair::new(-1.0, 3.0));
    }

    #[test]
    fn test_border_mode_serde_round_trip() {
        let mode: BorderMode = serde_json::from_str("{\"constant\": 0.5}").unwrap();
        assert_eq!(mode, BorderMode::Constant(0.5));
        let mode: BorderMode = serde_json::from_str("\"replicate\"").unwrap();
        assert_eq!(mode, BorderMode::Replicate);
    }
}
