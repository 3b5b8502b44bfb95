//! Randomized crop-and-resize sampling.

use rand::Rng;
use serde::Deserialize;
use tracing::debug;

use crate::core::errors::{ConfigError, TransformError};
use crate::core::sample::{ImageArray, Sample};
use crate::core::traits::Transform;
use crate::processors::types::{AxisPair, BorderMode, Interpolation, SizeRange, SizeSpec};
use crate::utils::crop::safe_crop;
use crate::utils::resize::resize_array;

/// Default input region range: 8% to 100% of the image area.
const DEFAULT_INPUT_RANGE: SizeRange = SizeRange::Rel(0.08, 1.0);
/// Default aspect ratio range.
const DEFAULT_RATIO: (f64, f64) = (0.75, 1.33);
/// Default retry budget for region sampling.
const DEFAULT_ATTEMPTS: u32 = 10;

/// How the input region's dimensions are sampled.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionSampling {
    /// Sample an area from `size` (absolute edge length, squared, or a
    /// fraction of the image area) and combine it with an aspect ratio
    /// sampled from `ratio`; width and height are swapped with 50%
    /// probability.
    Area {
        /// Area range (absolute edge pixels or relative area fraction).
        size: SizeRange,
        /// Aspect ratio range (min, max).
        ratio: (f64, f64),
    },
    /// Sample width and height independently from their own ranges. Both
    /// ranges must be the same numeric kind; no aspect ratio applies.
    Extent {
        /// Width range.
        width: SizeRange,
        /// Height range.
        height: SizeRange,
    },
}

/// Extracts a resized crop of a randomly selected image region.
///
/// Up to `random_attempts` regions are sampled; the first one that fits the
/// image is placed uniformly at random and extracted. When the budget is
/// exhausted without a fit, a centered square crop of the smaller image
/// dimension is used instead. The extracted region is then resized to the
/// configured output size.
///
/// This operation is stochastic and cannot be inverted. A per-call
/// probability gate may skip the whole operation and return the input
/// unchanged.
#[derive(Debug, Clone)]
pub struct RandomResizedCrop {
    output_size: SizeSpec,
    sampling: RegionSampling,
    probability: f64,
    random_attempts: u32,
    interpolation: Interpolation,
}

/// Declarative parameters for [`RandomResizedCrop`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomResizedCropConfig {
    /// Output size, absolute or relative to the input image.
    pub output_size: SizeSpec,
    /// Input region sizing: a (min, max) range, or a pair of (width, height)
    /// sizes bounding independent per-axis ranges.
    #[serde(default)]
    pub input_size: Option<RawInputSize>,
    /// Aspect ratio range; only valid with the range form of `input_size`.
    #[serde(default)]
    pub ratio: Option<AxisPair>,
    /// Probability that the operation is applied at all.
    #[serde(default = "default_probability")]
    pub probability: f64,
    /// Retry budget for region sampling.
    #[serde(default = "default_attempts")]
    pub random_attempts: u32,
    /// Interpolation kernel for the final resize.
    #[serde(default)]
    pub interpolation: Interpolation,
}

fn default_probability() -> f64 {
    1.0
}

fn default_attempts() -> u32 {
    DEFAULT_ATTEMPTS
}

/// Samples one extent uniformly from its range, resolved against the image.
fn sample_extent(range: &SizeRange, extent: i64, rng: &mut impl Rng) -> i64 {
    match *range {
        SizeRange::Abs(lo, hi) => rng.random_range(f64::from(lo)..=f64::from(hi)).round() as i64,
        SizeRange::Rel(lo, hi) => (rng.random_range(lo..=hi) * extent as f64).round() as i64,
    }
}

/// Raw `input_size` forms accepted in descriptors.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawInputSize {
    /// A (min, max) scalar range, combined with an aspect ratio.
    Range(SizeRange),
    /// A pair of (width, height) sizes bounding per-axis ranges.
    Pairs([SizeSpec; 2]),
}

impl RandomResizedCrop {
    /// Validates and initializes the crop parameters.
    ///
    /// # Arguments
    ///
    /// * `output_size` - Size of the output crop, absolute or relative.
    /// * `sampling` - Input region sampling mode.
    /// * `probability` - Probability that the operation is applied.
    /// * `random_attempts` - Retry budget; must be positive.
    /// * `interpolation` - Kernel for the final resize.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is malformed.
    pub fn new(
        output_size: SizeSpec,
        sampling: RegionSampling,
        probability: f64,
        random_attempts: u32,
        interpolation: Interpolation,
    ) -> Result<Self, ConfigError> {
        output_size.validate()?;
        match &sampling {
            RegionSampling::Area { size, ratio } => {
                size.validate()?;
                if !(ratio.0 > 0.0 && ratio.1 >= ratio.0) {
                    return Err(ConfigError::invalid_range(format!(
                        "aspect ratio bounds must be positive and ordered (got [{}, {}])",
                        ratio.0, ratio.1
                    )));
                }
            }
            RegionSampling::Extent { width, height } => {
                width.validate()?;
                height.validate()?;
                if width.is_relative() != height.is_relative() {
                    return Err(ConfigError::invalid_range(
                        "width and height ranges must be the same numeric kind",
                    ));
                }
            }
        }
        if !(0.0..=1.0).contains(&probability) {
            return Err(ConfigError::InvalidProbability { value: probability });
        }
        if random_attempts == 0 {
            return Err(ConfigError::invalid_config(
                "random_attempts must be positive",
            ));
        }
        Ok(Self {
            output_size,
            sampling,
            probability,
            random_attempts,
            interpolation,
        })
    }

    /// Convenience constructor using the default input range, ratio range,
    /// probability and retry budget.
    pub fn with_defaults(output_size: SizeSpec) -> Result<Self, ConfigError> {
        Self::new(
            output_size,
            RegionSampling::Area {
                size: DEFAULT_INPUT_RANGE,
                ratio: DEFAULT_RATIO,
            },
            1.0,
            DEFAULT_ATTEMPTS,
            Interpolation::default(),
        )
    }

    /// Samples one candidate region size as (width, height) pixels.
    fn sample_region(&self, rng: &mut impl Rng, width: i64, height: i64) -> (i64, i64) {
        match &self.sampling {
            RegionSampling::Area { size, ratio } => {
                let target_area = match *size {
                    SizeRange::Rel(lo, hi) => {
                        rng.random_range(lo..=hi) * (width * height) as f64
                    }
                    SizeRange::Abs(lo, hi) => {
                        let edge = rng.random_range(f64::from(lo)..=f64::from(hi));
                        edge * edge
                    }
                };
                let aspect = rng.random_range(ratio.0..=ratio.1);
                let mut w = (target_area * aspect).sqrt().round() as i64;
                let mut h = (target_area / aspect).sqrt().round() as i64;
                if rng.random_bool(0.5) {
                    std::mem::swap(&mut w, &mut h);
                }
                (w, h)
            }
            RegionSampling::Extent {
                width: w_range,
                height: h_range,
            } => (
                sample_extent(w_range, width, rng),
                sample_extent(h_range, height, rng),
            ),
        }
    }

    /// Extracts and returns a random resized crop from a single image.
    pub fn crop(&self, image: &ImageArray) -> Result<ImageArray, TransformError> {
        let ndim = image.ndim();
        if !(2..=3).contains(&ndim) {
            return Err(TransformError::invalid_input(format!(
                "bad input dimensions; must be 2-d, or 3-d (with channels), got rank {ndim}"
            )));
        }
        let mut rng = rand::rng();
        if self.probability < 1.0 && rng.random_range(0.0..1.0) > self.probability {
            return Ok(image.clone());
        }
        let (height, width) = (image.shape()[0] as i64, image.shape()[1] as i64);

        let mut region = None;
        for _ in 0..self.random_attempts {
            let (w, h) = self.sample_region(&mut rng, width, height);
            if w >= 1 && h >= 1 && w <= width && h <= height {
                let col = rng.random_range(0..=(width - w));
                let row = rng.random_range(0..=(height - h));
                region = Some((col, row, w, h));
                break;
            }
        }
        let (col, row, w, h) = region.unwrap_or_else(|| {
            // No sampled region fit inside the image within the budget.
            let edge = width.min(height);
            debug!(
                attempts = self.random_attempts,
                edge, "region sampling exhausted, falling back to centered square crop"
            );
            ((width - edge) / 2, (height - edge) / 2, edge, edge)
        });

        let crop = safe_crop(image.view(), (col, row), (col + w, row + h), BorderMode::default())?;
        let (out_w, out_h) = self.output_size.resolve(width as usize, height as usize);
        Ok(
            resize_array(crop.view(), out_w as u32, out_h as u32, self.interpolation, None)?
                .into_shared(),
        )
    }
}

impl TryFrom<RandomResizedCropConfig> for RandomResizedCrop {
    type Error = ConfigError;

    fn try_from(config: RandomResizedCropConfig) -> Result<Self, Self::Error> {
        let ratio = config.ratio.map(|pair| (pair.x.min(pair.y), pair.x.max(pair.y)));
        let sampling = match config.input_size {
            None => RegionSampling::Area {
                size: DEFAULT_INPUT_RANGE,
                ratio: ratio.unwrap_or(DEFAULT_RATIO),
            },
            Some(RawInputSize::Range(size)) => RegionSampling::Area {
                size,
                ratio: ratio.unwrap_or(DEFAULT_RATIO),
            },
            Some(RawInputSize::Pairs([min, max])) => {
                if ratio.is_some() {
                    return Err(ConfigError::invalid_range(
                        "cannot provide aspect ratios together with per-axis input size ranges",
                    ));
                }
                let (width, height) = match (min, max) {
                    (SizeSpec::Abs(w0, h0), SizeSpec::Abs(w1, h1)) => (
                        SizeRange::Abs(w0.min(w1), w0.max(w1)),
                        SizeRange::Abs(h0.min(h1), h0.max(h1)),
                    ),
                    (SizeSpec::Rel(w0, h0), SizeSpec::Rel(w1, h1)) => (
                        SizeRange::Rel(w0.min(w1), w0.max(w1)),
                        SizeRange::Rel(h0.min(h1), h0.max(h1)),
                    ),
                    _ => {
                        return Err(ConfigError::invalid_range(
                            "input size bounds must be the same numeric kind",
                        ));
                    }
                };
                RegionSampling::Extent { width, height }
            }
        };
        RandomResizedCrop::new(
            config.output_size,
            sampling,
            config.probability,
            config.random_attempts,
            config.interpolation,
        )
    }
}

impl Transform for RandomResizedCrop {
    fn name(&self) -> &'static str {
        "RandomResizedCrop"
    }

    fn apply(&self, sample: Sample) -> Result<Sample, TransformError> {
        let image = sample.into_single_array(self.name())?;
        Ok(Sample::from_array(self.crop(&image)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn rgb(height: usize, width: usize) -> ImageArray {
        Array3::from_shape_fn((height, width, 3), |(y, x, _)| (y * width + x) as f32)
            .into_dyn()
            .into_shared()
    }

    #[test]
    fn test_full_region_unit_ratio_is_deterministic_in_shape() {
        // input_size [1.0, 1.0] with ratio 1.0 always selects the full image
        // as a square region; the output must always be 8x8x3.
        let crop = RandomResizedCrop::new(
            SizeSpec::Abs(8, 8),
            RegionSampling::Area {
                size: SizeRange::Rel(1.0, 1.0),
                ratio: (1.0, 1.0),
            },
            1.0,
            10,
            Interpolation::Bilinear,
        )
        .unwrap();
        for _ in 0..20 {
            let out = crop.crop(&rgb(16, 16)).unwrap();
            assert_eq!(out.shape(), &[8, 8, 3]);
        }
    }

    #[test]
    fn test_output_shape_is_stable_across_seeds_and_input_sizes() {
        let crop = RandomResizedCrop::with_defaults(SizeSpec::Abs(6, 4)).unwrap();
        for (h, w) in [(10, 10), (17, 23), (5, 40)] {
            for _ in 0..10 {
                let out = crop.crop(&rgb(h, w)).unwrap();
                assert_eq!(out.shape(), &[4, 6, 3]);
            }
        }
    }

    #[test]
    fn test_relative_output_size() {
        let crop = RandomResizedCrop::new(
            SizeSpec::Rel(0.5, 0.5),
            RegionSampling::Area {
                size: SizeRange::Rel(1.0, 1.0),
                ratio: (1.0, 1.0),
            },
            1.0,
            10,
            Interpolation::Bilinear,
        )
        .unwrap();
        let out = crop.crop(&rgb(16, 12)).unwrap();
        assert_eq!(out.shape(), &[8, 6, 3]);
    }

    #[test]
    fn test_zero_probability_returns_input_unchanged() {
        let crop = RandomResizedCrop::new(
            SizeSpec::Abs(4, 4),
            RegionSampling::Area {
                size: SizeRange::Rel(1.0, 1.0),
                ratio: (1.0, 1.0),
            },
            0.0,
            10,
            Interpolation::Bilinear,
        )
        .unwrap();
        let image = rgb(10, 10);
        let out = crop.crop(&image).unwrap();
        assert_eq!(out.shape(), image.shape());
        assert_eq!(out, image);
    }

    #[test]
    fn test_fallback_to_centered_square_when_nothing_fits() {
        // Absolute extents of 10 pixels can never fit a 4x4 image, so every
        // attempt fails and the centered fallback kicks in.
        let crop = RandomResizedCrop::new(
            SizeSpec::Abs(2, 2),
            RegionSampling::Extent {
                width: SizeRange::Abs(10, 10),
                height: SizeRange::Abs(10, 10),
            },
            1.0,
            5,
            Interpolation::Nearest,
        )
        .unwrap();
        let out = crop.crop(&rgb(4, 4)).unwrap();
        assert_eq!(out.shape(), &[2, 2, 3]);
    }

    #[test]
    fn test_extent_mode_samples_within_bounds() {
        let crop = RandomResizedCrop::new(
            SizeSpec::Abs(3, 3),
            RegionSampling::Extent {
                width: SizeRange::Abs(2, 4),
                height: SizeRange::Abs(2, 4),
            },
            1.0,
            10,
            Interpolation::Nearest,
        )
        .unwrap();
        let out = crop.crop(&rgb(8, 8)).unwrap();
        assert_eq!(out.shape(), &[3, 3, 3]);
    }

    #[test]
    fn test_construction_rejects_bad_parameters() {
        let area = RegionSampling::Area {
            size: SizeRange::Rel(0.5, 1.0),
            ratio: (1.0, 1.0),
        };
        assert!(
            RandomResizedCrop::new(SizeSpec::Abs(4, 4), area.clone(), 1.5, 10, Interpolation::Bilinear)
                .is_err()
        );
        assert!(
            RandomResizedCrop::new(SizeSpec::Abs(4, 4), area, 1.0, 0, Interpolation::Bilinear)
                .is_err()
        );
        let mixed = RegionSampling::Extent {
            width: SizeRange::Abs(2, 4),
            height: SizeRange::Rel(0.1, 0.5),
        };
        assert!(
            RandomResizedCrop::new(SizeSpec::Abs(4, 4), mixed, 1.0, 10, Interpolation::Bilinear)
                .is_err()
        );
    }

    #[test]
    fn test_config_rejects_ratio_with_per_axis_ranges() {
        let config: RandomResizedCropConfig = serde_json::from_value(serde_json::json!({
            "output_size": [8, 8],
            "input_size": [[2, 2], [4, 4]],
            "ratio": 1.0,
        }))
        .unwrap();
        assert!(RandomResizedCrop::try_from(config).is_err());
    }

    #[test]
    fn test_config_range_form_with_scalar_ratio() {
        let config: RandomResizedCropConfig = serde_json::from_value(serde_json::json!({
            "output_size": [8, 8],
            "input_size": [1.0, 1.0],
            "ratio": 1.0,
            "probability": 1.0,
        }))
        .unwrap();
        let crop = RandomResizedCrop::try_from(config).unwrap();
        let out = crop.crop(&rgb(16, 16)).unwrap();
        assert_eq!(out.shape(), &[8, 8, 3]);
    }

    #[test]
    fn test_not_invertible() {
        let crop = RandomResizedCrop::with_defaults(SizeSpec::Abs(4, 4)).unwrap();
        assert!(Transform::as_invertible(&crop).is_none());
    }
}
