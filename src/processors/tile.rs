//! Tiling (fan-out into fixed-size spatial crops).

use ndarray::s;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::errors::{ConfigError, ProcessingStage, TransformError};
use crate::core::sample::{ImageArray, ImageData, Mask, Sample};
use crate::core::traits::{InvertibleTransform, Transform};
use crate::processors::types::{BorderMode, SizeSpec};
use crate::utils::crop::safe_crop;

/// A tile placement in source-image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRect {
    /// X coordinate of the tile's top-left corner.
    pub x: i64,
    /// Y coordinate of the tile's top-left corner.
    pub y: i64,
    /// Tile width in pixels.
    pub width: i64,
    /// Tile height in pixels.
    pub height: i64,
}

/// Splits an image into a list of fixed-size tiles.
///
/// Tiles are laid out on a regular row-major grid. Without a mask the grid
/// anchor is the overlap-derived offset; with a mask, the first placement
/// whose covered mask pixel count reaches `tile_area × min_mask_iou` is
/// searched exhaustively from the top-left, and its offset modulo the step
/// size anchors the whole grid. Cells failing the mask requirement are
/// skipped. When no placement ever satisfies the requirement the tile list
/// is empty, which is a valid result rather than an error.
///
/// Inversion is only available for the lossless configuration: zero overlap,
/// no overlap offset, and a relative tile size whose per-axis reciprocals
/// are integral, so the grid shape is known from the parameters alone. A
/// tiling driven by a mask cannot be inverted (image content may have been
/// discarded), and overlapping reconstruction is refused rather than
/// blended.
#[derive(Debug, Clone)]
pub struct Tile {
    tile_size: SizeSpec,
    tile_overlap: f64,
    min_mask_iou: f64,
    offset_overlap: bool,
    border: BorderMode,
}

/// Declarative parameters for [`Tile`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TileConfig {
    /// Tile size (width, height), absolute or relative.
    pub tile_size: SizeSpec,
    /// Overlap ratio between neighboring tiles, in [0, 1).
    #[serde(default)]
    pub tile_overlap: f64,
    /// Minimum fraction of a tile's area that must be covered by nonzero
    /// mask pixels, in [0, 1].
    #[serde(default = "default_min_mask_iou")]
    pub min_mask_iou: f64,
    /// Whether the overlap tiling is offset outward from the top-left.
    #[serde(default)]
    pub offset_overlap: bool,
    /// Border policy for tiles reaching outside the image.
    #[serde(default)]
    pub border: BorderMode,
}

fn default_min_mask_iou() -> f64 {
    1.0
}

/// Counts nonzero mask pixels inside a rectangle, treating everything
/// outside the mask as zero.
fn mask_count(mask: &Mask, x0: i64, y0: i64, x1: i64, y1: i64) -> u64 {
    let (h, w) = (mask.nrows() as i64, mask.ncols() as i64);
    let (x0, y0) = (x0.max(0), y0.max(0));
    let (x1, y1) = (x1.min(w), y1.min(h));
    if x1 <= x0 || y1 <= y0 {
        return 0;
    }
    mask.slice(s![y0 as isize..y1 as isize, x0 as isize..x1 as isize])
        .iter()
        .filter(|&&v| v != 0)
        .count() as u64
}

impl Tile {
    /// Validates and initializes tiling parameters.
    ///
    /// # Arguments
    ///
    /// * `tile_size` - Size of the output tiles, absolute or relative.
    /// * `tile_overlap` - Overlap ratio between neighboring tiles, in
    ///   [0, 1).
    /// * `min_mask_iou` - Minimum mask coverage fraction for accepting a
    ///   tile, in [0, 1].
    /// * `offset_overlap` - Whether the overlap tiling is offset outward
    ///   from the top-left.
    /// * `border` - Border policy for tiles reaching outside the image.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of range.
    pub fn new(
        tile_size: SizeSpec,
        tile_overlap: f64,
        min_mask_iou: f64,
        offset_overlap: bool,
        border: BorderMode,
    ) -> Result<Self, ConfigError> {
        tile_size.validate()?;
        if !(0.0..1.0).contains(&tile_overlap) {
            return Err(ConfigError::invalid_range(format!(
                "tile overlap should lie in [0, 1) (got {tile_overlap})"
            )));
        }
        if !(0.0..=1.0).contains(&min_mask_iou) {
            return Err(ConfigError::invalid_range(format!(
                "minimum mask IoU should lie in [0, 1] (got {min_mask_iou})"
            )));
        }
        Ok(Self {
            tile_size,
            tile_overlap,
            min_mask_iou,
            offset_overlap,
            border,
        })
    }

    /// Computes the tile placements for an image, without extracting pixels.
    ///
    /// # Errors
    ///
    /// Returns an error if the image rank is unsupported or the mask shape
    /// does not match the image.
    pub fn tile_rects(
        &self,
        image: &ImageArray,
        mask: Option<&Mask>,
    ) -> Result<Vec<TileRect>, TransformError> {
        let ndim = image.ndim();
        if !(2..=3).contains(&ndim) {
            return Err(TransformError::invalid_input(format!(
                "bad input dimensions; must be 2-d, or 3-d (with channels), got rank {ndim}"
            )));
        }
        let (height, width) = (image.shape()[0] as i64, image.shape()[1] as i64);
        if let Some(mask) = mask {
            if mask.nrows() as i64 != height || mask.ncols() as i64 != width {
                return Err(TransformError::processing(
                    ProcessingStage::Tile,
                    format!(
                        "image and mask dimensions mismatch ({}x{} vs {}x{})",
                        height,
                        width,
                        mask.nrows(),
                        mask.ncols()
                    ),
                ));
            }
        }

        let (tile_w, tile_h) = self.tile_size.resolve(width as usize, height as usize);
        if tile_w < 1 || tile_h < 1 {
            return Err(TransformError::processing(
                ProcessingStage::Tile,
                format!("relative tile size rounds to zero on a {width}x{height} image"),
            ));
        }
        let overlap = (
            (tile_w as f64 * self.tile_overlap).round() as i64,
            (tile_h as f64 * self.tile_overlap).round() as i64,
        );
        // The outward offset is the negative half-overlap, rounded away from
        // the image; the step shrinks by twice the rounded-down half-overlap.
        let offset = if self.offset_overlap {
            (-((overlap.0 + 1) / 2), -((overlap.1 + 1) / 2))
        } else {
            (0, 0)
        };
        let step = (
            (tile_w - (overlap.0 / 2) * 2).max(1),
            (tile_h - (overlap.1 / 2) * 2).max(1),
        );
        let required_area = tile_w as f64 * tile_h as f64 * self.min_mask_iou;

        let anchor = if let Some(mask) = mask {
            let mut found = None;
            'search: for row in offset.1..=(height - offset.1 - tile_h) {
                for col in offset.0..=(width - offset.0 - tile_w) {
                    let count = mask_count(mask, col, row, col + tile_w, row + tile_h);
                    if count as f64 >= required_area {
                        found = Some((
                            offset.0 + ((col - offset.0) % step.0),
                            offset.1 + ((row - offset.1) % step.1),
                        ));
                        break 'search;
                    }
                }
            }
            match found {
                Some(anchor) => anchor,
                None => {
                    debug!(
                        tile_w,
                        tile_h, "no tile placement satisfies the mask requirement"
                    );
                    return Ok(Vec::new());
                }
            }
        } else {
            offset
        };

        let mut rects = Vec::new();
        let mut row = anchor.1;
        while row + tile_h <= height - offset.1 {
            let mut col = anchor.0;
            while col + tile_w <= width - offset.0 {
                let accepted = match mask {
                    Some(mask) => {
                        mask_count(mask, col, row, col + tile_w, row + tile_h) as f64
                            >= required_area
                    }
                    None => true,
                };
                if accepted {
                    rects.push(TileRect {
                        x: col,
                        y: row,
                        width: tile_w,
                        height: tile_h,
                    });
                }
                col += step.0;
            }
            row += step.1;
        }
        Ok(rects)
    }

    /// Extracts the tiles cut out from the given image.
    ///
    /// # Arguments
    ///
    /// * `image` - The image to cut into tiles.
    /// * `mask` - Optional mask gating tile acceptance.
    pub fn tiles(
        &self,
        image: &ImageArray,
        mask: Option<&Mask>,
    ) -> Result<Vec<ImageArray>, TransformError> {
        self.tile_rects(image, mask)?
            .into_iter()
            .map(|rect| {
                safe_crop(
                    image.view(),
                    (rect.x, rect.y),
                    (rect.x + rect.width, rect.y + rect.height),
                    self.border,
                )
                .map(|tile| tile.into_shared())
            })
            .collect()
    }

    /// Returns the number of tiles [`Tile::tiles`] would produce for the
    /// same inputs, by re-running the same placement computation.
    pub fn count_tiles(
        &self,
        image: &ImageArray,
        mask: Option<&Mask>,
    ) -> Result<usize, TransformError> {
        Ok(self.tile_rects(image, mask)?.len())
    }

    /// Returns the grid shape (columns, rows) when the configuration is
    /// lossless and therefore invertible.
    fn lossless_grid(&self) -> Option<(usize, usize)> {
        if self.tile_overlap != 0.0 || self.offset_overlap {
            return None;
        }
        let SizeSpec::Rel(rel_w, rel_h) = self.tile_size else {
            return None;
        };
        let (cols, rows) = (1.0 / rel_w, 1.0 / rel_h);
        let integral = |v: f64| (v - v.round()).abs() < 1e-9 && v.round() >= 1.0;
        if integral(cols) && integral(rows) {
            Some((cols.round() as usize, rows.round() as usize))
        } else {
            None
        }
    }

    /// Reconstitutes the original image from a row-major tile list.
    ///
    /// # Arguments
    ///
    /// * `tiles` - The tiles produced by a mask-free, lossless tiling.
    /// * `mask` - The mask used at tiling time, if any; a mask makes the
    ///   operation lossy and inversion fails immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if a mask was used, the configuration is not
    /// lossless, or the tile list does not match the expected grid.
    pub fn invert_tiles(
        &self,
        tiles: &[ImageArray],
        mask: Option<&Mask>,
    ) -> Result<ImageArray, TransformError> {
        if mask.is_some() {
            return Err(TransformError::not_invertible(
                "Tile",
                "mask might have forced the loss of image content",
            ));
        }
        let (cols, rows) = self.lossless_grid().ok_or_else(|| {
            TransformError::not_invertible(
                "Tile",
                "reconstruction requires zero overlap and a relative tile size \
                 that evenly divides the image",
            )
        })?;
        if tiles.len() != cols * rows {
            return Err(TransformError::invalid_input(format!(
                "expected {} tiles for a {cols}x{rows} grid, got {}",
                cols * rows,
                tiles.len()
            )));
        }

        let first_shape = tiles[0].shape().to_vec();
        if !(2..=3).contains(&first_shape.len()) {
            return Err(TransformError::invalid_input(
                "tiles must be rank 2 or rank 3",
            ));
        }
        if tiles.iter().any(|t| t.shape() != first_shape.as_slice()) {
            return Err(TransformError::invalid_input(
                "all tiles must have the same shape",
            ));
        }
        let (tile_h, tile_w) = (first_shape[0], first_shape[1]);
        let channels = first_shape.get(2).copied();

        let mut out_shape = vec![rows * tile_h, cols * tile_w];
        if let Some(c) = channels {
            out_shape.push(c);
        }
        let mut out = ndarray::ArrayD::<f32>::zeros(ndarray::IxDyn(&out_shape));
        for (index, tile) in tiles.iter().enumerate() {
            let (row, col) = (index / cols, index % cols);
            let (y0, x0) = ((row * tile_h) as isize, (col * tile_w) as isize);
            let (y1, x1) = (y0 + tile_h as isize, x0 + tile_w as isize);
            match channels {
                Some(_) => out
                    .slice_mut(s![y0..y1, x0..x1, ..])
                    .assign(&tile.view()),
                None => out.slice_mut(s![y0..y1, x0..x1]).assign(&tile.view()),
            }
        }
        Ok(out.into_shared())
    }
}

impl TryFrom<TileConfig> for Tile {
    type Error = ConfigError;

    fn try_from(config: TileConfig) -> Result<Self, Self::Error> {
        Tile::new(
            config.tile_size,
            config.tile_overlap,
            config.min_mask_iou,
            config.offset_overlap,
            config.border,
        )
    }
}

impl Transform for Tile {
    fn name(&self) -> &'static str {
        "Tile"
    }

    fn apply(&self, sample: Sample) -> Result<Sample, TransformError> {
        let image = sample.into_single_array(self.name())?;
        let tiles = self.tiles(&image, None)?;
        Ok(Sample::List(tiles.into_iter().map(ImageData::Array).collect()))
    }

    fn as_invertible(&self) -> Option<&dyn InvertibleTransform> {
        if self.lossless_grid().is_some() {
            Some(self)
        } else {
            None
        }
    }
}

impl InvertibleTransform for Tile {
    fn invert(&self, sample: Sample) -> Result<Sample, TransformError> {
        let tiles = match sample {
            Sample::List(images) => images
                .into_iter()
                .map(ImageData::into_array)
                .collect::<Vec<_>>(),
            Sample::Single(_) => {
                return Err(TransformError::invalid_input(
                    "expected a list of tiles, got a single image",
                ));
            }
        };
        Ok(Sample::from_array(self.invert_tiles(&tiles, None)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    fn gray(height: usize, width: usize) -> ImageArray {
        Array2::from_shape_fn((height, width), |(y, x)| (y * width + x) as f32)
            .into_dyn()
            .into_shared()
    }

    fn plain_tile(size: SizeSpec) -> Tile {
        Tile::new(size, 0.0, 1.0, false, BorderMode::default()).unwrap()
    }

    #[test]
    fn test_even_grid_without_mask() {
        let tile = plain_tile(SizeSpec::Abs(4, 4));
        let rects = tile.tile_rects(&gray(8, 8), None).unwrap();
        assert_eq!(
            rects,
            vec![
                TileRect { x: 0, y: 0, width: 4, height: 4 },
                TileRect { x: 4, y: 0, width: 4, height: 4 },
                TileRect { x: 0, y: 4, width: 4, height: 4 },
                TileRect { x: 4, y: 4, width: 4, height: 4 },
            ]
        );
        let tiles = tile.tiles(&gray(8, 8), None).unwrap();
        assert_eq!(tiles.len(), 4);
        assert_eq!(tiles[0].shape(), &[4, 4]);
    }

    #[test]
    fn test_count_matches_apply_with_and_without_mask() {
        let image = gray(10, 10);
        let tile = plain_tile(SizeSpec::Abs(3, 3));
        assert_eq!(
            tile.count_tiles(&image, None).unwrap(),
            tile.tiles(&image, None).unwrap().len()
        );

        let mut mask = Mask::zeros((10, 10));
        mask.slice_mut(s![0..6, 0..6]).fill(1);
        let gated = Tile::new(SizeSpec::Abs(3, 3), 0.0, 1.0, false, BorderMode::default()).unwrap();
        assert_eq!(
            gated.count_tiles(&image, Some(&mask)).unwrap(),
            gated.tiles(&image, Some(&mask)).unwrap().len()
        );
    }

    #[test]
    fn test_mask_gates_tile_acceptance() {
        let image = gray(8, 8);
        // Only the left half of the image is covered.
        let mut mask = Mask::zeros((8, 8));
        mask.slice_mut(s![.., 0..4]).fill(1);
        let tile = plain_tile(SizeSpec::Abs(4, 4));
        let rects = tile.tile_rects(&image, Some(&mask)).unwrap();
        assert_eq!(
            rects,
            vec![
                TileRect { x: 0, y: 0, width: 4, height: 4 },
                TileRect { x: 0, y: 4, width: 4, height: 4 },
            ]
        );
    }

    #[test]
    fn test_mask_anchor_aligns_grid_to_first_acceptance() {
        // Coverage starts at column 2; with a relaxed IoU the first accepted
        // placement anchors the lattice at x = 2 modulo the step.
        let image = gray(8, 12);
        let mut mask = Mask::zeros((8, 12));
        mask.slice_mut(s![.., 2..12]).fill(1);
        let tile = Tile::new(SizeSpec::Abs(4, 4), 0.0, 1.0, false, BorderMode::default()).unwrap();
        let rects = tile.tile_rects(&image, Some(&mask)).unwrap();
        assert!(!rects.is_empty());
        for rect in &rects {
            assert_eq!((rect.x - 2).rem_euclid(4), 0);
        }
    }

    #[test]
    fn test_unsatisfiable_mask_yields_empty_list() {
        let image = gray(8, 8);
        let mask = Mask::zeros((8, 8));
        let tile = plain_tile(SizeSpec::Abs(4, 4));
        assert_eq!(tile.tiles(&image, Some(&mask)).unwrap().len(), 0);
        assert_eq!(tile.count_tiles(&image, Some(&mask)).unwrap(), 0);
    }

    #[test]
    fn test_mask_shape_mismatch_is_rejected() {
        let image = gray(8, 8);
        let mask = Mask::zeros((4, 4));
        let tile = plain_tile(SizeSpec::Abs(4, 4));
        assert!(tile.tile_rects(&image, Some(&mask)).is_err());
    }

    #[test]
    fn test_overlap_shrinks_the_step() {
        let tile = Tile::new(SizeSpec::Abs(4, 4), 0.5, 1.0, false, BorderMode::default()).unwrap();
        let rects = tile.tile_rects(&gray(8, 8), None).unwrap();
        // Step is 4 - (2/2)*2 = 2, so columns advance by 2.
        assert!(rects.len() > 4);
        assert_eq!(rects[1].x - rects[0].x, 2);
    }

    #[test]
    fn test_rgb_tiles_keep_channels() {
        let image = Array3::<f32>::zeros((8, 8, 3)).into_dyn().into_shared();
        let tile = plain_tile(SizeSpec::Abs(4, 4));
        let tiles = tile.tiles(&image, None).unwrap();
        assert_eq!(tiles[0].shape(), &[4, 4, 3]);
    }

    #[test]
    fn test_lossless_invert_round_trip() {
        let image = gray(8, 8);
        let tile = plain_tile(SizeSpec::Rel(0.5, 0.5));
        let tiles = tile.tiles(&image, None).unwrap();
        assert_eq!(tiles.len(), 4);
        let restored = tile.invert_tiles(&tiles, None).unwrap();
        assert_eq!(restored, image);
    }

    #[test]
    fn test_invert_refused_for_lossy_configurations() {
        // Absolute tile size: the original extent is unknown.
        let absolute = plain_tile(SizeSpec::Abs(4, 4));
        assert!(Transform::as_invertible(&absolute).is_none());

        // Overlap: reconstruction would require a blending policy.
        let overlapping =
            Tile::new(SizeSpec::Rel(0.5, 0.5), 0.25, 1.0, false, BorderMode::default()).unwrap();
        assert!(Transform::as_invertible(&overlapping).is_none());

        // Lossless configuration, but a mask was used.
        let lossless = plain_tile(SizeSpec::Rel(0.5, 0.5));
        let tiles = lossless.tiles(&gray(8, 8), None).unwrap();
        let mask = Mask::zeros((8, 8));
        assert!(matches!(
            lossless.invert_tiles(&tiles, Some(&mask)).unwrap_err(),
            TransformError::NotInvertible { .. }
        ));
    }

    #[test]
    fn test_invert_rejects_wrong_tile_count() {
        let tile = plain_tile(SizeSpec::Rel(0.5, 0.5));
        let tiles = tile.tiles(&gray(8, 8), None).unwrap();
        assert!(tile.invert_tiles(&tiles[..3], None).is_err());
    }

    #[test]
    fn test_construction_validation() {
        assert!(Tile::new(SizeSpec::Abs(4, 4), 1.0, 1.0, false, BorderMode::default()).is_err());
        assert!(Tile::new(SizeSpec::Abs(4, 4), -0.1, 1.0, false, BorderMode::default()).is_err());
        assert!(Tile::new(SizeSpec::Abs(4, 4), 0.0, 1.5, false, BorderMode::default()).is_err());
        assert!(Tile::new(SizeSpec::Abs(0, 4), 0.0, 1.0, false, BorderMode::default()).is_err());
    }
}
