//! The transformation operation set.
//!
//! Each operation is a self-contained, construction-validated transform:
//!
//! * `convert` - Representation conversion into numeric arrays
//! * `crop` - Deterministic center cropping
//! * `random_crop` - Randomized crop-and-resize sampling
//! * `resize` - Deterministic resizing with channel-group support
//! * `warp` - Affine warps and random translation
//! * `transpose` - Axis permutation (always invertible)
//! * `duplicate` - Sample duplication (fan-out)
//! * `tile` - Tiling with optional mask-gated placement (fan-out)
//! * `normalize` - Per-channel affine normalization
//! * `types` - Parameter types shared across operations

pub mod convert;
pub mod crop;
pub mod duplicate;
pub mod normalize;
pub mod random_crop;
pub mod resize;
pub mod tile;
pub mod transpose;
pub mod types;
pub mod warp;

pub use convert::{ToArray, ToArrayConfig};
pub use crop::{CenterCrop, CenterCropConfig};
pub use duplicate::{Duplicator, DuplicatorConfig};
pub use normalize::{
    NormalizeMinMax, NormalizeMinMaxConfig, NormalizeZeroMeanUnitVar,
    NormalizeZeroMeanUnitVarConfig,
};
pub use random_crop::{RandomResizedCrop, RandomResizedCropConfig, RegionSampling};
pub use resize::{Resize, ResizeConfig};
pub use tile::{Tile, TileConfig, TileRect};
pub use transpose::{Transpose, TransposeConfig};
pub use types::{AxisPair, BorderMode, Interpolation, SizeRange, SizeSpec};
pub use warp::{Affine, AffineConfig, RandomShift, RandomShiftConfig};
