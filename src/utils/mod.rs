//! Shared primitives used by the transformation operations.
//!
//! * [`crop`] - Safe bordered cropping (the only place boundary handling
//!   lives).
//! * [`resize`] - Channel-group resampling built on the `image` crate.
//! * [`warp`] - Parallel affine warping.
//! * [`image`] - Conversion between the array and image-object
//!   representations.

pub mod crop;
pub mod image;
pub mod resize;
pub mod warp;

pub use crop::{make_border, safe_crop};
pub use image::{array_to_dynamic, dynamic_to_array};
pub use resize::resize_array;
pub use warp::{translation_matrix, warp_affine};
