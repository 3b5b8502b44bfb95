//! Conversion between the array and image-object representations.
//!
//! The array side is `f32` with values in the 0..=255 range; the image-object
//! side is the 8-bit `DynamicImage`. Conversion to the object representation
//! rounds and clamps, so it is lossy for arrays holding non-8-bit data.
//! Grayscale objects convert back to rank-2 arrays; everything else keeps an
//! explicit channel axis.

use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};
use ndarray::{ArrayD, Axis, Ix3, IxDyn};

use crate::core::errors::{ProcessingStage, TransformError};
use crate::core::sample::ImageArray;

/// Converts an image object into the `f32` array representation.
///
/// Grayscale images produce rank-2 arrays; multi-channel images produce
/// H×W×C arrays. Exotic pixel formats are first converted to RGB, the way
/// unknown formats are handled throughout the crate.
pub fn dynamic_to_array(image: &DynamicImage) -> ImageArray {
    fn from_bytes(height: usize, width: usize, channels: usize, bytes: &[u8]) -> ImageArray {
        let data: Vec<f32> = bytes.iter().map(|&b| f32::from(b)).collect();
        let shape = if channels == 1 {
            IxDyn(&[height, width])
        } else {
            IxDyn(&[height, width, channels])
        };
        ArrayD::from_shape_vec(shape, data)
            .expect("buffer length matches image dimensions")
            .into_shared()
    }

    let (width, height) = (image.width() as usize, image.height() as usize);
    match image {
        DynamicImage::ImageLuma8(buf) => from_bytes(height, width, 1, buf.as_raw()),
        DynamicImage::ImageLumaA8(buf) => from_bytes(height, width, 2, buf.as_raw()),
        DynamicImage::ImageRgb8(buf) => from_bytes(height, width, 3, buf.as_raw()),
        DynamicImage::ImageRgba8(buf) => from_bytes(height, width, 4, buf.as_raw()),
        other => {
            let rgb = other.to_rgb8();
            from_bytes(height, width, 3, rgb.as_raw())
        }
    }
}

/// Converts an `f32` array into the image-object representation.
///
/// Values are rounded and clamped to 0..=255. Rank-2 and single-channel
/// arrays become grayscale objects; 2, 3 and 4 channels become gray+alpha,
/// RGB and RGBA respectively.
///
/// # Errors
///
/// Returns an error if the array rank is unsupported or the channel count
/// has no image-object counterpart.
pub fn array_to_dynamic(array: &ImageArray) -> Result<DynamicImage, TransformError> {
    let view = match array.ndim() {
        2 => array.view().insert_axis(Axis(2)),
        3 => array.view(),
        ndim => {
            return Err(TransformError::invalid_input(format!(
                "bad input dimensions; must be 2-d, or 3-d (with channels), got rank {ndim}"
            )));
        }
    };
    let view = view.into_dimensionality::<Ix3>()?;
    let (height, width, channels) = view.dim();
    let bytes: Vec<u8> = view
        .iter()
        .map(|&v| v.round().clamp(0.0, 255.0) as u8)
        .collect();
    let (w, h) = (width as u32, height as u32);

    let image = match channels {
        1 => GrayImage::from_raw(w, h, bytes).map(DynamicImage::ImageLuma8),
        2 => GrayAlphaImage::from_raw(w, h, bytes).map(DynamicImage::ImageLumaA8),
        3 => RgbImage::from_raw(w, h, bytes).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(w, h, bytes).map(DynamicImage::ImageRgba8),
        c => {
            return Err(TransformError::processing(
                ProcessingStage::Conversion,
                format!("cannot represent a {c}-channel array as an image object"),
            ));
        }
    };
    image.ok_or_else(|| {
        TransformError::processing(
            ProcessingStage::Conversion,
            "image buffer allocation failed".to_string(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use ndarray::Array3;

    #[test]
    fn test_rgb_round_trip() {
        let mut img = RgbImage::new(2, 2);
        img.put_pixel(0, 0, Rgb([10, 20, 30]));
        img.put_pixel(1, 1, Rgb([200, 100, 50]));
        let array = dynamic_to_array(&DynamicImage::ImageRgb8(img.clone()));
        assert_eq!(array.shape(), &[2, 2, 3]);
        assert_eq!(array[[0, 0, 2]], 30.0);
        let back = array_to_dynamic(&array).unwrap();
        assert_eq!(back.to_rgb8().as_raw(), img.as_raw());
    }

    #[test]
    fn test_gray_object_becomes_rank_2() {
        let img = GrayImage::from_pixel(3, 2, image::Luma([128]));
        let array = dynamic_to_array(&DynamicImage::ImageLuma8(img));
        assert_eq!(array.shape(), &[2, 3]);
        assert_eq!(array[[1, 2]], 128.0);
    }

    #[test]
    fn test_values_are_rounded_and_clamped() {
        let array = Array3::from_shape_vec((1, 1, 3), vec![-5.0, 127.6, 300.0])
            .unwrap()
            .into_dyn()
            .into_shared();
        let image = array_to_dynamic(&array).unwrap();
        let pixel = image.to_rgb8().get_pixel(0, 0).0;
        assert_eq!(pixel, [0, 128, 255]);
    }

    #[test]
    fn test_unsupported_channel_count_is_rejected() {
        let array = ArrayD::<f32>::zeros(IxDyn(&[2, 2, 6])).into_shared();
        assert!(array_to_dynamic(&array).is_err());
    }
}
