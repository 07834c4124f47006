//! Image loading utilities.

use std::path::Path;

use image::DynamicImage;
use ndarray::Array3;

use crate::error::{Error, Result};
use crate::preprocess::rgb_to_grayscale;

use super::{ImageArray, RGB_CHANNELS};

/// Load an image from disk and convert to a normalized HWC array.
///
/// The image is converted to RGB and scaled from [0, 255] to [0, 1]. With
/// `grayscale` the RGB channels are then reduced to a single luma channel,
/// giving shape `(height, width, 1)`.
///
/// # Errors
///
/// Returns an error if the image cannot be loaded or decoded.
pub fn load_image<P: AsRef<Path>>(path: P, grayscale: bool) -> Result<ImageArray> {
    let path = path.as_ref();

    let img = image::open(path).map_err(|source| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;

    let rgb = image_to_array(&img);

    if grayscale {
        rgb_to_grayscale(rgb.view())
    } else {
        Ok(rgb)
    }
}

/// Convert a `DynamicImage` to a normalized `(height, width, 3)` array.
fn image_to_array(img: &DynamicImage) -> ImageArray {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut array = Array3::<f32>::zeros((height as usize, width as usize, RGB_CHANNELS));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..RGB_CHANNELS {
            array[[y as usize, x as usize, c]] = f32::from(pixel[c]) / 255.0;
        }
    }

    array
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_array_shape() {
        let img = DynamicImage::new_rgb8(7, 5);
        let array = image_to_array(&img);

        assert_eq!(array.shape(), &[5, 7, 3]);
    }

    #[test]
    fn test_normalization_range() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([0, 0, 0]));
        img.put_pixel(1, 0, Rgb([255, 255, 255]));
        let array = image_to_array(&DynamicImage::ImageRgb8(img));

        assert!(array[[0, 0, 0]].abs() < f32::EPSILON);
        assert!((array[[0, 1, 2]] - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_load_grayscale_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("white.png");
        RgbImage::from_pixel(4, 3, Rgb([255, 255, 255]))
            .save(&path)
            .unwrap();

        let gray = load_image(&path, true).unwrap();
        assert_eq!(gray.shape(), &[3, 4, 1]);
        assert!((gray[[1, 1, 0]] - 0.9999).abs() < 1e-3);
    }

    #[test]
    fn test_missing_image() {
        let result = load_image("/nonexistent/image.png", false);
        assert!(matches!(result, Err(Error::ImageLoad { .. })));
    }
}
