//! Image saving utilities.

use std::path::Path;

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use ndarray::{ArrayView3, Axis};

use crate::error::{Error, Result};

use super::{GRAY_CHANNELS, RGB_CHANNELS};

/// Save an HWC array as an image file.
///
/// Values are clamped to [0, 1] and scaled to [0, 255]. Single-channel
/// arrays are written as grayscale, three-channel arrays as RGB. The format
/// is inferred from the extension; `quality` only applies to JPEG.
///
/// # Errors
///
/// Returns an error if the channel count is unsupported or the image cannot
/// be written.
pub fn save_image<P: AsRef<Path>>(image: ArrayView3<'_, f32>, path: P, quality: u8) -> Result<()> {
    let path = path.as_ref();

    let img = match image.len_of(Axis(2)) {
        GRAY_CHANNELS => DynamicImage::ImageLuma8(to_gray_image(image)),
        RGB_CHANNELS => DynamicImage::ImageRgb8(to_rgb_image(image)?),
        channels => {
            return Err(Error::UnsupportedChannels {
                channels,
                expected: "1 or 3",
            })
        }
    };

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("png")
        .to_lowercase();

    match extension.as_str() {
        "jpg" | "jpeg" => {
            let mut output = std::fs::File::create(path)?;
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality);
            img.write_with_encoder(encoder)
                .map_err(|source| Error::ImageSave {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        _ => {
            img.save(path).map_err(|source| Error::ImageSave {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }

    Ok(())
}

/// Render an HWC array as RGB, spreading a single channel over all three.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn to_rgb_image(image: ArrayView3<'_, f32>) -> Result<RgbImage> {
    let (height, width, channels) = image.dim();
    if channels != GRAY_CHANNELS && channels != RGB_CHANNELS {
        return Err(Error::UnsupportedChannels {
            channels,
            expected: "1 or 3",
        });
    }

    // Safe: dimensions come from an image buffer or a decoded array
    let mut img = RgbImage::new(width as u32, height as u32);

    for ((y, x, c), &value) in image.indexed_iter() {
        let pixel = img.get_pixel_mut(x as u32, y as u32);
        if channels == GRAY_CHANNELS {
            *pixel = Rgb([denormalize(value); 3]);
        } else {
            pixel[c] = denormalize(value);
        }
    }

    Ok(img)
}

#[allow(clippy::cast_possible_truncation)]
fn to_gray_image(image: ArrayView3<'_, f32>) -> GrayImage {
    let (height, width, _) = image.dim();
    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        Luma([denormalize(image[[y as usize, x as usize, 0]])])
    })
}

/// Denormalize a value from [0, 1] to [0, 255] with clamping.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn denormalize(value: f32) -> u8 {
    // Safe: clamped to [0, 255] range before casting
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}
