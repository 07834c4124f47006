//! Conversion of image arrays into the representation a reconstruction loss expects.

use std::fmt;
use std::str::FromStr;

use ndarray::{ArcArray, Array, ArrayView, Axis, Dimension, Zip};

use crate::error::{Error, Result};
use crate::image::RGB_CHANNELS;

/// Luma weights applied to the R, G and B channels.
pub const LUMA_WEIGHTS: [f32; 3] = [0.2989, 0.5870, 0.1140];

/// Reconstruction loss a model is trained or evaluated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    /// Single-scale SSIM, computed on one luma channel.
    Ssim,
    /// Multiscale SSIM, computed on RGB.
    MsSsim,
    /// Pixelwise squared error.
    L2,
}

impl Loss {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ssim => "SSIM",
            Self::MsSsim => "MSSSIM",
            Self::L2 => "L2",
        }
    }

    /// Whether inputs must be reduced to a single channel for this loss.
    #[must_use]
    pub const fn needs_grayscale(self) -> bool {
        matches!(self, Self::Ssim)
    }
}

impl fmt::Display for Loss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Loss {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SSIM" => Ok(Self::Ssim),
            "MSSSIM" | "MSSIM" | "MS-SSIM" => Ok(Self::MsSsim),
            "L2" | "MSE" => Ok(Self::L2),
            _ => Err(Error::InvalidParameter {
                name: "loss".to_string(),
                reason: format!("unknown loss {s:?}, expected SSIM, MSSSIM or L2"),
            }),
        }
    }
}

/// Convert images into a tensor suitable for `loss`.
///
/// For [`Loss::Ssim`] the trailing channel axis is reduced from RGB to one
/// luma channel; every other loss receives the data unchanged. Works for a
/// single `[H, W, C]` image as well as a `[N, H, W, C]` batch.
///
/// # Errors
///
/// Returns an error if grayscale conversion is required and the last axis
/// does not hold 3 channels.
pub fn preprocess_tensor<D: Dimension>(
    images: ArrayView<'_, f32, D>,
    loss: Loss,
) -> Result<ArcArray<f32, D>> {
    if loss.needs_grayscale() {
        Ok(rgb_to_grayscale(images)?.into_shared())
    } else {
        Ok(images.to_shared())
    }
}

/// Reduce the trailing RGB axis to a single luma channel, keeping the rank.
///
/// # Errors
///
/// Returns an error if the array has no axes or its last axis is not 3 long.
pub fn rgb_to_grayscale<D: Dimension>(images: ArrayView<'_, f32, D>) -> Result<Array<f32, D>> {
    let last = images
        .ndim()
        .checked_sub(1)
        .ok_or_else(|| Error::ShapeMismatch {
            expected: "array with a channel axis".to_string(),
            actual: "0-D array".to_string(),
        })?;

    let channels = images.len_of(Axis(last));
    if channels != RGB_CHANNELS {
        return Err(Error::UnsupportedChannels {
            channels,
            expected: "3",
        });
    }

    let mut dim = images.raw_dim();
    dim[last] = 1;
    let mut gray = Array::zeros(dim);

    Zip::from(gray.lanes_mut(Axis(last)))
        .and(images.lanes(Axis(last)))
        .for_each(|mut out, rgb| {
            out[0] = LUMA_WEIGHTS[0].mul_add(
                rgb[0],
                LUMA_WEIGHTS[1].mul_add(rgb[1], LUMA_WEIGHTS[2] * rgb[2]),
            );
        });

    Ok(gray)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3, Array4};

    #[test]
    fn test_ssim_reduces_to_one_channel() {
        let batch = Array4::<f32>::from_elem((2, 4, 5, 3), 0.5);
        let tensor = preprocess_tensor(batch.view(), Loss::Ssim).unwrap();

        assert_eq!(tensor.shape(), &[2, 4, 5, 1]);
        assert!((tensor[[1, 3, 4, 0]] - 0.49995).abs() < 1e-5);
    }

    #[test]
    fn test_other_losses_pass_through() {
        let image = Array3::<f32>::from_shape_fn((3, 3, 3), |(y, x, c)| {
            #[allow(clippy::cast_precision_loss)]
            let v = (y * 9 + x * 3 + c) as f32;
            v / 27.0
        });

        for loss in [Loss::MsSsim, Loss::L2] {
            let tensor = preprocess_tensor(image.view(), loss).unwrap();
            assert_eq!(tensor, image);
        }
    }

    #[test]
    fn test_luma_weights() {
        let pixels = array![[[1.0_f32, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]];
        let gray = rgb_to_grayscale(pixels.view()).unwrap();

        assert_eq!(gray.shape(), &[1, 3, 1]);
        assert!((gray[[0, 0, 0]] - 0.2989).abs() < 1e-6);
        assert!((gray[[0, 1, 0]] - 0.5870).abs() < 1e-6);
        assert!((gray[[0, 2, 0]] - 0.1140).abs() < 1e-6);
    }

    #[test]
    fn test_grayscale_rejects_single_channel() {
        let image = Array3::<f32>::zeros((4, 4, 1));
        let result = preprocess_tensor(image.view(), Loss::Ssim);

        assert!(matches!(
            result,
            Err(Error::UnsupportedChannels { channels: 1, .. })
        ));
    }

    #[test]
    fn test_loss_from_str() {
        assert_eq!("ssim".parse::<Loss>().unwrap(), Loss::Ssim);
        assert_eq!("MSSSIM".parse::<Loss>().unwrap(), Loss::MsSsim);
        assert_eq!("l2".parse::<Loss>().unwrap(), Loss::L2);
        assert!("perceptual".parse::<Loss>().is_err());
    }
}
