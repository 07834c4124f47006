//! Side-by-side visual comparison of an image with a second image or a
//! model's reconstruction of it.

mod figure;

pub use figure::{Figure, Panel, DEFAULT_GAP};

use std::fmt;

use ndarray::{ArrayView3, Axis, CowArray, Ix3};

use crate::error::{Error, Result};
use crate::image::{GRAY_CHANNELS, RGB_CHANNELS};
use crate::metrics::{ms_ssim, ssim, SsimConfig};
use crate::model::{reconstruct_image, Reconstructor};

/// What the first image is compared against.
pub enum Counterpart<'a> {
    /// An existing image of the same shape.
    Image(ArrayView3<'a, f32>),
    /// A model whose reconstruction of the first image is used.
    Model(&'a mut dyn Reconstructor),
}

impl fmt::Debug for Counterpart<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(image) => f.debug_tuple("Image").field(&image.shape()).finish(),
            Self::Model(_) => f.write_str("Model"),
        }
    }
}

/// Similarity measure chosen from the channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Similarity {
    /// Single-scale SSIM for grayscale images.
    Ssim,
    /// Multiscale SSIM for RGB images.
    MultiscaleSsim,
}

impl Similarity {
    /// # Errors
    ///
    /// Returns an error for channel counts other than 1 and 3.
    pub fn for_channels(channels: usize) -> Result<Self> {
        match channels {
            GRAY_CHANNELS => Ok(Self::Ssim),
            RGB_CHANNELS => Ok(Self::MultiscaleSsim),
            _ => Err(Error::UnsupportedChannels {
                channels,
                expected: "1 or 3",
            }),
        }
    }
}

/// Outcome of a comparison: the score and the figure showing both images.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub similarity: Similarity,
    pub score: f32,
    pub figure: Figure,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.similarity {
            Similarity::MultiscaleSsim => write!(f, "multiscale_SSIM = {:.2}", self.score),
            Similarity::Ssim => write!(f, "SSIM: {:.2}", self.score),
        }
    }
}

/// Compares images using a fixed SSIM configuration.
#[derive(Debug, Clone, Default)]
pub struct Comparator {
    config: SsimConfig,
}

impl Comparator {
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: SsimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &SsimConfig {
        &self.config
    }

    /// Compare `image` with its counterpart and draw both into a new figure.
    ///
    /// With [`Counterpart::Model`] the second image is the model's output for
    /// `image` wrapped in a batch of one.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel count is not 1 or 3, the two images
    /// differ in shape, the model fails, or an image is too small for the
    /// similarity measure.
    pub fn compare(
        &self,
        image: ArrayView3<'_, f32>,
        counterpart: Counterpart<'_>,
    ) -> Result<Comparison> {
        let similarity = Similarity::for_channels(image.len_of(Axis(2)))?;

        let (other, titles): (CowArray<'_, f32, Ix3>, _) = match counterpart {
            Counterpart::Image(other) => (other.into(), ("image 1", "image 2")),
            Counterpart::Model(model) => (
                reconstruct_image(model, image)?.into(),
                ("original", "reconstructed"),
            ),
        };

        if other.shape() != image.shape() {
            return Err(Error::ShapeMismatch {
                expected: format!("{:?}", image.shape()),
                actual: format!("{:?}", other.shape()),
            });
        }

        let mut figure = Figure::new();
        figure.imshow(image, titles.0)?;
        figure.imshow(other.view(), titles.1)?;

        let score = match similarity {
            Similarity::MultiscaleSsim => ms_ssim(image, other.view(), &self.config)?,
            Similarity::Ssim => ssim(image, other.view(), &self.config)?,
        };

        tracing::debug!("{similarity:?} between {} and {}: {score}", titles.0, titles.1);

        Ok(Comparison {
            similarity,
            score,
            figure,
        })
    }
}

/// Compare two images, print the score line to stdout and return the result.
///
/// # Arguments
///
/// * `image` - First image, `[H, W, 1]` or `[H, W, 3]` in [0, 1].
/// * `counterpart` - Second image of the same shape, or a model whose
///   reconstruction of `image` is used instead.
/// * `config` - SSIM constants for the score.
///
/// # Returns
///
/// The [`Comparison`] holding the score and a two-panel [`Figure`].
///
/// # Errors
///
/// See [`Comparator::compare`].
pub fn compare_images(
    image: ArrayView3<'_, f32>,
    counterpart: Counterpart<'_>,
    config: &SsimConfig,
) -> Result<Comparison> {
    let comparison = Comparator::new(config.clone())?.compare(image, counterpart)?;
    println!("{comparison}");
    Ok(comparison)
}
