//! Image loading and saving utilities.

mod load;
mod save;

pub use load::load_image;
pub use save::save_image;

pub(crate) use save::to_rgb_image;

use ndarray::Array3;

/// Single image in HWC format (height, width, channels).
/// Values are normalized to [0, 1].
pub type ImageArray = Array3<f32>;

/// Number of channels in RGB images.
pub const RGB_CHANNELS: usize = 3;

/// Number of channels in grayscale images.
pub const GRAY_CHANNELS: usize = 1;
