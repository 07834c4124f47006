//! Image similarity and difference measures.

mod residual;
mod ssim;

pub use residual::residual_map;
pub use ssim::{ms_ssim, ssim, SsimConfig, MS_SSIM_POWER_FACTORS};
