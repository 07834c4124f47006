//! # mvtec-ad
//!
//! Helpers for reconstruction-based anomaly detection on the MVTec dataset.
//!
//! The crate loads the pre-serialized `X_train.npy`, `X_test.npy` and
//! `y_test.npy` arrays and cuts a validation set off the end of the training
//! images, prepares images for an SSIM or MS-SSIM loss, compares an image with
//! a model's reconstruction of it, and computes residual maps.
//!
//! ## Example
//!
//! ```no_run
//! use mvtec_ad::compare::{Comparator, Counterpart};
//! use mvtec_ad::dataset::{load_mvtec_data, OutputFormat};
//! use mvtec_ad::metrics::residual_map;
//! use ndarray::{s, Axis};
//!
//! # fn main() -> mvtec_ad::Result<()> {
//! let splits = load_mvtec_data("data/bottle", 0.1, OutputFormat::Tensor)?;
//! let test = splits.test.view();
//!
//! let first = test.index_axis(Axis(0), 0);
//! let second = test.index_axis(Axis(0), 1);
//! let comparison = Comparator::default().compare(first, Counterpart::Image(second))?;
//! println!("{comparison}");
//!
//! let residual = residual_map(&test.slice(s![..2, .., .., ..]), &test.slice(s![2..4, .., .., ..]))?;
//! # let _ = residual;
//! # Ok(())
//! # }
//! ```

pub mod compare;
pub mod dataset;
pub mod error;
pub mod image;
pub mod metrics;
pub mod model;
pub mod preprocess;

pub use compare::{compare_images, Comparator, Comparison, Counterpart};
pub use dataset::{load_mvtec_data, MvtecSplits, OutputFormat};
pub use error::{Error, Result};
pub use metrics::{residual_map, SsimConfig};
pub use preprocess::{preprocess_tensor, Loss};
