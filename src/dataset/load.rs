//! Loading the pre-split MVTec arrays from disk.

use std::path::Path;

use ndarray::{Array1, Array4, Axis};
use ndarray_npy::{read_npy, ReadNpyError};

use crate::error::{Error, Result};

use super::split::split_train_valid;
use super::{ImageBatch, LabelArray, MvtecSplits, OutputFormat};

/// Full training images, `[N, H, W, C]`.
pub const TRAIN_IMAGES_FILE: &str = "X_train.npy";

/// Test images, `[N, H, W, C]`.
pub const TEST_IMAGES_FILE: &str = "X_test.npy";

/// Test labels, `[N]`.
pub const TEST_LABELS_FILE: &str = "y_test.npy";

/// Names of the three arrays inside a dataset directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetFiles {
    pub train_images: String,
    pub test_images: String,
    pub test_labels: String,
}

impl Default for DatasetFiles {
    fn default() -> Self {
        Self {
            train_images: TRAIN_IMAGES_FILE.to_string(),
            test_images: TEST_IMAGES_FILE.to_string(),
            test_labels: TEST_LABELS_FILE.to_string(),
        }
    }
}

impl DatasetFiles {
    /// Validate the file names.
    ///
    /// # Errors
    ///
    /// Returns an error if any name is empty.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("train_images", &self.train_images),
            ("test_images", &self.test_images),
            ("test_labels", &self.test_labels),
        ] {
            if value.is_empty() {
                return Err(Error::InvalidParameter {
                    name: name.to_string(),
                    reason: "file name must not be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Load the training array, split it, then load the test images and labels.
    ///
    /// The training array is cut positionally at
    /// `floor(N * (1 - validation_split))`. With [`OutputFormat::Array`] the
    /// three image batches are converted to owned arrays; labels are returned
    /// as read.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the three files is missing, corrupt or has
    /// the wrong rank. Nothing is returned on partial success.
    pub fn load<P: AsRef<Path>>(
        &self,
        dir: P,
        validation_split: f64,
        format: OutputFormat,
    ) -> Result<MvtecSplits> {
        self.validate()?;
        let dir = dir.as_ref();

        tracing::info!("Loading MVTec arrays from {}", dir.display());

        let train_full = read_images(&dir.join(&self.train_images))?.into_shared();
        let (train, valid) = split_train_valid(train_full, validation_split);

        let test = read_images(&dir.join(&self.test_images))?.into_shared();
        let test_labels = read_labels(&dir.join(&self.test_labels))?;

        if test.len_of(Axis(0)) != test_labels.len() {
            tracing::warn!(
                "{} test images but {} test labels",
                test.len_of(Axis(0)),
                test_labels.len()
            );
        }

        let splits = MvtecSplits {
            train: ImageBatch::from_tensor(train, format),
            valid: ImageBatch::from_tensor(valid, format),
            test: ImageBatch::from_tensor(test, format),
            test_labels,
        };

        tracing::info!(
            "Loaded train {:?}, valid {:?}, test {:?}, labels [{}]",
            splits.train.dim(),
            splits.valid.dim(),
            splits.test.dim(),
            splits.test_labels.len()
        );

        Ok(splits)
    }
}

/// Load `X_train.npy`, `X_test.npy` and `y_test.npy` from `dir`.
///
/// Convenience wrapper over [`DatasetFiles::load`] with the default names.
///
/// # Arguments
///
/// * `dir` - Directory holding the three arrays
/// * `validation_split` - Fraction of the training images held out for validation
/// * `format` - Whether image batches are returned as shared tensors or owned arrays
///
/// # Returns
///
/// The train, validation and test batches plus the test labels, in on-disk order.
///
/// # Errors
///
/// Returns an error if any of the arrays cannot be read.
pub fn load_mvtec_data<P: AsRef<Path>>(
    dir: P,
    validation_split: f64,
    format: OutputFormat,
) -> Result<MvtecSplits> {
    DatasetFiles::default().load(dir, validation_split, format)
}

/// Read a 4-D image array stored as `f32`, or as `f64` narrowed to `f32`.
#[allow(clippy::cast_possible_truncation)]
fn read_images(path: &Path) -> Result<Array4<f32>> {
    match read_npy::<_, Array4<f32>>(path) {
        Err(ReadNpyError::WrongDescriptor(_)) => {}
        other => return other.map_err(|source| array_read(path, source)),
    }

    tracing::debug!("{} is not f32, reading as f64", path.display());
    read_npy::<_, Array4<f64>>(path)
        .map(|array| array.mapv(|value| value as f32))
        .map_err(|source| array_read(path, source))
}

/// Read a 1-D label array in whatever element type it was stored with.
fn read_labels(path: &Path) -> Result<LabelArray> {
    // Try each readable element type until the descriptor matches.
    macro_rules! try_read {
        ($variant:ident, $elem:ty) => {
            match read_npy::<_, Array1<$elem>>(path) {
                Err(ReadNpyError::WrongDescriptor(_)) => {}
                other => {
                    return other
                        .map(LabelArray::$variant)
                        .map_err(|source| array_read(path, source))
                }
            }
        };
    }

    try_read!(I64, i64);
    try_read!(I32, i32);
    try_read!(I16, i16);
    try_read!(I8, i8);
    try_read!(U64, u64);
    try_read!(U32, u32);
    try_read!(U16, u16);
    try_read!(U8, u8);
    try_read!(Bool, bool);
    try_read!(F32, f32);

    read_npy::<_, Array1<f64>>(path)
        .map(LabelArray::F64)
        .map_err(|source| array_read(path, source))
}

fn array_read(path: &Path, source: ReadNpyError) -> Error {
    Error::ArrayRead {
        path: path.to_path_buf(),
        source,
    }
}
