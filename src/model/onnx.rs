//! ONNX Runtime backed reconstruction model.

use std::path::{Path, PathBuf};

use ndarray::{Array4, ArrayView4};
use ort::session::Session;
use ort::value::Tensor;

use crate::error::{Error, Result};

use super::Reconstructor;

/// An autoencoder exported to ONNX.
///
/// The batch is fed as the model's first input and the first output is read
/// back as a 4-D array in the same NHWC layout.
pub struct OnnxReconstructor {
    session: Session,
    path: PathBuf,
}

impl OnnxReconstructor {
    /// Load an ONNX model session from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        tracing::info!("Loading reconstruction model from {}", path.display());

        let session = Session::builder()
            .map_err(|source| Error::ModelLoad {
                path: path.to_path_buf(),
                source,
            })?
            .commit_from_file(path)
            .map_err(|source| Error::ModelLoad {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            session,
            path: path.to_path_buf(),
        })
    }

    /// Path the model was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Reconstructor for OnnxReconstructor {
    fn reconstruct(&mut self, batch: ArrayView4<'_, f32>) -> Result<Array4<f32>> {
        let input_value =
            Tensor::from_array(batch.to_owned()).map_err(|source| Error::Inference { source })?;

        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(|source| Error::Inference { source })?;

        let output = outputs
            .values()
            .next()
            .ok_or_else(|| Error::ShapeMismatch {
                expected: "reconstruction output".to_string(),
                actual: "no output".to_string(),
            })?;

        let reconstruction = extract_array4(&output)?;

        tracing::debug!(
            "Reconstructed batch {:?} -> {:?}",
            batch.shape(),
            reconstruction.shape()
        );

        Ok(reconstruction)
    }
}

/// Extract a 4D array from an ONNX value.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn extract_array4(value: &ort::value::ValueRef<'_>) -> Result<Array4<f32>> {
    let (shape_info, data) = value
        .try_extract_tensor::<f32>()
        .map_err(|source| Error::Inference { source })?;

    // Safe: tensor dimensions are always non-negative and within bounds
    let dims: Vec<usize> = shape_info.iter().map(|&x| x as usize).collect();

    if dims.len() != 4 {
        return Err(Error::ShapeMismatch {
            expected: "4D tensor".to_string(),
            actual: format!("{}D tensor", dims.len()),
        });
    }

    Array4::from_shape_vec((dims[0], dims[1], dims[2], dims[3]), data.to_vec()).map_err(|_| {
        Error::ShapeMismatch {
            expected: format!("{dims:?}"),
            actual: "reshape failed".to_string(),
        }
    })
}
