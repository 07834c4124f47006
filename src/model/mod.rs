//! Reconstruction models used to produce the second image of a comparison.

mod onnx;

pub use onnx::OnnxReconstructor;

use ndarray::{Array3, Array4, ArrayView3, ArrayView4, Axis};

use crate::error::{Error, Result};

/// A model that maps a batch of images to their reconstructions.
///
/// Input and output are NHWC batches with values in [0, 1]. Any
/// `FnMut(ArrayView4<f32>) -> Result<Array4<f32>>` is a reconstructor.
pub trait Reconstructor {
    /// Reconstruct every image of `batch`.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails or produces an unusable output.
    fn reconstruct(&mut self, batch: ArrayView4<'_, f32>) -> Result<Array4<f32>>;
}

impl<F> Reconstructor for F
where
    F: FnMut(ArrayView4<'_, f32>) -> Result<Array4<f32>>,
{
    fn reconstruct(&mut self, batch: ArrayView4<'_, f32>) -> Result<Array4<f32>> {
        self(batch)
    }
}

/// Reconstruct a single `[H, W, C]` image by running it as a batch of one.
///
/// # Errors
///
/// Returns an error if the model fails or returns an empty batch.
pub fn reconstruct_image<R>(model: &mut R, image: ArrayView3<'_, f32>) -> Result<Array3<f32>>
where
    R: Reconstructor + ?Sized,
{
    let output = model.reconstruct(image.insert_axis(Axis(0)))?;

    if output.len_of(Axis(0)) == 0 {
        return Err(Error::ShapeMismatch {
            expected: "batch with at least one reconstruction".to_string(),
            actual: format!("{:?}", output.shape()),
        });
    }

    Ok(output.index_axis_move(Axis(0), 0))
}
