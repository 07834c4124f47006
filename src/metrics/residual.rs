//! Residual maps between original and reconstructed images.

use std::ops::Sub;

use ndarray::{Array, ArrayBase, Data, Dimension, Zip};

use crate::error::{Error, Result};

/// Elementwise difference `a - b` of two equally shaped arrays.
///
/// Works for single images and whole batches alike. No broadcasting is
/// performed: both arrays must have exactly the same shape.
///
/// # Arguments
///
/// * `a` - Original image or batch.
/// * `b` - Image or batch subtracted from `a`, typically a reconstruction.
///
/// # Returns
///
/// A new array of the same shape holding `a - b`.
///
/// # Errors
///
/// Returns an error if the shapes differ.
pub fn residual_map<A, S1, S2, D>(a: &ArrayBase<S1, D>, b: &ArrayBase<S2, D>) -> Result<Array<A, D>>
where
    A: Clone + Sub<Output = A>,
    S1: Data<Elem = A>,
    S2: Data<Elem = A>,
    D: Dimension,
{
    if a.shape() != b.shape() {
        return Err(Error::ShapeMismatch {
            expected: format!("{:?}", a.shape()),
            actual: format!("{:?}", b.shape()),
        });
    }

    Ok(Zip::from(a)
        .and(b)
        .map_collect(|x, y| x.clone() - y.clone()))
}
