//! Positional train/validation split.

use ndarray::{ArcArray, Axis, Dimension, Slice};

/// Index at which the training array is cut: `len * (1 - validation_split)`
/// truncated toward zero.
///
/// The fraction is not validated and out-of-range values behave like a
/// sequence slice: a cut past the end keeps everything for training, and a
/// negative cut counts back from the end, saturating at 0. With `len = 10`,
/// a fraction of 1.5 cuts at 5 and a fraction of 3.0 cuts at 0. NaN cuts at 0.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn split_index(len: usize, validation_split: f64) -> usize {
    if !(0.0..1.0).contains(&validation_split) {
        tracing::warn!(
            "validation split {validation_split} is outside [0, 1); the split will be degenerate"
        );
    }

    let cut = (len as f64 * (1.0 - validation_split)).trunc();

    // Safe: every cast below is of a value already clamped to [0, len]
    if cut.is_nan() {
        0
    } else if cut >= len as f64 {
        len
    } else if cut >= 0.0 {
        cut as usize
    } else if -cut >= len as f64 {
        0
    } else {
        len - (-cut) as usize
    }
}

/// Cut `full` along its first axis into `(train, valid)`.
///
/// The cut is positional: no shuffling and no stratification, so
/// `train ++ valid` reproduces `full` exactly. Both halves share the
/// buffer of `full`.
#[must_use]
pub fn split_train_valid<A, D>(
    full: ArcArray<A, D>,
    validation_split: f64,
) -> (ArcArray<A, D>, ArcArray<A, D>)
where
    D: Dimension,
{
    let total = full.len_of(Axis(0));
    let index = split_index(total, validation_split);

    let mut train = full.clone();
    train.slice_axis_inplace(Axis(0), Slice::from(..index));

    let mut valid = full;
    valid.slice_axis_inplace(Axis(0), Slice::from(index..));

    tracing::debug!(
        "Dataset split: {} training, {} validation (of {total})",
        train.len_of(Axis(0)),
        valid.len_of(Axis(0)),
    );

    (train, valid)
}
