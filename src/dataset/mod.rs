//! MVTec dataset loading and train/validation splitting.

mod load;
mod split;

pub use load::{
    load_mvtec_data, DatasetFiles, TEST_IMAGES_FILE, TEST_LABELS_FILE, TRAIN_IMAGES_FILE,
};
pub use split::{split_index, split_train_valid};

use ndarray::{ArcArray, Array1, Array4, ArrayView4, Axis, Ix4};

/// Image batch in the crate's tensor representation: NHWC, values in [0, 1].
/// The buffer is reference counted, so slicing a tensor never copies pixels.
pub type ImageTensor = ArcArray<f32, Ix4>;

/// Test labels, parallel-indexed to the test images, in the element type
/// they were stored with.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelArray {
    Bool(Array1<bool>),
    I8(Array1<i8>),
    I16(Array1<i16>),
    I32(Array1<i32>),
    I64(Array1<i64>),
    U8(Array1<u8>),
    U16(Array1<u16>),
    U32(Array1<u32>),
    U64(Array1<u64>),
    F32(Array1<f32>),
    F64(Array1<f64>),
}

macro_rules! each_labels {
    ($value:expr, $labels:ident => $body:expr) => {
        match $value {
            LabelArray::Bool($labels) => $body,
            LabelArray::I8($labels) => $body,
            LabelArray::I16($labels) => $body,
            LabelArray::I32($labels) => $body,
            LabelArray::I64($labels) => $body,
            LabelArray::U8($labels) => $body,
            LabelArray::U16($labels) => $body,
            LabelArray::U32($labels) => $body,
            LabelArray::U64($labels) => $body,
            LabelArray::F32($labels) => $body,
            LabelArray::F64($labels) => $body,
        }
    };
}

impl LabelArray {
    #[must_use]
    pub fn len(&self) -> usize {
        each_labels!(self, labels => labels.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// NumPy name of the element type.
    #[must_use]
    pub const fn dtype(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::I8(_) => "int8",
            Self::I16(_) => "int16",
            Self::I32(_) => "int32",
            Self::I64(_) => "int64",
            Self::U8(_) => "uint8",
            Self::U16(_) => "uint16",
            Self::U32(_) => "uint32",
            Self::U64(_) => "uint64",
            Self::F32(_) => "float32",
            Self::F64(_) => "float64",
        }
    }

    /// Number of labels that are not zero (or `false`), i.e. anomalous samples.
    #[must_use]
    pub fn count_nonzero(&self) -> usize {
        each_labels!(self, labels => nonzero(labels))
    }
}

fn nonzero<T: Default + PartialEq>(labels: &Array1<T>) -> usize {
    let zero = T::default();
    labels.iter().filter(|&label| *label != zero).count()
}

/// Representation requested for the returned image batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Shared tensors that view the arrays read from disk.
    #[default]
    Tensor,
    /// Plain owned arrays, each with its own contiguous buffer.
    Array,
}

/// A batch of images in one of the two output representations.
#[derive(Debug, Clone)]
pub enum ImageBatch {
    Tensor(ImageTensor),
    Array(Array4<f32>),
}

impl ImageBatch {
    /// Wrap a tensor, converting it when the plain array format is requested.
    #[must_use]
    pub fn from_tensor(tensor: ImageTensor, format: OutputFormat) -> Self {
        match format {
            OutputFormat::Tensor => Self::Tensor(tensor),
            OutputFormat::Array => Self::Array(tensor.into_owned()),
        }
    }

    /// Number of images in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.view().len_of(Axis(0))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shape as `(batch, height, width, channels)`.
    #[must_use]
    pub fn dim(&self) -> (usize, usize, usize, usize) {
        self.view().dim()
    }

    #[must_use]
    pub const fn format(&self) -> OutputFormat {
        match self {
            Self::Tensor(_) => OutputFormat::Tensor,
            Self::Array(_) => OutputFormat::Array,
        }
    }

    #[must_use]
    pub fn view(&self) -> ArrayView4<'_, f32> {
        match self {
            Self::Tensor(tensor) => tensor.view(),
            Self::Array(array) => array.view(),
        }
    }

    /// Take the batch as an owned array, copying only if the buffer is shared.
    #[must_use]
    pub fn into_array(self) -> Array4<f32> {
        match self {
            Self::Tensor(tensor) => tensor.into_owned(),
            Self::Array(array) => array,
        }
    }

    #[must_use]
    pub fn into_tensor(self) -> ImageTensor {
        match self {
            Self::Tensor(tensor) => tensor,
            Self::Array(array) => array.into_shared(),
        }
    }
}

/// Everything returned by a dataset load.
#[derive(Debug, Clone)]
pub struct MvtecSplits {
    /// Leading part of the training array.
    pub train: ImageBatch,
    /// Trailing part of the training array held out for validation.
    pub valid: ImageBatch,
    pub test: ImageBatch,
    /// Labels are kept in their on-disk representation regardless of format.
    pub test_labels: LabelArray,
}

impl MvtecSplits {
    /// Destructure into `(train, valid, test, test_labels)`.
    #[must_use]
    pub fn into_parts(self) -> (ImageBatch, ImageBatch, ImageBatch, LabelArray) {
        (self.train, self.valid, self.test, self.test_labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_format_shares_buffer() {
        let tensor = ImageTensor::zeros((4, 2, 2, 1));
        let batch = ImageBatch::from_tensor(tensor.clone(), OutputFormat::Tensor);

        assert_eq!(batch.format(), OutputFormat::Tensor);
        assert_eq!(batch.view().as_ptr(), tensor.as_ptr());
    }

    #[test]
    fn test_array_format_owns_buffer() {
        let tensor = ImageTensor::zeros((4, 2, 2, 1));
        let batch = ImageBatch::from_tensor(tensor.clone(), OutputFormat::Array);

        assert_eq!(batch.format(), OutputFormat::Array);
        assert_ne!(batch.view().as_ptr(), tensor.as_ptr());
        assert_eq!(batch.dim(), (4, 2, 2, 1));
    }

    #[test]
    fn test_label_array_accessors() {
        let labels = LabelArray::U16(Array1::from(vec![0, 2, 0, 1]));

        assert_eq!(labels.len(), 4);
        assert!(!labels.is_empty());
        assert_eq!(labels.dtype(), "uint16");
        assert_eq!(labels.count_nonzero(), 2);
        assert!(LabelArray::F32(Array1::zeros(0)).is_empty());
    }

    #[test]
    fn test_empty_batch() {
        let batch = ImageBatch::Array(Array4::zeros((0, 3, 3, 3)));
        assert!(batch.is_empty());
        assert_eq!(batch.into_tensor().len_of(Axis(0)), 0);
    }
}
