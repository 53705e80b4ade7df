// src/tensor_data.rs
use std::sync::Arc;

use crate::error::TripletRustError;
use crate::tensor::utils::calculate_strides;

/// Internal storage and metadata for a Tensor.
///
/// Holds the flattened `f32` buffer in row-major order together with the
/// shape and contiguous strides. The buffer is behind an `Arc` so tensors can
/// be cloned cheaply when a batch is handed between threads.
#[derive(Debug)]
pub struct TensorData {
    pub(crate) buffer: Arc<Vec<f32>>,
    pub(crate) shape: Vec<usize>,
    pub(crate) strides: Vec<usize>,
}

impl TensorData {
    /// Creates a new `TensorData` instance with the given f32 data and shape.
    ///
    /// # Errors
    /// Returns `TripletRustError::TensorCreationError` if the length of `data_vec`
    /// does not match the number of elements specified by `shape`, or if that
    /// number overflows `usize`.
    pub fn new(data_vec: Vec<f32>, shape: Vec<usize>) -> Result<Self, TripletRustError> {
        let numel = shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d));
        let data_len = data_vec.len();
        if numel != Some(data_len) {
            return Err(TripletRustError::TensorCreationError { data_len, shape });
        }
        let strides = calculate_strides(&shape);
        Ok(TensorData {
            buffer: Arc::new(data_vec),
            shape,
            strides,
        })
    }

    /// Returns the total number of elements.
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}
