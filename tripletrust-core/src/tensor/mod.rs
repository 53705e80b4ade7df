// src/tensor/mod.rs

use std::fmt;
use std::sync::Arc;

use crate::error::TripletRustError;
use crate::tensor_data::TensorData;

pub mod utils;

/// Represents a multi-dimensional array of `f32` values on the CPU.
///
/// `Tensor` wraps an `Arc<TensorData>`: clones share the underlying buffer, so
/// decoded images can be moved into batches and across the prefetch channel
/// without copying pixel data. Tensors are immutable once built.
#[derive(Clone)]
pub struct Tensor {
    pub(crate) data: Arc<TensorData>,
}

impl Tensor {
    /// Creates a new Tensor with the given f32 data and shape.
    ///
    /// Contiguous row-major strides are calculated automatically.
    pub fn new(data_vec: Vec<f32>, shape: Vec<usize>) -> Result<Self, TripletRustError> {
        let tensor_data = TensorData::new(data_vec, shape)?;
        Ok(Tensor {
            data: Arc::new(tensor_data),
        })
    }

    /// Creates a tensor of the given shape filled with `value`.
    pub fn full(shape: &[usize], value: f32) -> Result<Self, TripletRustError> {
        let numel = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| TripletRustError::TensorCreationError {
                data_len: 0,
                shape: shape.to_vec(),
            })?;
        Self::new(vec![value; numel], shape.to_vec())
    }

    /// Creates a tensor of the given shape filled with zeros.
    pub fn zeros(shape: &[usize]) -> Result<Self, TripletRustError> {
        Self::full(shape, 0.0)
    }

    /// Returns a clone of the tensor's shape.
    pub fn shape(&self) -> Vec<usize> {
        self.data.shape.clone()
    }

    /// Returns a clone of the tensor's strides.
    pub fn strides(&self) -> Vec<usize> {
        self.data.strides.clone()
    }

    /// Returns the number of dimensions.
    pub fn rank(&self) -> usize {
        self.data.shape.len()
    }

    /// Returns the number of elements in the tensor.
    pub fn numel(&self) -> usize {
        self.data.numel()
    }

    /// Borrows the flattened row-major data.
    pub fn as_slice(&self) -> &[f32] {
        self.data.buffer.as_slice()
    }

    /// Returns an owned copy of the flattened data.
    pub fn get_f32_data(&self) -> Vec<f32> {
        self.data.buffer.as_ref().clone()
    }

    /// Returns the element at a multi-dimensional index.
    pub fn at(&self, index: &[usize]) -> Result<f32, TripletRustError> {
        if index.len() != self.rank() {
            return Err(TripletRustError::ShapeMismatch {
                expected: self.shape(),
                actual: index.to_vec(),
                operation: "at".to_string(),
            });
        }
        let mut offset = 0;
        for ((&i, &dim), &stride) in index.iter().zip(&self.data.shape).zip(&self.data.strides) {
            if i >= dim {
                return Err(TripletRustError::IndexOutOfBounds { index: i, len: dim });
            }
            offset += i * stride;
        }
        Ok(self.data.buffer[offset])
    }
}

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.data.shape == other.data.shape && self.data.buffer == other.data.buffer
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Image tensors are large; print only the head of the buffer.
        let head: Vec<f32> = self.as_slice().iter().take(8).copied().collect();
        f.debug_struct("Tensor")
            .field("shape", &self.data.shape)
            .field("data_head", &head)
            .finish()
    }
}
