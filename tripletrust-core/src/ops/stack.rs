use crate::error::TripletRustError;
use crate::tensor::Tensor;

/// Stacks tensors of identical shape along a new leading dimension.
///
/// `n` tensors of shape `[d0, d1, ...]` produce one tensor of shape
/// `[n, d0, d1, ...]`. This is how per-sample images become a batch tensor.
///
/// # Errors
/// - `EmptyTensorList` if `tensors` is empty.
/// - `ShapeMismatch` if any tensor's shape differs from the first one.
pub fn stack(tensors: &[Tensor]) -> Result<Tensor, TripletRustError> {
    let first = tensors.first().ok_or(TripletRustError::EmptyTensorList)?;
    let item_shape = first.shape();

    let mut data = Vec::with_capacity(first.numel() * tensors.len());
    for tensor in tensors {
        let shape = tensor.shape();
        if shape != item_shape {
            return Err(TripletRustError::ShapeMismatch {
                expected: item_shape,
                actual: shape,
                operation: "stack".to_string(),
            });
        }
        data.extend_from_slice(tensor.as_slice());
    }

    let mut out_shape = Vec::with_capacity(item_shape.len() + 1);
    out_shape.push(tensors.len());
    out_shape.extend(item_shape);
    Tensor::new(data, out_shape)
}
