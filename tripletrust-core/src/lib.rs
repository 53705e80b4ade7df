//! Core types shared by the TripletRust crates: the error taxonomy and a
//! minimal immutable CPU tensor for decoded images and margins.

pub mod error;
pub mod ops;
pub mod tensor;
pub mod tensor_data;

pub use error::TripletRustError;
pub use tensor::Tensor;
