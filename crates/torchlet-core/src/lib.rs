//! # torchlet-core
//!
//! Core tensor engine for torchlet.
//!
//! Provides the foundational `Tensor` type with:
//! - Seven dtypes (f32, f64, i32, i64, u8, u32, u64) and closed dtype dispatch
//! - Shared, reference-counted storage
//! - Zero-copy views (index, slice, permute, view)
//! - Row-wise iteration over batched tensors for kernels
//! - Seedable random initializers

pub mod dtype;
pub mod error;
pub mod init;
pub mod iter;
pub mod prelude;
pub mod rng;
pub mod shape;
pub mod slice;
pub mod storage;
pub mod tensor;

pub use dtype::{DType, Element, FloatElement};
pub use error::TorchletError;
pub use iter::{RowIter, StridedOffsets};
pub use rng::Generator;
pub use shape::{Shape, Strides};
pub use slice::Slice;
pub use storage::Storage;
pub use tensor::Tensor;

pub type Result<T> = std::result::Result<T, TorchletError>;
