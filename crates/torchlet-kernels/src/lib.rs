//! # torchlet-kernels
//!
//! CPU numeric kernels and the tensor ops built on them.
//!
//! Provides:
//! - Pure slice kernels: `mvb`, `mm`, `vadd`, `gelu`, `softmax`, `log_softmax`
//! - Tensor ops with validation: `linear`, `matmul`, `add_` and the row-wise
//!   activations
//! - A `matrixmultiply`-backed `mvb` (behind the `accelerate` feature flag)

pub mod cpu;
pub mod ops;
mod validate;

#[cfg(feature = "accelerate")]
mod accelerate;

pub use ops::{add_, gelu, linear, log_softmax, matmul, softmax};
