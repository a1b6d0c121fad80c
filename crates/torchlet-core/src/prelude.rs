//! Convenience re-exports for common torchlet-core types.
//!
//! ```rust
//! use torchlet_core::prelude::*;
//! ```

pub use crate::init;
pub use crate::DType;
pub use crate::Generator;
pub use crate::Result;
pub use crate::Shape;
pub use crate::Slice;
pub use crate::Tensor;
pub use crate::TorchletError;
