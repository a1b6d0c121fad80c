//! Convenience re-exports for common torchlet-nn types.
//!
//! ```rust
//! use torchlet_nn::prelude::*;
//! ```

pub use crate::Linear;
pub use crate::Module;
pub use crate::Sequential;
pub use crate::{Gelu, LogSoftmax, Softmax};
