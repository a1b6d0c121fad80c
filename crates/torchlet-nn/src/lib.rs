//! # torchlet-nn
//!
//! Layers and modules for torchlet.

pub mod activations;
pub mod linear;
pub mod module;
pub mod prelude;
pub mod sequential;

pub use activations::{Gelu, LogSoftmax, Softmax};
pub use linear::Linear;
pub use module::Module;
pub use sequential::Sequential;
