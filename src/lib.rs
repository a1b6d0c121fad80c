//! # torchlet
//!
//! A small tensor engine: strided tensors with zero-copy views over shared
//! storage, closed dtype dispatch, row-wise kernel iteration, and a handful of
//! numeric ops and layers built on top.
//!
//! ```
//! use torchlet::prelude::*;
//!
//! let mut gen = Generator::new(42);
//! let layer = Linear::with_generator(4, 3, true, DType::Float32, &mut gen).unwrap();
//! let x = Tensor::ones(&[2, 4], DType::Float32).unwrap();
//! let y = ops::softmax(&layer.forward(&x).unwrap()).unwrap();
//! assert_eq!(y.shape().dims(), &[2, 3]);
//! ```

pub use torchlet_nn as nn;

pub use torchlet_core::{init, DType, Generator, Result, Shape, Slice, Tensor, TorchletError};
pub use torchlet_kernels::{cpu, ops};

pub mod prelude {
    pub use torchlet_core::prelude::*;
    pub use torchlet_kernels::ops;
    pub use torchlet_nn::prelude::*;
}
