//! Parameter-free activation layers.

use torchlet_core::{Result, Tensor};
use torchlet_kernels::ops;

use crate::module::Module;

macro_rules! activation {
    ($(#[$doc:meta])* $name:ident => $op:path) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Module for $name {
            fn forward(&self, input: &Tensor) -> Result<Tensor> {
                $op(input)
            }

            fn parameters(&self) -> Vec<&Tensor> {
                Vec::new()
            }

            fn named_parameters(&self) -> Vec<(String, &Tensor)> {
                Vec::new()
            }
        }
    };
}

activation!(
    /// GELU, tanh approximation.
    Gelu => ops::gelu
);
activation!(
    /// Softmax over the trailing dimension.
    Softmax => ops::softmax
);
activation!(
    /// Log-softmax over the trailing dimension.
    LogSoftmax => ops::log_softmax
);
