use std::collections::HashMap;

use torchlet_core::{Result, Tensor};

/// Base trait for all layers.
///
/// A module owns its parameter tensors and maps one input tensor to one
/// output tensor.
pub trait Module: Send + Sync {
    /// Forward pass.
    fn forward(&self, input: &Tensor) -> Result<Tensor>;

    /// All parameter tensors, in a stable order.
    fn parameters(&self) -> Vec<&Tensor>;

    /// Parameters keyed by name (for `state_dict`).
    fn named_parameters(&self) -> Vec<(String, &Tensor)>;

    /// Export the parameters as a name → tensor map.
    ///
    /// The returned tensors share storage with the module's parameters.
    fn state_dict(&self) -> HashMap<String, Tensor> {
        self.named_parameters()
            .into_iter()
            .map(|(name, t)| (name, t.clone()))
            .collect()
    }
}
