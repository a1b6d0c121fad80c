use torchlet_core::{Result, Tensor};

use crate::module::Module;

/// An ordered container that chains modules sequentially.
///
/// The output of each module is fed as input to the next.
///
/// # Example
/// ```
/// use torchlet_core::{DType, Tensor};
/// use torchlet_nn::{Gelu, Linear, Module, Sequential};
///
/// let model = Sequential::new(vec![
///     Box::new(Linear::new(4, 8, true, DType::Float32).unwrap()),
///     Box::new(Gelu),
///     Box::new(Linear::new(8, 2, true, DType::Float32).unwrap()),
/// ]);
/// let input = Tensor::ones(&[3, 4], DType::Float32).unwrap();
/// let output = model.forward(&input).unwrap();
/// assert_eq!(output.shape().dims(), &[3, 2]);
/// ```
#[derive(Default)]
pub struct Sequential {
    layers: Vec<Box<dyn Module>>,
}

impl Sequential {
    /// Create a new Sequential container from an ordered list of modules.
    pub fn new(layers: Vec<Box<dyn Module>>) -> Self {
        Self { layers }
    }

    /// Create an empty Sequential container.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a module to the end of the sequence.
    pub fn push(&mut self, module: Box<dyn Module>) {
        self.layers.push(module);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Get a reference to the module at the given index.
    pub fn get(&self, index: usize) -> Option<&dyn Module> {
        self.layers.get(index).map(|m| m.as_ref())
    }
}

impl Module for Sequential {
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let mut x = input.clone();
        for layer in &self.layers {
            x = layer.forward(&x)?;
        }
        Ok(x)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        self.layers.iter().flat_map(|m| m.parameters()).collect()
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        let mut params = Vec::new();
        for (i, module) in self.layers.iter().enumerate() {
            for (name, tensor) in module.named_parameters() {
                params.push((format!("{i}.{name}"), tensor));
            }
        }
        params
    }
}
