use num_traits::One;
use torchlet_core::{dispatch_float, init, DType, FloatElement, Generator, Result, Tensor, TorchletError};
use torchlet_kernels::ops;

use crate::module::Module;

/// Fully connected layer: `y = x·Wᵀ + b`.
///
/// Weights are `[out_features, in_features]` and the optional bias is
/// `[out_features]`; both start uniform in `±sqrt(1 / in_features)`.
pub struct Linear {
    in_features: usize,
    out_features: usize,
    weight: Tensor,
    bias: Option<Tensor>,
}

impl Linear {
    /// Create a layer initialised from the global [`Generator`].
    pub fn new(in_features: usize, out_features: usize, bias: bool, dtype: DType) -> Result<Self> {
        Generator::with_global(|gen| Self::with_generator(in_features, out_features, bias, dtype, gen))
    }

    /// Create a layer initialised from `gen`.
    pub fn with_generator(
        in_features: usize,
        out_features: usize,
        bias: bool,
        dtype: DType,
        gen: &mut Generator,
    ) -> Result<Self> {
        if !dtype.is_float() {
            return Err(TorchletError::UnsupportedDtype(dtype));
        }
        if in_features == 0 || out_features == 0 {
            return Err(TorchletError::InvalidShape {
                shape: vec![out_features, in_features],
                reason: "in_features and out_features must be positive".into(),
            });
        }

        let weight = Tensor::new(&[out_features, in_features], dtype)?;
        let bias = if bias {
            Some(Tensor::new(&[out_features], dtype)?)
        } else {
            None
        };

        dispatch_float!(dtype, T => {
            let bound = (T::one() / T::cast_f64(in_features as f64)).sqrt();
            init::uniform_(&weight, -bound, bound, gen)?;
            if let Some(b) = &bias {
                init::uniform_(b, -bound, bound, gen)?;
            }
        });

        tracing::debug!(in_features, out_features, bias = bias.is_some(), %dtype, "linear layer");

        Ok(Self {
            in_features,
            out_features,
            weight,
            bias,
        })
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    pub fn dtype(&self) -> DType {
        self.weight.dtype()
    }

    /// Get the weight tensor.
    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    /// Get the bias tensor (if present).
    pub fn bias(&self) -> Option<&Tensor> {
        self.bias.as_ref()
    }

    pub fn has_bias(&self) -> bool {
        self.bias.is_some()
    }

    /// Re-draw the weights uniformly from `[low, high)`. The bias is kept.
    pub fn uniform_<T: FloatElement>(&mut self, low: T, high: T, gen: &mut Generator) -> Result<()> {
        init::uniform_(&self.weight, low, high, gen)
    }

    /// Re-draw the weights from N(mean, std²). The bias is kept.
    pub fn normal_<T: FloatElement>(&mut self, mean: T, std: T, gen: &mut Generator) -> Result<()> {
        init::normal_(&self.weight, mean, std, gen)
    }
}

impl Module for Linear {
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        ops::linear(input, &self.weight, self.bias.as_ref())
    }

    fn parameters(&self) -> Vec<&Tensor> {
        let mut params = vec![&self.weight];
        if let Some(ref b) = self.bias {
            params.push(b);
        }
        params
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        let mut params = vec![("weight".to_string(), &self.weight)];
        if let Some(ref b) = self.bias {
            params.push(("bias".to_string(), b));
        }
        params
    }
}

impl std::fmt::Debug for Linear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Linear(in_features={}, out_features={}, bias={}, dtype={})",
            self.in_features,
            self.out_features,
            self.has_bias(),
            self.dtype()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_creation() {
        let layer = Linear::new(4, 3, true, DType::Float32).unwrap();
        assert_eq!(layer.weight().shape().dims(), &[3, 4]);
        assert_eq!(layer.bias().unwrap().shape().dims(), &[3]);
        assert_eq!(layer.in_features(), 4);
        assert_eq!(layer.out_features(), 3);
        assert!(layer.has_bias());
    }

    #[test]
    fn test_linear_init_range() {
        let mut gen = Generator::new(11);
        let layer = Linear::with_generator(16, 8, true, DType::Float64, &mut gen).unwrap();
        let bound = (1.0f64 / 16.0).sqrt();
        for t in layer.parameters() {
            let data = t.to_vec::<f64>().unwrap();
            assert!(data.iter().all(|v| v.abs() <= bound));
            assert!(data.iter().any(|v| *v != 0.0));
        }
    }

    #[test]
    fn test_linear_seeded_layers_match() {
        let a = Linear::with_generator(5, 3, true, DType::Float32, &mut Generator::new(4)).unwrap();
        let b = Linear::with_generator(5, 3, true, DType::Float32, &mut Generator::new(4)).unwrap();
        assert_eq!(
            a.weight().to_vec::<f32>().unwrap(),
            b.weight().to_vec::<f32>().unwrap()
        );
        assert_eq!(
            a.bias().unwrap().to_vec::<f32>().unwrap(),
            b.bias().unwrap().to_vec::<f32>().unwrap()
        );
    }

    #[test]
    fn test_linear_rejects_bad_config() {
        assert!(matches!(
            Linear::new(4, 3, true, DType::Int32),
            Err(TorchletError::UnsupportedDtype(DType::Int32))
        ));
        assert!(matches!(
            Linear::new(0, 3, false, DType::Float32),
            Err(TorchletError::InvalidShape { .. })
        ));
        assert!(Linear::new(3, 0, false, DType::Float64).is_err());
    }

    #[test]
    fn test_linear_forward() {
        let mut layer = Linear::new(3, 2, true, DType::Float32).unwrap();
        let mut gen = Generator::new(0);
        layer.uniform_(1.0f32, 1.0, &mut gen).unwrap();
        layer.bias().unwrap().fill_(1.0f32).unwrap();

        let input = Tensor::ones(&[4, 3], DType::Float32).unwrap();
        let output = layer.forward(&input).unwrap();
        assert_eq!(output.shape().dims(), &[4, 2]);
        assert!(output.to_vec::<f32>().unwrap().iter().all(|v| *v == 4.0));
    }

    #[test]
    fn test_linear_reinit_checks_dtype() {
        let mut layer = Linear::new(3, 2, false, DType::Float64).unwrap();
        let mut gen = Generator::new(0);
        assert!(matches!(
            layer.normal_(0.0f32, 1.0, &mut gen),
            Err(TorchletError::DtypeMismatch { .. })
        ));
        layer.normal_(0.0f64, 0.0, &mut gen).unwrap();
        assert_eq!(layer.weight().to_vec::<f64>().unwrap(), vec![0.0; 6]);
    }

    #[test]
    fn test_linear_parameters() {
        let layer = Linear::new(4, 3, true, DType::Float32).unwrap();
        assert_eq!(layer.parameters().len(), 2); // weight + bias

        let layer_no_bias = Linear::new(4, 3, false, DType::Float32).unwrap();
        assert_eq!(layer_no_bias.parameters().len(), 1);
        assert!(layer_no_bias.bias().is_none());
    }

    #[test]
    fn test_state_dict_shares_storage() {
        let layer = Linear::new(2, 2, true, DType::Float32).unwrap();
        let dict = layer.state_dict();
        assert_eq!(dict.len(), 2);
        assert!(dict["weight"].shares_storage(layer.weight()));
        assert!(dict.contains_key("bias"));
    }

    #[test]
    fn test_debug() {
        let layer = Linear::new(2, 5, false, DType::Float64).unwrap();
        assert_eq!(
            format!("{layer:?}"),
            "Linear(in_features=2, out_features=5, bias=false, dtype=f64)"
        );
    }
}
