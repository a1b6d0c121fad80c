//! In-place random initializers.
//!
//! Elements are drawn in logical row-major order, so a strided view and a
//! contiguous copy of it receive the same values from the same seed.

use crate::dtype::FloatElement;
use crate::error::TorchletError;
use crate::rng::Generator;
use crate::tensor::Tensor;
use crate::Result;

/// Fill `tensor` with draws from the uniform distribution on `[low, high)`.
pub fn uniform_<T: FloatElement>(tensor: &Tensor, low: T, high: T, gen: &mut Generator) -> Result<()> {
    check_float_dtype::<T>(tensor)?;
    if !(low.is_finite() && high.is_finite()) || low > high {
        return Err(TorchletError::InvalidArgument(format!(
            "uniform_ bounds must be finite with low <= high, got [{low:?}, {high:?})"
        )));
    }
    tracing::trace!(numel = tensor.numel(), dtype = %tensor.dtype(), "uniform_");
    fill_with(tensor, || gen.uniform(low, high));
    Ok(())
}

/// Fill `tensor` with draws from the normal distribution N(mean, std²).
pub fn normal_<T: FloatElement>(tensor: &Tensor, mean: T, std: T, gen: &mut Generator) -> Result<()> {
    check_float_dtype::<T>(tensor)?;
    if !mean.is_finite() || !std.is_finite() || std < T::zero() {
        return Err(TorchletError::InvalidArgument(format!(
            "normal_ needs finite mean and non-negative finite std, got mean={mean:?} std={std:?}"
        )));
    }
    tracing::trace!(numel = tensor.numel(), dtype = %tensor.dtype(), "normal_");
    fill_with(tensor, || gen.normal(mean, std));
    Ok(())
}

fn check_float_dtype<T: FloatElement>(tensor: &Tensor) -> Result<()> {
    if !tensor.dtype().is_float() {
        return Err(TorchletError::UnsupportedDtype(tensor.dtype()));
    }
    if tensor.dtype() != T::DTYPE {
        return Err(TorchletError::DtypeMismatch {
            expected: tensor.dtype(),
            got: T::DTYPE,
        });
    }
    Ok(())
}

fn fill_with<T: FloatElement>(tensor: &Tensor, mut draw: impl FnMut() -> T) {
    let mut guard = tensor.storage().write();
    let data = guard.as_slice_mut::<T>();
    if tensor.is_contiguous() {
        let start = tensor.elem_offset();
        for v in &mut data[start..start + tensor.numel()] {
            *v = draw();
        }
    } else {
        for offset in tensor.strided_offsets() {
            data[offset] = draw();
        }
    }
}
