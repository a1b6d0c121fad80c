//! Argument checks shared by the ops layer.
//!
//! Each check maps one kind of disagreement onto one [`TorchletError`] variant.

use torchlet_core::{Result, Tensor, TorchletError};

pub(crate) fn contiguous(t: &Tensor, name: &str) -> Result<()> {
    if !t.is_contiguous() {
        return Err(TorchletError::NotContiguous(name.to_string()));
    }
    Ok(())
}

pub(crate) fn float(t: &Tensor) -> Result<()> {
    if !t.dtype().is_float() {
        return Err(TorchletError::UnsupportedDtype(t.dtype()));
    }
    Ok(())
}

pub(crate) fn same_dtype(reference: &Tensor, other: &Tensor) -> Result<()> {
    if reference.dtype() != other.dtype() {
        return Err(TorchletError::DtypeMismatch {
            expected: reference.dtype(),
            got: other.dtype(),
        });
    }
    Ok(())
}

pub(crate) fn rank(t: &Tensor, expected: usize) -> Result<()> {
    if t.ndim() != expected {
        return Err(TorchletError::ShapeMismatch {
            expected: vec![0; expected],
            got: t.shape().dims().to_vec(),
        });
    }
    Ok(())
}

pub(crate) fn rank_at_least(t: &Tensor, min: usize) -> Result<()> {
    if t.ndim() < min {
        return Err(TorchletError::ShapeMismatch {
            expected: vec![0; min],
            got: t.shape().dims().to_vec(),
        });
    }
    Ok(())
}

/// Contiguous float tensor of rank ≥ 1, the common input of the row-wise ops.
pub(crate) fn row_input(x: &Tensor) -> Result<()> {
    contiguous(x, "input")?;
    rank_at_least(x, 1)?;
    float(x)
}
