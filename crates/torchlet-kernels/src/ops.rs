//! Tensor-level numeric ops.
//!
//! Each op validates its arguments, allocates the output, then walks the
//! tensors row by row with [`RowIter`] and runs a kernel from [`crate::cpu`]
//! on every row. No output is allocated and nothing is written until every
//! check has passed.

use torchlet_core::{dispatch_float, FloatElement, Result, RowIter, Tensor, TorchletError};

use crate::cpu;
use crate::validate;

/// Affine map over the trailing dimension: `y = x·Wᵀ + b`.
///
/// `x` is `[..., in]`, `weights` is `[out, in]` and `bias`, if given, is
/// `[out]`. The result is `[..., out]`.
pub fn linear(x: &Tensor, weights: &Tensor, bias: Option<&Tensor>) -> Result<Tensor> {
    validate::contiguous(x, "input")?;
    validate::contiguous(weights, "weights")?;
    validate::same_dtype(x, weights)?;
    validate::rank_at_least(x, 1)?;
    validate::rank(weights, 2)?;

    let w_dims = weights.shape().dims();
    let (out_features, in_features) = (w_dims[0], w_dims[1]);
    if x.shape().last() != Some(in_features) {
        return Err(TorchletError::ShapeMismatch {
            expected: x.shape().with_last(in_features).dims().to_vec(),
            got: x.shape().dims().to_vec(),
        });
    }

    if let Some(b) = bias {
        validate::contiguous(b, "bias")?;
        validate::same_dtype(x, b)?;
        validate::rank(b, 1)?;
        if b.numel() != out_features {
            return Err(TorchletError::ShapeMismatch {
                expected: vec![out_features],
                got: b.shape().dims().to_vec(),
            });
        }
    }
    validate::float(x)?;

    let out = Tensor::new(x.shape().with_last(out_features).dims(), x.dtype())?;
    let rows = RowIter::new(&out, &[x])?;
    tracing::debug!(
        batch = rows.batch_size(),
        in_features,
        out_features,
        bias = bias.is_some(),
        dtype = %x.dtype(),
        "linear"
    );

    dispatch_float!(x.dtype(), T => linear_rows::<T>(&rows, weights, bias, out_features, in_features)?);
    drop(rows);
    Ok(out)
}

fn linear_rows<T: FloatElement>(
    rows: &RowIter<'_>,
    weights: &Tensor,
    bias: Option<&Tensor>,
    m: usize,
    n: usize,
) -> Result<()> {
    let w_guard = weights.storage().read();
    let w = &w_guard.as_slice::<T>()[weights.elem_offset()..weights.elem_offset() + m * n];
    let b_guard = bias.map(|b| b.storage().read());
    let b = match (bias, &b_guard) {
        (Some(t), Some(g)) => Some(&g.as_slice::<T>()[t.elem_offset()..t.elem_offset() + m]),
        _ => None,
    };

    rows.for_each_with_inputs::<T>(|y, inputs| cpu::mvb(w, inputs[0], b, y, m, n))
}

/// Apply a row kernel `f(x_row, y_row, len)` to every trailing-dimension row.
fn unary_rows<T: FloatElement>(rows: &RowIter<'_>, f: fn(&[T], &mut [T], usize)) -> Result<()> {
    rows.for_each_with_inputs::<T>(|y, inputs| {
        let m = y.len();
        f(inputs[0], y, m)
    })
}

/// Allocate an output shaped like `x` and run the row kernel `kernel` over it.
macro_rules! unary_op {
    ($x:expr, $kernel:ident) => {{
        let x: &Tensor = $x;
        validate::row_input(x)?;

        let out = Tensor::new(x.shape().dims(), x.dtype())?;
        let rows = RowIter::new(&out, &[x])?;
        tracing::debug!(
            batch = rows.batch_size(),
            dim = rows.output_dim(),
            dtype = %x.dtype(),
            op = stringify!($kernel),
            "unary op"
        );
        dispatch_float!(x.dtype(), T => unary_rows::<T>(&rows, cpu::$kernel::<T>)?);
        drop(rows);
        Ok(out)
    }};
}

/// GELU (tanh approximation), elementwise.
pub fn gelu(x: &Tensor) -> Result<Tensor> {
    unary_op!(x, gelu)
}

/// Softmax over the trailing dimension.
pub fn softmax(x: &Tensor) -> Result<Tensor> {
    unary_op!(x, softmax)
}

/// Log-softmax over the trailing dimension.
pub fn log_softmax(x: &Tensor) -> Result<Tensor> {
    unary_op!(x, log_softmax)
}

/// In-place accumulate `dst += src` for tensors of identical shape.
///
/// `src` may alias `dst`.
pub fn add_(dst: &Tensor, src: &Tensor) -> Result<()> {
    validate::contiguous(dst, "output")?;
    validate::contiguous(src, "input")?;
    validate::same_dtype(dst, src)?;
    if dst.shape() != src.shape() {
        return Err(TorchletError::ShapeMismatch {
            expected: dst.shape().dims().to_vec(),
            got: src.shape().dims().to_vec(),
        });
    }
    validate::float(dst)?;

    let rows = RowIter::new(dst, &[src])?;
    tracing::debug!(batch = rows.batch_size(), dim = rows.output_dim(), dtype = %dst.dtype(), "add_");
    dispatch_float!(dst.dtype(), T => rows.for_each_with_inputs::<T>(|y, inputs| {
        let m = y.len();
        cpu::vadd(inputs[0], y, m)
    })?);
    Ok(())
}

/// 2-D matrix product: `[m, k] · [k, n] → [m, n]`.
pub fn matmul(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    validate::contiguous(a, "lhs")?;
    validate::contiguous(b, "rhs")?;
    validate::same_dtype(a, b)?;
    validate::rank(a, 2)?;
    validate::rank(b, 2)?;

    let (m, k) = (a.shape().dims()[0], a.shape().dims()[1]);
    let (k2, n) = (b.shape().dims()[0], b.shape().dims()[1]);
    if k != k2 {
        return Err(TorchletError::ShapeMismatch {
            expected: vec![k, n],
            got: b.shape().dims().to_vec(),
        });
    }
    validate::float(a)?;

    let out = Tensor::new(&[m, n], a.dtype())?;
    tracing::debug!(m, k, n, dtype = %a.dtype(), "matmul");
    dispatch_float!(a.dtype(), T => matmul_into::<T>(a, b, &out, m, n, k));
    Ok(out)
}

fn matmul_into<T: FloatElement>(a: &Tensor, b: &Tensor, out: &Tensor, m: usize, n: usize, k: usize) {
    let a_guard = a.storage().read();
    let b_guard = b.storage().read();
    let a_data = &a_guard.as_slice::<T>()[a.elem_offset()..a.elem_offset() + m * k];
    let b_data = &b_guard.as_slice::<T>()[b.elem_offset()..b.elem_offset() + k * n];
    let mut c_guard = out.storage().write();
    cpu::mm(a_data, b_data, &mut c_guard.as_slice_mut::<T>()[..m * n], m, n, k);
}
