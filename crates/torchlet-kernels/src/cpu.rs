//! Scalar CPU kernels over flat, row-major slices.
//!
//! Every kernel here is pure: it reads its inputs, writes its output slice and
//! touches nothing else. Shape and dtype validation happens in [`crate::ops`].

use torchlet_core::FloatElement;

/// Tile size for cache-friendly blocking in [`mm`].
const TILE_M: usize = 64;
const TILE_N: usize = 64;
const TILE_K: usize = 64;

/// Matrix-vector product with optional bias: `y = W·x + b`.
///
/// `w` is `[m, n]` row-major, `x` has `n` elements, `b` and `y` have `m`.
/// With the `accelerate` feature this routes to the gemm backend for `f32`
/// and `f64`; otherwise it is [`mvb_reference`].
pub fn mvb<T: FloatElement>(w: &[T], x: &[T], b: Option<&[T]>, y: &mut [T], m: usize, n: usize) {
    #[cfg(feature = "accelerate")]
    {
        if crate::accelerate::mvb(w, x, b, y, m, n) {
            return;
        }
    }
    mvb_reference(w, x, b, y, m, n);
}

/// Portable `mvb`: one dot product per output element, bias first.
pub fn mvb_reference<T: FloatElement>(
    w: &[T],
    x: &[T],
    b: Option<&[T]>,
    y: &mut [T],
    m: usize,
    n: usize,
) {
    debug_assert!(w.len() >= m * n && x.len() >= n && y.len() >= m);
    let x = &x[..n];
    for (k, out) in y[..m].iter_mut().enumerate() {
        let mut acc = b.map_or(T::zero(), |b| b[k]);
        for (wv, xv) in w[k * n..(k + 1) * n].iter().zip(x) {
            acc = acc + *wv * *xv;
        }
        *out = acc;
    }
}

/// Matrix product `C = A·B` for `[m, k] · [k, n] → [m, n]`.
///
/// Each output element accumulates with fused multiply-add over ascending `l`.
pub fn mm<T: FloatElement>(a: &[T], b: &[T], c: &mut [T], m: usize, n: usize, k: usize) {
    debug_assert!(a.len() >= m * k && b.len() >= k * n && c.len() >= m * n);
    c[..m * n].fill(T::zero());

    for i0 in (0..m).step_by(TILE_M) {
        let i_end = (i0 + TILE_M).min(m);
        for j0 in (0..n).step_by(TILE_N) {
            let j_end = (j0 + TILE_N).min(n);
            for p0 in (0..k).step_by(TILE_K) {
                let p_end = (p0 + TILE_K).min(k);

                for i in i0..i_end {
                    for p in p0..p_end {
                        let a_val = a[i * k + p];
                        let b_row = &b[p * n..p * n + n];
                        for j in j0..j_end {
                            c[i * n + j] = a_val.mul_add(b_row[j], c[i * n + j]);
                        }
                    }
                }
            }
        }
    }
}

/// In-place accumulate `y += x` over `m` elements.
pub fn vadd<T: FloatElement>(x: &[T], y: &mut [T], m: usize) {
    for (yv, xv) in y[..m].iter_mut().zip(&x[..m]) {
        *yv = *yv + *xv;
    }
}

/// GELU, tanh approximation:
/// `y = 0.5·x·(1 + tanh(√(2/π)·(x + 0.044715·x³)))`.
pub fn gelu<T: FloatElement>(x: &[T], y: &mut [T], m: usize) {
    let half = T::cast_f64(0.5);
    for (yv, &xv) in y[..m].iter_mut().zip(&x[..m]) {
        let x3 = xv * xv * xv;
        let arg = T::GELU_COEFF.mul_add(x3, xv);
        let t = (T::SQRT_2_OVER_PI * arg).tanh();
        *yv = half * xv * (T::one() + t);
    }
}

/// Largest element of `x`, starting from the lowest finite value.
fn row_max<T: FloatElement>(x: &[T]) -> T {
    x.iter()
        .fold(T::min_value(), |max, &v| if v > max { v } else { max })
}

/// Softmax over `m` elements with max subtraction.
///
/// A row whose exponentials all underflow to zero becomes uniform `1/m`.
pub fn softmax<T: FloatElement>(x: &[T], y: &mut [T], m: usize) {
    let (x, y) = (&x[..m], &mut y[..m]);
    let max = row_max(x);

    let mut sum = T::zero();
    for (yv, &xv) in y.iter_mut().zip(x) {
        let e = (xv - max).exp();
        *yv = e;
        sum = sum + e;
    }

    if sum == T::zero() {
        let uniform = T::one() / T::cast_f64(m as f64);
        y.fill(uniform);
        return;
    }

    let inv_sum = T::one() / sum;
    for yv in y.iter_mut() {
        *yv = *yv * inv_sum;
    }
}

/// Log-softmax over `m` elements: `(x - max) - ln Σ exp(x - max)`.
///
/// A row whose max is `-∞`, or whose exponent sum is zero, becomes all `-∞`.
pub fn log_softmax<T: FloatElement>(x: &[T], y: &mut [T], m: usize) {
    let (x, y) = (&x[..m], &mut y[..m]);
    let max = row_max(x);
    if max == T::neg_infinity() {
        y.fill(T::neg_infinity());
        return;
    }

    let mut sum = T::zero();
    for (yv, &xv) in y.iter_mut().zip(x) {
        let shifted = xv - max;
        *yv = shifted;
        sum = sum + shifted.exp();
    }

    if sum == T::zero() {
        y.fill(T::neg_infinity());
        return;
    }

    let log_sum = sum.ln();
    for yv in y.iter_mut() {
        *yv = *yv - log_sum;
    }
}
