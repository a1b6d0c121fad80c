//! `mvb` on the `matrixmultiply` gemm backend.
//!
//! The matrix-vector product is issued as an `[m, n] · [n, 1]` gemm. A bias is
//! copied into `y` first and accumulated with `beta = 1`.

use bytemuck::{try_cast_slice, try_cast_slice_mut};
use torchlet_core::{DType, FloatElement};

macro_rules! gemv {
    ($name:ident, $gemm:path, $ty:ty) => {
        fn $name(w: &[$ty], x: &[$ty], b: Option<&[$ty]>, y: &mut [$ty], m: usize, n: usize) -> bool {
            if w.len() < m * n || x.len() < n || y.len() < m || b.is_some_and(|b| b.len() < m) {
                return false;
            }
            let y = &mut y[..m];
            if m == 0 {
                return true;
            }
            let beta = match b {
                Some(b) => {
                    y.copy_from_slice(&b[..m]);
                    1.0
                }
                None => 0.0,
            };
            if n == 0 {
                if b.is_none() {
                    y.fill(0.0);
                }
                return true;
            }

            // SAFETY: bounds were checked above; A is [m, n] with row stride n,
            // B is [n, 1] and C is [m, 1], all unit-strided within their slices.
            unsafe {
                $gemm(
                    m,
                    n,
                    1,
                    1.0,
                    w.as_ptr(),
                    n as isize,
                    1,
                    x.as_ptr(),
                    1,
                    1,
                    beta,
                    y.as_mut_ptr(),
                    1,
                    1,
                );
            }
            true
        }
    };
}

gemv!(sgemv, matrixmultiply::sgemm, f32);
gemv!(dgemv, matrixmultiply::dgemm, f64);

/// Run `mvb` on the gemm backend. Returns `false` if the element type or the
/// slice lengths are not handled here, in which case `y` is untouched.
pub(crate) fn mvb<T: FloatElement>(w: &[T], x: &[T], b: Option<&[T]>, y: &mut [T], m: usize, n: usize) -> bool {
    macro_rules! route {
        ($gemv:ident, $ty:ty) => {{
            let (Ok(w), Ok(x), Ok(y)) = (
                try_cast_slice::<T, $ty>(w),
                try_cast_slice::<T, $ty>(x),
                try_cast_slice_mut::<T, $ty>(y),
            ) else {
                return false;
            };
            let b = match b.map(try_cast_slice::<T, $ty>) {
                Some(Ok(b)) => Some(b),
                Some(Err(_)) => return false,
                None => None,
            };
            $gemv(w, x, b, y, m, n)
        }};
    }

    match T::DTYPE {
        DType::Float32 => route!(sgemv, f32),
        DType::Float64 => route!(dgemv, f64),
        _ => false,
    }
}
