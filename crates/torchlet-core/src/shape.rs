use smallvec::SmallVec;
use std::fmt;

/// Per-dimension element strides.
pub type Strides = SmallVec<[usize; 4]>;

/// Tensor shape with stack-allocated storage for ≤4 dimensions.
///
/// Most tensors handled here are 1D-4D (vectors, matrices, batched
/// matrices), so we avoid heap allocation for the common case.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: SmallVec<[usize; 4]>,
}

impl Shape {
    /// Create a new shape from dimensions.
    pub fn new(dims: &[usize]) -> Self {
        Self {
            dims: SmallVec::from_slice(dims),
        }
    }

    /// Scalar shape (0 dimensions).
    pub fn scalar() -> Self {
        Self {
            dims: SmallVec::new(),
        }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements. A scalar holds one element.
    ///
    /// Wraps on overflow; use [`Shape::checked_numel`] on untrusted input.
    /// A zero dimension always yields 0.
    pub fn numel(&self) -> usize {
        wrapping_product(&self.dims)
    }

    /// Total number of elements, or `None` if the product overflows.
    ///
    /// A shape with a zero dimension holds no elements whatever its other
    /// dimensions are.
    pub fn checked_numel(&self) -> Option<usize> {
        if self.dims.contains(&0) {
            return Some(0);
        }
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Get dimension sizes as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Get size of a specific dimension.
    pub fn dim(&self, axis: usize) -> Option<usize> {
        self.dims.get(axis).copied()
    }

    /// Size of the trailing dimension.
    pub fn last(&self) -> Option<usize> {
        self.dims.last().copied()
    }

    /// Whether this is a scalar (0-dimensional).
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// Compute default strides for a contiguous row-major layout.
    ///
    /// Strides saturate at `usize::MAX`. That only happens for shapes with a
    /// zero dimension, whose strides are never dereferenced.
    pub fn contiguous_strides(&self) -> Strides {
        let ndim = self.dims.len();
        if ndim == 0 {
            return SmallVec::new();
        }
        let mut strides: Strides = SmallVec::from_elem(0usize, ndim);
        strides[ndim - 1] = 1;
        for i in (0..ndim - 1).rev() {
            strides[i] = strides[i + 1].saturating_mul(self.dims[i + 1]);
        }
        strides
    }

    /// Whether `strides` is exactly the row-major layout of this shape.
    pub fn is_contiguous_strides(&self, strides: &[usize]) -> bool {
        strides == self.contiguous_strides().as_slice()
    }

    /// Shape with axes `a` and `b` exchanged, or `None` if either is out of range.
    pub fn swapped(&self, a: usize, b: usize) -> Option<Shape> {
        if a >= self.ndim() || b >= self.ndim() {
            return None;
        }
        let mut dims = self.dims.clone();
        dims.swap(a, b);
        Some(Shape { dims })
    }

    /// Same shape with the trailing dimension replaced.
    pub fn with_last(&self, size: usize) -> Shape {
        let mut dims = self.dims.clone();
        if let Some(last) = dims.last_mut() {
            *last = size;
        }
        Shape { dims }
    }

    /// Product of every dimension but the last (1 for rank ≤ 1). Wraps like
    /// [`Shape::numel`].
    pub fn batch_size(&self) -> usize {
        match self.dims.split_last() {
            Some((_, lead)) => wrapping_product(lead),
            None => 1,
        }
    }
}

/// Product of `dims`, wrapping on overflow. Once a zero is multiplied in the
/// result stays 0.
pub(crate) fn wrapping_product(dims: &[usize]) -> usize {
    dims.iter().fold(1usize, |acc, &d| acc.wrapping_mul(d))
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.dims.as_slice())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape {
            dims: SmallVec::from_vec(dims),
        }
    }
}

macro_rules! impl_shape_from_array {
    ($($n:expr),*) => {
        $(
            impl From<[usize; $n]> for Shape {
                fn from(dims: [usize; $n]) -> Self {
                    Shape::new(&dims)
                }
            }
        )*
    };
}

impl_shape_from_array!(0, 1, 2, 3, 4, 5, 6);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar() {
        let s = Shape::scalar();
        assert_eq!(s.ndim(), 0);
        assert_eq!(s.numel(), 1);
        assert!(s.is_scalar());
        assert_eq!(s.batch_size(), 1);
    }

    #[test]
    fn test_basic_shape() {
        let s = Shape::new(&[2, 3, 4]);
        assert_eq!(s.ndim(), 3);
        assert_eq!(s.numel(), 24);
        assert_eq!(s.dim(0), Some(2));
        assert_eq!(s.dim(2), Some(4));
        assert_eq!(s.dim(3), None);
        assert_eq!(s.last(), Some(4));
        assert_eq!(s.batch_size(), 6);
    }

    #[test]
    fn test_contiguous_strides() {
        let s = Shape::new(&[2, 3, 4]);
        let strides = s.contiguous_strides();
        assert_eq!(strides.as_slice(), &[12, 4, 1]);
        assert!(s.is_contiguous_strides(&[12, 4, 1]));
        assert!(!s.is_contiguous_strides(&[1, 2, 6]));
    }

    #[test]
    fn test_checked_numel() {
        assert_eq!(Shape::new(&[2, 3]).checked_numel(), Some(6));
        assert_eq!(Shape::new(&[usize::MAX, 2]).checked_numel(), None);
        assert_eq!(Shape::new(&[0, usize::MAX]).checked_numel(), Some(0));
        assert_eq!(Shape::new(&[usize::MAX, 2, 0]).checked_numel(), Some(0));
    }

    #[test]
    fn test_empty_shape_with_huge_dims() {
        let s = Shape::new(&[0, usize::MAX, 2]);
        assert_eq!(s.numel(), 0);
        assert_eq!(s.batch_size(), 0);
        assert_eq!(s.contiguous_strides().as_slice(), &[usize::MAX, 2, 1]);

        let s = Shape::new(&[usize::MAX, 2, 0]);
        assert_eq!(s.numel(), 0);
        assert_eq!(s.contiguous_strides().as_slice(), &[0, 0, 1]);
    }

    #[test]
    fn test_swapped() {
        let s = Shape::new(&[2, 3, 4]);
        assert_eq!(s.swapped(0, 2).unwrap().dims(), &[4, 3, 2]);
        assert!(s.swapped(0, 3).is_none());
    }

    #[test]
    fn test_with_last() {
        let s = Shape::new(&[2, 3, 4]);
        assert_eq!(s.with_last(7).dims(), &[2, 3, 7]);
    }

    #[test]
    fn test_from_array() {
        let s: Shape = [2, 3].into();
        assert_eq!(s.dims(), &[2, 3]);

        let s: Shape = [1, 2, 3, 4].into();
        assert_eq!(s.numel(), 24);
    }
}
