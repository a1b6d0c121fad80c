use std::fmt;

use num_traits::One;

use crate::dtype::{DType, Element};
use crate::error::TorchletError;
use crate::iter::StridedOffsets;
use crate::shape::{Shape, Strides};
use crate::slice::Slice;
use crate::storage::Storage;
use crate::Result;

/// A strided multi-dimensional array over shared storage.
///
/// A tensor is an immutable layout descriptor (shape, strides, element
/// offset, dtype) plus a shared handle to its [`Storage`]. View operations
/// (`index`, `index_slices`, `permute`, `view`) return new descriptors over
/// the same storage; writes through any view are visible through all others.
///
/// # Examples
///
/// ```
/// use torchlet_core::{DType, Slice, Tensor};
///
/// let t = Tensor::zeros(&[3, 4], DType::Float32).unwrap();
/// let row = t.index_slices(&[Slice::at(1).unwrap(), Slice::new(0, 4).unwrap()]).unwrap();
/// assert_eq!(row.shape().dims(), &[4]);
///
/// row.fill_(5.0f32).unwrap();
/// assert_eq!(t.index(&[1, 2]).unwrap().item::<f32>().unwrap(), 5.0);
/// ```
#[derive(Clone)]
pub struct Tensor {
    storage: Storage,
    shape: Shape,
    strides: Strides,
    elem_offset: usize,
    dtype: DType,
    numel: usize,
    contiguous: bool,
}

impl Tensor {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Allocate a zero-initialised contiguous tensor.
    ///
    /// Fails with `InvalidShape` if the element count or byte size overflows.
    pub fn new(shape: &[usize], dtype: DType) -> Result<Self> {
        let s = Shape::new(shape);
        let numel = s.checked_numel().ok_or_else(|| TorchletError::InvalidShape {
            shape: shape.to_vec(),
            reason: "element count overflows usize".into(),
        })?;
        let nbytes = dtype
            .storage_bytes(numel)
            .ok_or_else(|| TorchletError::InvalidShape {
                shape: shape.to_vec(),
                reason: format!("{numel} elements of {dtype} overflow the address space"),
            })?;
        let strides = s.contiguous_strides();
        Ok(Self {
            storage: Storage::zeros(nbytes),
            shape: s,
            strides,
            elem_offset: 0,
            dtype,
            numel,
            contiguous: true,
        })
    }

    /// Create a tensor of zeros with the given shape and dtype.
    pub fn zeros(shape: &[usize], dtype: DType) -> Result<Self> {
        Self::new(shape, dtype)
    }

    /// Create a tensor of ones with the given shape and dtype.
    pub fn ones(shape: &[usize], dtype: DType) -> Result<Self> {
        let t = Self::new(shape, dtype)?;
        crate::dispatch_all!(dtype, T => t.fill_(T::one())?);
        Ok(t)
    }

    /// Create a tensor filled with `value`; the dtype follows `T`.
    pub fn full<T: Element>(shape: &[usize], value: T) -> Result<Self> {
        let t = Self::new(shape, T::DTYPE)?;
        t.fill_(value)?;
        Ok(t)
    }

    /// Create a contiguous tensor owning `data` laid out row-major.
    pub fn from_vec<T: Element>(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        Self::from_slice(&data, shape)
    }

    /// Create a contiguous tensor holding a copy of `data`.
    pub fn from_slice<T: Element>(data: &[T], shape: &[usize]) -> Result<Self> {
        let s = Shape::new(shape);
        if s.checked_numel() != Some(data.len()) {
            return Err(TorchletError::ShapeMismatch {
                expected: shape.to_vec(),
                got: vec![data.len()],
            });
        }
        let strides = s.contiguous_strides();
        Ok(Self {
            storage: Storage::from_elements(data),
            numel: data.len(),
            shape: s,
            strides,
            elem_offset: 0,
            dtype: T::DTYPE,
            contiguous: true,
        })
    }

    /// A new descriptor over this tensor's storage.
    fn view_of(&self, shape: Shape, strides: Strides, elem_offset: usize, contiguous: bool) -> Self {
        debug_assert_eq!(shape.ndim(), strides.len());
        Self {
            storage: self.storage.clone(),
            numel: shape.numel(),
            shape,
            strides,
            elem_offset,
            dtype: self.dtype,
            contiguous,
        }
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Shape of the tensor.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.numel
    }

    /// Data type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Strides (in elements, not bytes).
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Element index into storage of element (0, …, 0).
    pub fn elem_offset(&self) -> usize {
        self.elem_offset
    }

    /// Whether this tensor is laid out row-major.
    ///
    /// Tracked explicitly by each view op rather than recomputed.
    pub fn is_contiguous(&self) -> bool {
        self.contiguous
    }

    /// The shared storage handle.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Whether both tensors view the same allocation.
    pub fn shares_storage(&self, other: &Tensor) -> bool {
        self.storage.ptr_eq(&other.storage)
    }

    /// Storage offsets of every logical element, in row-major order.
    pub fn strided_offsets(&self) -> StridedOffsets<'_> {
        StridedOffsets::new(self.shape.dims(), &self.strides, self.elem_offset)
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Element offset of a point index, validating rank and bounds.
    fn point_offset(&self, indices: &[usize]) -> Result<usize> {
        let out_of_range = || TorchletError::IndexOutOfRange {
            index: indices.to_vec(),
            shape: self.shape.dims().to_vec(),
        };
        if indices.len() != self.ndim() {
            return Err(out_of_range());
        }
        let mut offset = self.elem_offset;
        for ((&i, &size), &stride) in indices.iter().zip(self.shape.dims()).zip(&self.strides) {
            if i >= size {
                return Err(out_of_range());
            }
            offset += i * stride;
        }
        Ok(offset)
    }

    /// Select one element as a shape `[1]` view sharing storage.
    pub fn index(&self, indices: &[usize]) -> Result<Tensor> {
        let offset = self.point_offset(indices)?;
        Ok(self.view_of(Shape::new(&[1]), Strides::from_slice(&[1]), offset, true))
    }

    /// Select a sub-block with one [`Slice`] per axis.
    ///
    /// Axes whose slice covers a single element are dropped. The offset
    /// advances by `start * stride` on every axis, dropped ones included. The
    /// result is always marked non-contiguous.
    pub fn index_slices(&self, slices: &[Slice]) -> Result<Tensor> {
        let out_of_range = || TorchletError::IndexOutOfRange {
            index: slices.iter().map(Slice::end).collect(),
            shape: self.shape.dims().to_vec(),
        };
        if slices.len() != self.ndim() {
            return Err(out_of_range());
        }

        let mut dims: Vec<usize> = Vec::with_capacity(slices.len());
        let mut strides = Strides::new();
        let mut offset = self.elem_offset;
        for ((slice, &size), &stride) in slices.iter().zip(self.shape.dims()).zip(&self.strides) {
            if slice.end() > size {
                return Err(out_of_range());
            }
            offset += slice.start() * stride;
            if slice.range() != 1 {
                dims.push(slice.range());
                strides.push(stride);
            }
        }

        if dims.is_empty() {
            dims.push(1);
            strides.push(1);
        }
        Ok(self.view_of(Shape::from(dims), strides, offset, false))
    }

    /// Swap two axes (zero-copy view).
    pub fn permute(&self, a: usize, b: usize) -> Result<Tensor> {
        let shape = self.shape.swapped(a, b).ok_or_else(|| TorchletError::IndexOutOfRange {
            index: vec![a, b],
            shape: self.shape.dims().to_vec(),
        })?;
        let mut strides = self.strides.clone();
        strides.swap(a, b);
        let contiguous = a == b && self.contiguous;
        Ok(self.view_of(shape, strides, self.elem_offset, contiguous))
    }

    /// Reinterpret a contiguous tensor with a new shape of equal element count.
    pub fn view(&self, new_shape: &[usize]) -> Result<Tensor> {
        if !self.contiguous {
            return Err(TorchletError::NotContiguous("view source".into()));
        }
        let shape = Shape::new(new_shape);
        if shape.checked_numel() != Some(self.numel) {
            return Err(TorchletError::ShapeMismatch {
                expected: self.shape.dims().to_vec(),
                got: new_shape.to_vec(),
            });
        }
        let strides = shape.contiguous_strides();
        Ok(self.view_of(shape, strides, self.elem_offset, true))
    }

    /// Return a contiguous copy if this tensor is not already contiguous.
    pub fn contiguous(&self) -> Result<Tensor> {
        if self.contiguous {
            return Ok(self.clone());
        }
        crate::dispatch_all!(self.dtype, T => {
            let data = self.to_vec::<T>()?;
            Tensor::from_vec(data, self.shape.dims())
        })
    }

    // =========================================================================
    // Element access
    // =========================================================================

    fn check_dtype<T: Element>(&self) -> Result<()> {
        if T::DTYPE != self.dtype {
            return Err(TorchletError::DtypeMismatch {
                expected: self.dtype,
                got: T::DTYPE,
            });
        }
        Ok(())
    }

    /// Write `value` to every element of this tensor (through any view).
    pub fn fill_<T: Element>(&self, value: T) -> Result<()> {
        self.check_dtype::<T>()?;
        let mut guard = self.storage.write();
        let data = guard.as_slice_mut::<T>();
        if self.contiguous {
            data[self.elem_offset..self.elem_offset + self.numel].fill(value);
        } else {
            for offset in self.strided_offsets() {
                data[offset] = value;
            }
        }
        Ok(())
    }

    /// Write a single element at a point index.
    pub fn assign_<T: Element>(&self, indices: &[usize], value: T) -> Result<()> {
        self.check_dtype::<T>()?;
        let offset = self.point_offset(indices)?;
        self.storage.write().as_slice_mut::<T>()[offset] = value;
        Ok(())
    }

    /// Read element (0, …, 0), typically of a point-index view.
    pub fn item<T: Element>(&self) -> Result<T> {
        self.check_dtype::<T>()?;
        if self.numel == 0 {
            return Err(TorchletError::IndexOutOfRange {
                index: vec![0],
                shape: self.shape.dims().to_vec(),
            });
        }
        Ok(self.storage.read().as_slice::<T>()[self.elem_offset])
    }

    /// Copy the logical elements out in row-major order.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        self.check_dtype::<T>()?;
        let guard = self.storage.read();
        let data = guard.as_slice::<T>();
        if self.contiguous {
            return Ok(data[self.elem_offset..self.elem_offset + self.numel].to_vec());
        }
        Ok(self.strided_offsets().map(|o| data[o]).collect())
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tensor(shape={}, strides={:?}, offset={}, dtype={}, contiguous={})",
            self.shape,
            self.strides.as_slice(),
            self.elem_offset,
            self.dtype,
            self.contiguous,
        )
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.numel > 20 {
            return write!(f, "tensor(shape={}, dtype={})", self.shape, self.dtype);
        }
        crate::dispatch_all!(self.dtype, T => match self.to_vec::<T>() {
            Ok(data) => write!(f, "tensor({:?}, shape={})", data, self.shape),
            Err(_) => write!(f, "tensor(shape={}, dtype={})", self.shape, self.dtype),
        })
    }
}
