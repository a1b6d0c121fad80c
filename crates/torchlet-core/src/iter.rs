//! Tensor traversal.
//!
//! - [`StridedOffsets`]: every physical element offset of a possibly
//!   non-contiguous layout, in logical row-major order.
//! - [`RowIter`]: lock-step walk over the trailing-dimension rows of one output
//!   and zero or more inputs, one step per batch element.

use smallvec::SmallVec;

use crate::dtype::Element;
use crate::error::TorchletError;
use crate::shape::wrapping_product;
use crate::storage::StorageRead;
use crate::tensor::Tensor;
use crate::Result;

/// Iterator over the storage offsets of every logical element of a layout.
///
/// Logical index `i` is decomposed into coordinates by repeated div/mod over
/// the trailing dimensions, then dotted with the strides.
#[derive(Debug, Clone)]
pub struct StridedOffsets<'a> {
    shape: &'a [usize],
    strides: &'a [usize],
    base: usize,
    index: usize,
    numel: usize,
}

impl<'a> StridedOffsets<'a> {
    pub fn new(shape: &'a [usize], strides: &'a [usize], base: usize) -> Self {
        debug_assert_eq!(shape.len(), strides.len());
        Self {
            shape,
            strides,
            base,
            index: 0,
            numel: wrapping_product(shape),
        }
    }

    fn offset_of(&self, mut index: usize) -> usize {
        let mut offset = self.base;
        for dim in (0..self.shape.len()).rev() {
            let size = self.shape[dim];
            offset += (index % size) * self.strides[dim];
            index /= size;
        }
        offset
    }
}

impl Iterator for StridedOffsets<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.index >= self.numel {
            return None;
        }
        let offset = self.offset_of(self.index);
        self.index += 1;
        Some(offset)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.numel - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for StridedOffsets<'_> {}

/// Where an input's rows are read from during a [`RowIter`] walk.
enum RowSource<'g, T> {
    Shared(StorageRead<'g>),
    /// Copy taken up front because the input aliases the output's storage.
    Snapshot(Vec<T>),
}

/// Batched row traversal over an output tensor and its inputs.
///
/// Every tensor is split into rows along its trailing dimension; all leading
/// dimensions are flattened into the batch. Tensors must be contiguous and
/// inputs must have the same batch size as the output.
pub struct RowIter<'a> {
    output: &'a Tensor,
    inputs: SmallVec<[&'a Tensor; 2]>,
    batch_size: usize,
    output_dim: usize,
    input_dim: usize,
    itemsize: usize,
}

impl<'a> RowIter<'a> {
    /// Build a traversal plan for `output` and `inputs`.
    pub fn new(output: &'a Tensor, inputs: &[&'a Tensor]) -> Result<Self> {
        check_row_layout(output, "output")?;
        let batch_size = output.shape().batch_size();

        for input in inputs {
            check_row_layout(input, "input")?;
            if input.shape().batch_size() != batch_size {
                return Err(TorchletError::ShapeMismatch {
                    expected: output.shape().dims().to_vec(),
                    got: input.shape().dims().to_vec(),
                });
            }
        }

        let output_dim = output.shape().last().unwrap_or(1);
        let input_dim = inputs
            .first()
            .and_then(|t| t.shape().last())
            .unwrap_or(0);

        tracing::trace!(batch_size, output_dim, input_dim, "row iter");

        Ok(Self {
            output,
            inputs: inputs.iter().copied().collect(),
            batch_size,
            output_dim,
            input_dim,
            itemsize: output.dtype().element_size(),
        })
    }

    /// Number of rows visited.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Row length of the output.
    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// Row length of the first input (0 without inputs).
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Byte width of one output element.
    pub fn itemsize(&self) -> usize {
        self.itemsize
    }

    /// Hand every output row to `f`.
    ///
    /// The output storage is write-locked while `f` runs, so `f` must not
    /// read or write any tensor sharing that storage; doing so deadlocks.
    pub fn for_each<T: Element>(&self, mut f: impl FnMut(&mut [T])) -> Result<()> {
        check_dtype::<T>(self.output)?;
        if self.output.numel() == 0 {
            return Ok(());
        }
        let mut guard = self.output.storage().write();
        let out = &mut guard.as_slice_mut::<T>()[span(self.output)];
        let od = self.output_dim;
        for b in 0..self.batch_size {
            f(&mut out[b * od..(b + 1) * od]);
        }
        Ok(())
    }

    /// Hand every output row to `f` together with the matching row of each input.
    ///
    /// Inputs that alias the output are copied before the walk. As with
    /// [`RowIter::for_each`], `f` runs under the output's write lock and must
    /// not touch tensors sharing the output's storage.
    pub fn for_each_with_inputs<T: Element>(
        &self,
        mut f: impl FnMut(&mut [T], &[&[T]]),
    ) -> Result<()> {
        check_dtype::<T>(self.output)?;
        for input in &self.inputs {
            check_dtype::<T>(input)?;
        }
        if self.output.numel() == 0 {
            return Ok(());
        }

        let out_storage = self.output.storage();
        let sources: SmallVec<[RowSource<'_, T>; 2]> = self
            .inputs
            .iter()
            .map(|t| {
                if t.storage().ptr_eq(out_storage) {
                    RowSource::Snapshot(t.storage().read().as_slice::<T>()[span(t)].to_vec())
                } else {
                    RowSource::Shared(t.storage().read())
                }
            })
            .collect();

        let regions: SmallVec<[(&[T], usize); 2]> = self
            .inputs
            .iter()
            .zip(sources.iter())
            .map(|(t, src)| {
                let region = match src {
                    RowSource::Shared(guard) => &guard.as_slice::<T>()[span(t)],
                    RowSource::Snapshot(v) => v.as_slice(),
                };
                (region, t.shape().last().unwrap_or(1))
            })
            .collect();

        let mut guard = out_storage.write();
        let out = &mut guard.as_slice_mut::<T>()[span(self.output)];
        let od = self.output_dim;

        for b in 0..self.batch_size {
            let rows: SmallVec<[&[T]; 2]> = regions
                .iter()
                .map(|&(region, d)| &region[b * d..(b + 1) * d])
                .collect();
            f(&mut out[b * od..(b + 1) * od], &rows);
        }
        Ok(())
    }
}

fn span(t: &Tensor) -> std::ops::Range<usize> {
    t.elem_offset()..t.elem_offset() + t.numel()
}

fn check_row_layout(t: &Tensor, name: &str) -> Result<()> {
    if !t.is_contiguous() {
        return Err(TorchletError::NotContiguous(name.to_string()));
    }
    Ok(())
}

fn check_dtype<T: Element>(t: &Tensor) -> Result<()> {
    if t.dtype() != T::DTYPE {
        return Err(TorchletError::DtypeMismatch {
            expected: t.dtype(),
            got: T::DTYPE,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DType;

    #[test]
    fn test_strided_offsets_contiguous() {
        let offsets: Vec<usize> = StridedOffsets::new(&[2, 3], &[3, 1], 0).collect();
        assert_eq!(offsets, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_strided_offsets_transposed() {
        // [2, 3] row-major viewed as [3, 2]
        let offsets: Vec<usize> = StridedOffsets::new(&[3, 2], &[1, 3], 0).collect();
        assert_eq!(offsets, vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn test_strided_offsets_base_and_len() {
        let it = StridedOffsets::new(&[2], &[4], 5);
        assert_eq!(it.len(), 2);
        assert_eq!(it.collect::<Vec<_>>(), vec![5, 9]);
        assert_eq!(StridedOffsets::new(&[0, 3], &[3, 1], 0).count(), 0);
        assert_eq!(StridedOffsets::new(&[], &[], 7).collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn test_empty_output_visits_nothing() {
        let out = Tensor::zeros(&[usize::MAX, 2, 0], DType::Float32).unwrap();
        let it = RowIter::new(&out, &[&out]).unwrap();
        let mut calls = 0;
        it.for_each::<f32>(|_| calls += 1).unwrap();
        it.for_each_with_inputs::<f32>(|_, _| calls += 1).unwrap();
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_row_iter_plan() {
        let out = Tensor::zeros(&[2, 3, 5], DType::Float32).unwrap();
        let x = Tensor::zeros(&[2, 3, 4], DType::Float32).unwrap();
        let it = RowIter::new(&out, &[&x]).unwrap();
        assert_eq!(it.batch_size(), 6);
        assert_eq!(it.output_dim(), 5);
        assert_eq!(it.input_dim(), 4);
        assert_eq!(it.itemsize(), 4);
    }

    #[test]
    fn test_for_each_writes_rows() {
        let out = Tensor::zeros(&[3, 2], DType::Int64).unwrap();
        let mut row_id = 0i64;
        RowIter::new(&out, &[])
            .unwrap()
            .for_each::<i64>(|row| {
                row.fill(row_id);
                row_id += 1;
            })
            .unwrap();
        assert_eq!(out.to_vec::<i64>().unwrap(), vec![0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_for_each_with_inputs_lockstep() {
        let x = Tensor::from_vec(vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
        let y = Tensor::from_vec(vec![10.0f64, 20.0], &[2, 1]).unwrap();
        let out = Tensor::zeros(&[2, 1], DType::Float64).unwrap();
        RowIter::new(&out, &[&x, &y])
            .unwrap()
            .for_each_with_inputs::<f64>(|o, ins| {
                o[0] = ins[0].iter().sum::<f64>() + ins[1][0];
            })
            .unwrap();
        assert_eq!(out.to_vec::<f64>().unwrap(), vec![16.0, 35.0]);
    }

    #[test]
    fn test_input_aliasing_output() {
        let t = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let alias = t.view(&[2, 2]).unwrap();
        RowIter::new(&t, &[&alias])
            .unwrap()
            .for_each_with_inputs::<f32>(|o, ins| {
                o[0] = ins[0][1];
                o[1] = ins[0][0];
            })
            .unwrap();
        assert_eq!(t.to_vec::<f32>().unwrap(), vec![2.0, 1.0, 4.0, 3.0]);
    }

    #[test]
    fn test_row_iter_rejects_bad_layouts() {
        let out = Tensor::zeros(&[2, 3], DType::Float32).unwrap();
        let x = Tensor::zeros(&[3, 2], DType::Float32).unwrap();
        let xt = x.permute(0, 1).unwrap();
        assert!(matches!(
            RowIter::new(&out, &[&xt]),
            Err(TorchletError::NotContiguous(_))
        ));

        let wrong_batch = Tensor::zeros(&[4, 3], DType::Float32).unwrap();
        assert!(matches!(
            RowIter::new(&out, &[&wrong_batch]),
            Err(TorchletError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_row_iter_dtype_checked() {
        let out = Tensor::zeros(&[2], DType::Float32).unwrap();
        let it = RowIter::new(&out, &[]).unwrap();
        assert!(matches!(
            it.for_each::<f64>(|_| {}),
            Err(TorchletError::DtypeMismatch { .. })
        ));
    }
}
