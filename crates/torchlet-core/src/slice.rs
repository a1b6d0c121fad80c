use std::ops::Range;

use crate::error::TorchletError;
use crate::Result;

/// A half-open element range `[start, end)` along one axis.
///
/// Only used as an indexing argument; a slice of range 1 squeezes its axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    start: usize,
    end: usize,
}

impl Slice {
    /// Create `[start, end)`. Fails unless `end > start`.
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if end <= start {
            return Err(TorchletError::InvalidSlice { start, end });
        }
        Ok(Self { start, end })
    }

    /// The single-element slice `[index, index + 1)`. Fails for
    /// `usize::MAX`, whose end is not representable.
    pub fn at(index: usize) -> Result<Self> {
        let end = index
            .checked_add(1)
            .ok_or(TorchletError::InvalidSlice { start: index, end: index })?;
        Ok(Self { start: index, end })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of elements covered.
    pub fn range(&self) -> usize {
        self.end - self.start
    }
}

impl TryFrom<Range<usize>> for Slice {
    type Error = TorchletError;

    fn try_from(r: Range<usize>) -> Result<Self> {
        Slice::new(r.start, r.end)
    }
}

impl TryFrom<usize> for Slice {
    type Error = TorchletError;

    fn try_from(index: usize) -> Result<Self> {
        Slice::at(index)
    }
}
