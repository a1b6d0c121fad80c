use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::dtype::Element;

/// Backing allocation: 8-byte words so every element type can be viewed in place.
struct StorageInner {
    words: RwLock<Box<[u64]>>,
    nbytes: usize,
}

/// Shared, reference-counted, untyped tensor storage.
///
/// Cloning a `Storage` clones the handle, not the bytes: every tensor view
/// derived from the same allocation writes through to the same memory. The
/// allocation is freed when the last handle is dropped and is never resized.
#[derive(Clone)]
pub struct Storage {
    inner: Arc<StorageInner>,
}

impl Storage {
    /// Allocate `nbytes` of zeroed storage.
    pub fn zeros(nbytes: usize) -> Self {
        let words = vec![0u64; nbytes.div_ceil(8)].into_boxed_slice();
        tracing::trace!(nbytes, "storage alloc");
        Self {
            inner: Arc::new(StorageInner {
                words: RwLock::new(words),
                nbytes,
            }),
        }
    }

    /// Allocate storage holding a copy of `data`.
    pub fn from_elements<T: Element>(data: &[T]) -> Self {
        let storage = Self::zeros(std::mem::size_of_val(data));
        storage.write().as_slice_mut::<T>().copy_from_slice(data);
        storage
    }

    /// Size in bytes.
    pub fn nbytes(&self) -> usize {
        self.inner.nbytes
    }

    /// Whether both handles refer to the same allocation.
    pub fn ptr_eq(&self, other: &Storage) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Address of the first byte, for identity checks only.
    pub fn as_ptr(&self) -> *const u8 {
        self.inner.words.read_recursive().as_ptr().cast()
    }

    /// Number of live handles (tensors and views) sharing this allocation.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Whether this storage is uniquely owned.
    pub fn is_unique(&self) -> bool {
        self.ref_count() == 1
    }

    /// Acquire shared read access to the bytes.
    ///
    /// Several read guards on one allocation may be held by the same thread.
    pub fn read(&self) -> StorageRead<'_> {
        StorageRead {
            guard: self.inner.words.read_recursive(),
            nbytes: self.inner.nbytes,
        }
    }

    /// Acquire exclusive write access to the bytes.
    pub fn write(&self) -> StorageWrite<'_> {
        StorageWrite {
            guard: self.inner.words.write(),
            nbytes: self.inner.nbytes,
        }
    }
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("nbytes", &self.inner.nbytes)
            .field("refs", &self.ref_count())
            .finish()
    }
}

/// Read guard over a storage allocation.
pub struct StorageRead<'a> {
    guard: RwLockReadGuard<'a, Box<[u64]>>,
    nbytes: usize,
}

impl StorageRead<'_> {
    /// The raw bytes.
    pub fn bytes(&self) -> &[u8] {
        let bytes: &[u8] = bytemuck::cast_slice(&self.guard[..]);
        &bytes[..self.nbytes]
    }

    /// The bytes reinterpreted as elements of `T`.
    ///
    /// A trailing partial element, if any, is not included.
    pub fn as_slice<T: Element>(&self) -> &[T] {
        let len = whole_elements::<T>(self.nbytes);
        bytemuck::cast_slice(&self.bytes()[..len])
    }
}

/// Write guard over a storage allocation.
pub struct StorageWrite<'a> {
    guard: RwLockWriteGuard<'a, Box<[u64]>>,
    nbytes: usize,
}

impl StorageWrite<'_> {
    /// The raw bytes.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        let nbytes = self.nbytes;
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut self.guard[..]);
        &mut bytes[..nbytes]
    }

    /// The bytes reinterpreted as mutable elements of `T`.
    pub fn as_slice_mut<T: Element>(&mut self) -> &mut [T] {
        let len = whole_elements::<T>(self.nbytes);
        bytemuck::cast_slice_mut(&mut self.bytes_mut()[..len])
    }
}

fn whole_elements<T>(nbytes: usize) -> usize {
    let width = std::mem::size_of::<T>();
    nbytes / width * width
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let s = Storage::zeros(40);
        assert_eq!(s.nbytes(), 40);
        assert!(s.read().bytes().iter().all(|&b| b == 0));
        assert_eq!(s.read().as_slice::<f32>().len(), 10);
    }

    #[test]
    fn test_odd_byte_count() {
        let s = Storage::zeros(3);
        assert_eq!(s.read().bytes().len(), 3);
        assert_eq!(s.read().as_slice::<u8>().len(), 3);
        assert_eq!(s.read().as_slice::<u32>().len(), 0);
    }

    #[test]
    fn test_from_elements() {
        let s = Storage::from_elements(&[1.0f64, 2.0, 3.0]);
        assert_eq!(s.nbytes(), 24);
        assert_eq!(s.read().as_slice::<f64>(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_shared_writes_are_visible() {
        let s1 = Storage::from_elements(&[1.0f32, 2.0, 3.0]);
        let s2 = s1.clone();
        assert!(!s1.is_unique());
        assert!(s1.ptr_eq(&s2));
        assert_eq!(s1.as_ptr(), s2.as_ptr());

        s2.write().as_slice_mut::<f32>()[0] = 99.0;
        assert_eq!(s1.read().as_slice::<f32>()[0], 99.0);
    }

    #[test]
    fn test_ref_count_tracks_handles() {
        let s1 = Storage::zeros(8);
        assert_eq!(s1.ref_count(), 1);
        let s2 = s1.clone();
        assert_eq!(s1.ref_count(), 2);
        drop(s2);
        assert!(s1.is_unique());
    }

    #[test]
    fn test_distinct_allocations() {
        let a = Storage::zeros(8);
        let b = Storage::zeros(8);
        assert!(!a.ptr_eq(&b));
    }
}
