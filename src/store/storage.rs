//! Pluggable storage for array buffers.
//!
//! This trait abstracts how a `DataArray`'s flat buffer is stored (e.g. Vec,
//! mmap, GPU). The initial design keeps CPU-slice semantics; mapped or
//! device-resident variants can be added later without touching the array's
//! public API.

use core::fmt::{self, Debug};

use crate::mill_error::DataMillError;

/// Contiguous, indexable storage for `V` with slice access.
pub trait Storage<V>: Debug {
    /// Construct a buffer of `len`, filled with `fill`.
    fn with_len(len: usize, fill: V) -> Self
    where
        V: Clone;

    /// Current length in elements.
    fn len(&self) -> usize;

    /// True if the buffer holds no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resize to `new_len`, filling new cells with `fill`.
    fn resize(&mut self, new_len: usize, fill: V)
    where
        V: Clone;

    /// Entire read-only buffer.
    fn as_slice(&self) -> &[V];

    /// Entire mutable buffer.
    fn as_mut_slice(&mut self) -> &mut [V];

    /// Copy `src` into the range `[offset .. offset + src.len())`.
    fn write_at(&mut self, offset: usize, src: &[V]) -> Result<(), DataMillError>
    where
        V: Clone,
    {
        let end = offset
            .checked_add(src.len())
            .ok_or(DataMillError::IndexOutOfRange {
                index: offset,
                len: self.len(),
            })?;
        let len = self.len();
        let buf = self.as_mut_slice();
        let dst = buf
            .get_mut(offset..end)
            .ok_or(DataMillError::IndexOutOfRange { index: end - 1, len })?;
        dst.clone_from_slice(src);
        Ok(())
    }

    /// Read the range `[offset .. offset + dst.len())` into `dst`.
    fn read_into(&self, offset: usize, dst: &mut [V]) -> Result<(), DataMillError>
    where
        V: Clone,
    {
        let end = offset
            .checked_add(dst.len())
            .ok_or(DataMillError::IndexOutOfRange {
                index: offset,
                len: self.len(),
            })?;
        let buf = self.as_slice();
        let src = buf.get(offset..end).ok_or(DataMillError::IndexOutOfRange {
            index: end.saturating_sub(1),
            len: buf.len(),
        })?;
        dst.clone_from_slice(src);
        Ok(())
    }
}

/// `Vec`-backed storage (default).
#[derive(Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VecStorage<V>(pub(crate) Vec<V>);

impl<V> Debug for VecStorage<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VecStorage")
            .field("len", &self.0.len())
            .finish()
    }
}

impl<V> Storage<V> for VecStorage<V> {
    fn with_len(len: usize, fill: V) -> Self
    where
        V: Clone,
    {
        Self(vec![fill; len])
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn resize(&mut self, new_len: usize, fill: V)
    where
        V: Clone,
    {
        self.0.resize(new_len, fill);
    }

    fn as_slice(&self) -> &[V] {
        &self.0
    }

    fn as_mut_slice(&mut self) -> &mut [V] {
        &mut self.0
    }
}

impl<V> From<Vec<V>> for VecStorage<V> {
    fn from(v: Vec<V>) -> Self {
        Self(v)
    }
}

impl<V> VecStorage<V> {
    /// Consume the wrapper and return the backing vector.
    pub fn into_inner(self) -> Vec<V> {
        self.0
    }
}
