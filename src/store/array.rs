//! `DataArray`: homogeneous, tuple-shaped, multi-component typed buffers.
//!
//! An array stores `tuple_count * component_count` elements contiguously.
//! The tuple shape is an ordered list of dimension sizes (the leading,
//! resizable dimensions shared with the owning attribute matrix); the
//! component shape describes the fixed per-tuple layout and never changes
//! after construction.

use serde::{Deserialize, Serialize};

use crate::mill_error::DataMillError;
use crate::store::storage::{Storage, VecStorage};

/// Product of a shape's dimensions; the empty shape counts as one scalar.
#[inline]
pub fn shape_len(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Typed, tuple-shaped contiguous buffer.
///
/// # Type Parameters
/// - `T`: element type, one of the supported tags (see
///   [`DataType`](crate::store::tagged::DataType)).
/// - `S`: backing storage, defaults to [`VecStorage`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataArray<T, S: Storage<T> = VecStorage<T>> {
    tuple_shape: Vec<usize>,
    component_shape: Vec<usize>,
    data: S,
    #[serde(skip)]
    _marker: std::marker::PhantomData<T>,
}

impl<T, S> DataArray<T, S>
where
    T: Clone + Default,
    S: Storage<T>,
{
    /// Construct an array filled with `T::default()`.
    pub fn new(tuple_shape: Vec<usize>, component_shape: Vec<usize>) -> Self {
        let len = shape_len(&tuple_shape) * shape_len(&component_shape);
        Self {
            tuple_shape,
            component_shape,
            data: S::with_len(len, T::default()),
            _marker: std::marker::PhantomData,
        }
    }

    /// Construct an array filled with `fill`.
    pub fn filled(tuple_shape: Vec<usize>, component_shape: Vec<usize>, fill: T) -> Self {
        let len = shape_len(&tuple_shape) * shape_len(&component_shape);
        Self {
            tuple_shape,
            component_shape,
            data: S::with_len(len, fill),
            _marker: std::marker::PhantomData,
        }
    }

    /// Reshape the tuple dimensions, truncating or zero-extending the buffer.
    ///
    /// The component shape never changes; existing element values in the
    /// retained prefix are preserved.
    pub fn resize_tuples(&mut self, new_tuple_shape: Vec<usize>) {
        let new_len = shape_len(&new_tuple_shape) * self.component_count();
        self.data.resize(new_len, T::default());
        self.tuple_shape = new_tuple_shape;
    }

    /// Overwrite every element with `value`.
    pub fn fill(&mut self, value: T) {
        for slot in self.data.as_mut_slice() {
            *slot = value.clone();
        }
    }
}

impl<T, S: Storage<T>> DataArray<T, S> {
    /// Ordered tuple dimensions.
    #[inline]
    pub fn tuple_shape(&self) -> &[usize] {
        &self.tuple_shape
    }

    /// Ordered per-tuple component dimensions.
    #[inline]
    pub fn component_shape(&self) -> &[usize] {
        &self.component_shape
    }

    /// Number of tuples (product of the tuple shape).
    #[inline]
    pub fn tuple_count(&self) -> usize {
        shape_len(&self.tuple_shape)
    }

    /// Elements per tuple (product of the component shape).
    #[inline]
    pub fn component_count(&self) -> usize {
        shape_len(&self.component_shape)
    }

    /// Total element count.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the array holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bounds-checked read of the flattened element at `index`.
    ///
    /// The flat index is `tuple_index * component_count + component_index`.
    ///
    /// # Errors
    /// `IndexOutOfRange` with the offending index and the buffer length.
    #[inline]
    pub fn get(&self, index: usize) -> Result<&T, DataMillError> {
        self.data
            .as_slice()
            .get(index)
            .ok_or(DataMillError::IndexOutOfRange {
                index,
                len: self.data.len(),
            })
    }

    /// Bounds-checked write of the flattened element at `index`.
    #[inline]
    pub fn set(&mut self, index: usize, value: T) -> Result<(), DataMillError> {
        let len = self.data.len();
        let slot = self
            .data
            .as_mut_slice()
            .get_mut(index)
            .ok_or(DataMillError::IndexOutOfRange { index, len })?;
        *slot = value;
        Ok(())
    }

    /// Read-only view of the components of tuple `t`.
    pub fn tuple(&self, t: usize) -> Result<&[T], DataMillError> {
        let comps = self.component_count();
        let start = t * comps;
        self.data
            .as_slice()
            .get(start..start + comps)
            .ok_or(DataMillError::IndexOutOfRange {
                index: start,
                len: self.data.len(),
            })
    }

    /// Mutable view of the components of tuple `t`.
    pub fn tuple_mut(&mut self, t: usize) -> Result<&mut [T], DataMillError> {
        let comps = self.component_count();
        let start = t * comps;
        let len = self.data.len();
        self.data
            .as_mut_slice()
            .get_mut(start..start + comps)
            .ok_or(DataMillError::IndexOutOfRange { index: start, len })
    }

    /// Entire flat buffer, read-only. Never copies.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.data.as_slice()
    }

    /// Entire flat buffer, mutable. Never copies.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data.as_mut_slice()
    }

    /// Iterate over `(tuple_index, &[T])` component slices in order.
    pub fn iter_tuples(&self) -> impl Iterator<Item = (usize, &[T])> {
        let comps = self.component_count().max(1);
        self.data.as_slice().chunks_exact(comps).enumerate()
    }
}

impl<T, S> DataArray<T, S>
where
    T: bytemuck::Pod,
    S: Storage<T>,
{
    /// Raw byte view over the flat buffer, for zero-copy export of numeric
    /// element types.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.data.as_slice())
    }
}
