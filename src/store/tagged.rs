//! Tagged element types and the type-dispatch entry point.
//!
//! The store supports a closed set of eleven element types. Rather than
//! runtime downcasting, the tag is a closed enum ([`DataType`]) and dispatch
//! maps the tag to a monomorphized call through a caller-supplied visitor
//! ([`ArrayOp`], [`ArrayOpMut`], [`TypeOp`]). A filter written once against
//! the visitor applies to every supported element type, and the match is
//! exhaustiveness-checked at compile time.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::mill_error::DataMillError;
use crate::store::array::DataArray;

/// Closed tag over the supported element types.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Boolean,
}

impl DataType {
    /// Every supported tag, in declaration order.
    pub const ALL: [DataType; 11] = [
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::UInt8,
        DataType::UInt16,
        DataType::UInt32,
        DataType::UInt64,
        DataType::Float32,
        DataType::Float64,
        DataType::Boolean,
    ];

    /// Stable string label for the tag.
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::UInt8 => "uint8",
            DataType::UInt16 => "uint16",
            DataType::UInt32 => "uint32",
            DataType::UInt64 => "uint64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Boolean => "bool",
        }
    }

    /// Parse a tag from its stable label.
    ///
    /// This is the boundary where open input (strings, documents) meets the
    /// closed type set; anything else fails `UnsupportedType`.
    pub fn parse(tag: &str) -> Result<Self, DataMillError> {
        match tag {
            "int8" => Ok(DataType::Int8),
            "int16" => Ok(DataType::Int16),
            "int32" => Ok(DataType::Int32),
            "int64" => Ok(DataType::Int64),
            "uint8" => Ok(DataType::UInt8),
            "uint16" => Ok(DataType::UInt16),
            "uint32" => Ok(DataType::UInt32),
            "uint64" => Ok(DataType::UInt64),
            "float32" => Ok(DataType::Float32),
            "float64" => Ok(DataType::Float64),
            "bool" => Ok(DataType::Boolean),
            other => Err(DataMillError::UnsupportedType(other.to_owned())),
        }
    }

    /// True for every tag except `Boolean`.
    pub fn is_numeric(self) -> bool {
        !matches!(self, DataType::Boolean)
    }

    /// Invoke `op` instantiated for the element type this tag names.
    pub fn dispatch<O: TypeOp>(self, op: O) -> O::Output {
        match self {
            DataType::Int8 => op.apply::<i8>(),
            DataType::Int16 => op.apply::<i16>(),
            DataType::Int32 => op.apply::<i32>(),
            DataType::Int64 => op.apply::<i64>(),
            DataType::UInt8 => op.apply::<u8>(),
            DataType::UInt16 => op.apply::<u16>(),
            DataType::UInt32 => op.apply::<u32>(),
            DataType::UInt64 => op.apply::<u64>(),
            DataType::Float32 => op.apply::<f32>(),
            DataType::Float64 => op.apply::<f64>(),
            DataType::Boolean => op.apply::<bool>(),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a compile-time element type to its tag and the tagged union.
pub trait ArrayElement:
    Clone + Default + PartialEq + Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Tag for this concrete element type.
    const DATA_TYPE: DataType;

    /// Wrap a typed array into the tagged union.
    fn wrap(array: DataArray<Self>) -> TaggedArray;
    /// Borrow a typed array if the tag matches.
    fn unwrap(tagged: &TaggedArray) -> Option<&DataArray<Self>>;
    /// Mutably borrow a typed array if the tag matches.
    fn unwrap_mut(tagged: &mut TaggedArray) -> Option<&mut DataArray<Self>>;

    /// Lossy conversion from a configuration scalar (saturating to the
    /// default on unrepresentable input).
    fn from_f64(value: f64) -> Self;
    /// Lossy widening to `f64` for generic comparisons.
    fn to_f64(&self) -> f64;
}

/// Generic operation over a borrowed typed array, instantiated by dispatch.
pub trait ArrayOp {
    /// Result of the operation.
    type Output;
    /// Monomorphized body.
    fn apply<T: ArrayElement>(self, array: &DataArray<T>) -> Self::Output;
}

/// Generic operation over a mutably borrowed typed array.
pub trait ArrayOpMut {
    /// Result of the operation.
    type Output;
    /// Monomorphized body.
    fn apply<T: ArrayElement>(self, array: &mut DataArray<T>) -> Self::Output;
}

/// Generic operation over an element type alone (e.g. array construction).
pub trait TypeOp {
    /// Result of the operation.
    type Output;
    /// Monomorphized body.
    fn apply<T: ArrayElement>(self) -> Self::Output;
}

/// Type-erased array storage, tagged by element type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum TaggedArray {
    Int8(DataArray<i8>),
    Int16(DataArray<i16>),
    Int32(DataArray<i32>),
    Int64(DataArray<i64>),
    UInt8(DataArray<u8>),
    UInt16(DataArray<u16>),
    UInt32(DataArray<u32>),
    UInt64(DataArray<u64>),
    Float32(DataArray<f32>),
    Float64(DataArray<f64>),
    Boolean(DataArray<bool>),
}

macro_rules! for_each_variant {
    ($value:expr, $array:ident => $body:expr) => {
        match $value {
            TaggedArray::Int8($array) => $body,
            TaggedArray::Int16($array) => $body,
            TaggedArray::Int32($array) => $body,
            TaggedArray::Int64($array) => $body,
            TaggedArray::UInt8($array) => $body,
            TaggedArray::UInt16($array) => $body,
            TaggedArray::UInt32($array) => $body,
            TaggedArray::UInt64($array) => $body,
            TaggedArray::Float32($array) => $body,
            TaggedArray::Float64($array) => $body,
            TaggedArray::Boolean($array) => $body,
        }
    };
}

impl TaggedArray {
    /// Construct a default-filled tagged array for a runtime tag.
    pub fn new(
        data_type: DataType,
        tuple_shape: Vec<usize>,
        component_shape: Vec<usize>,
    ) -> Self {
        struct Make {
            tuple_shape: Vec<usize>,
            component_shape: Vec<usize>,
        }
        impl TypeOp for Make {
            type Output = TaggedArray;
            fn apply<T: ArrayElement>(self) -> TaggedArray {
                T::wrap(DataArray::new(self.tuple_shape, self.component_shape))
            }
        }
        data_type.dispatch(Make {
            tuple_shape,
            component_shape,
        })
    }

    /// The element-type tag.
    pub fn data_type(&self) -> DataType {
        fn tag_of<T: ArrayElement>(_: &DataArray<T>) -> DataType {
            T::DATA_TYPE
        }
        for_each_variant!(self, a => tag_of(a))
    }

    /// Ordered tuple dimensions.
    pub fn tuple_shape(&self) -> &[usize] {
        for_each_variant!(self, a => a.tuple_shape())
    }

    /// Ordered component dimensions.
    pub fn component_shape(&self) -> &[usize] {
        for_each_variant!(self, a => a.component_shape())
    }

    /// Number of tuples.
    pub fn tuple_count(&self) -> usize {
        for_each_variant!(self, a => a.tuple_count())
    }

    /// Elements per tuple.
    pub fn component_count(&self) -> usize {
        for_each_variant!(self, a => a.component_count())
    }

    /// Total element count.
    pub fn len(&self) -> usize {
        for_each_variant!(self, a => a.len())
    }

    /// True if the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reshape tuple dimensions, truncating or zero-extending.
    pub fn resize_tuples(&mut self, new_tuple_shape: Vec<usize>) {
        for_each_variant!(self, a => a.resize_tuples(new_tuple_shape))
    }

    /// Invoke `op` on the concrete typed array behind this tag.
    pub fn dispatch<O: ArrayOp>(&self, op: O) -> O::Output {
        for_each_variant!(self, a => op.apply(a))
    }

    /// Invoke `op` on the concrete typed array, mutably.
    pub fn dispatch_mut<O: ArrayOpMut>(&mut self, op: O) -> O::Output {
        for_each_variant!(self, a => op.apply(a))
    }

    /// Borrow the typed array if `T` matches the tag.
    pub fn downcast<T: ArrayElement>(&self) -> Option<&DataArray<T>> {
        T::unwrap(self)
    }

    /// Mutably borrow the typed array if `T` matches the tag.
    pub fn downcast_mut<T: ArrayElement>(&mut self) -> Option<&mut DataArray<T>> {
        T::unwrap_mut(self)
    }
}

macro_rules! impl_array_element {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl ArrayElement for $ty {
                const DATA_TYPE: DataType = DataType::$variant;

                fn wrap(array: DataArray<Self>) -> TaggedArray {
                    TaggedArray::$variant(array)
                }

                fn unwrap(tagged: &TaggedArray) -> Option<&DataArray<Self>> {
                    if let TaggedArray::$variant(array) = tagged {
                        Some(array)
                    } else {
                        None
                    }
                }

                fn unwrap_mut(tagged: &mut TaggedArray) -> Option<&mut DataArray<Self>> {
                    if let TaggedArray::$variant(array) = tagged {
                        Some(array)
                    } else {
                        None
                    }
                }

                fn from_f64(value: f64) -> Self {
                    num_traits::cast::<f64, $ty>(value).unwrap_or_default()
                }

                fn to_f64(&self) -> f64 {
                    num_traits::cast::<$ty, f64>(*self).unwrap_or_default()
                }
            }
        )+
    };
}

impl_array_element! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
}

impl ArrayElement for bool {
    const DATA_TYPE: DataType = DataType::Boolean;

    fn wrap(array: DataArray<Self>) -> TaggedArray {
        TaggedArray::Boolean(array)
    }

    fn unwrap(tagged: &TaggedArray) -> Option<&DataArray<Self>> {
        if let TaggedArray::Boolean(array) = tagged {
            Some(array)
        } else {
            None
        }
    }

    fn unwrap_mut(tagged: &mut TaggedArray) -> Option<&mut DataArray<Self>> {
        if let TaggedArray::Boolean(array) = tagged {
            Some(array)
        } else {
            None
        }
    }

    fn from_f64(value: f64) -> Self {
        value != 0.0
    }

    fn to_f64(&self) -> f64 {
        if *self { 1.0 } else { 0.0 }
    }
}
