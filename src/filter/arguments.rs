//! `Arguments`: the immutable, dynamically-typed parameter map a filter
//! receives alongside the store.
//!
//! The core validates only the *kind* of each value; semantic validation
//! (ranges, choices) is filter-specific and reported through the result
//! channel, not here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::mill_error::DataMillError;
use crate::store::path::DataPath;
use crate::store::tagged::DataType;

/// A dynamically-typed argument value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ArgumentValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int64(i64),
    /// Floating-point scalar.
    Float64(f64),
    /// Free text.
    Text(String),
    /// A single store path.
    Path(DataPath),
    /// An ordered path selection (e.g. co-indexed array sets).
    Paths(Vec<DataPath>),
    /// An ordered tuple shape.
    TupleShape(Vec<usize>),
    /// An element-type tag.
    Type(DataType),
}

impl ArgumentValue {
    /// Short kind label used in mismatch diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ArgumentValue::Bool(_) => "bool",
            ArgumentValue::Int64(_) => "int64",
            ArgumentValue::Float64(_) => "float64",
            ArgumentValue::Text(_) => "text",
            ArgumentValue::Path(_) => "path",
            ArgumentValue::Paths(_) => "paths",
            ArgumentValue::TupleShape(_) => "tuple shape",
            ArgumentValue::Type(_) => "type",
        }
    }
}

/// String-keyed argument map handed to `preflight` and `execute`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Arguments {
    values: BTreeMap<String, ArgumentValue>,
}

macro_rules! typed_getter {
    ($(#[$doc:meta])* $fn_name:ident, $variant:ident, $out:ty, |$v:ident| $extract:expr) => {
        $(#[$doc])*
        pub fn $fn_name(&self, key: &str) -> Result<$out, DataMillError> {
            match self.get(key)? {
                ArgumentValue::$variant($v) => Ok($extract),
                other => Err(DataMillError::ArgumentTypeMismatch {
                    key: key.to_owned(),
                    expected: stringify!($fn_name),
                    found: other.kind(),
                }),
            }
        }
    };
}

impl Arguments {
    /// An empty argument map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, key: impl Into<String>, value: ArgumentValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, key: impl Into<String>, value: ArgumentValue) {
        self.values.insert(key.into(), value);
    }

    /// Look up a value, failing `MissingArgument` if absent.
    pub fn get(&self, key: &str) -> Result<&ArgumentValue, DataMillError> {
        self.values
            .get(key)
            .ok_or_else(|| DataMillError::MissingArgument(key.to_owned()))
    }

    /// True if `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ArgumentValue)> {
        self.values.iter()
    }

    typed_getter!(
        /// The boolean at `key`.
        bool, Bool, bool, |v| *v
    );
    typed_getter!(
        /// The integer at `key`.
        int, Int64, i64, |v| *v
    );
    typed_getter!(
        /// The float at `key`.
        float, Float64, f64, |v| *v
    );
    typed_getter!(
        /// The text at `key`.
        text, Text, &str, |v| v.as_str()
    );
    typed_getter!(
        /// The path at `key`.
        path, Path, &DataPath, |v| v
    );
    typed_getter!(
        /// The path selection at `key`.
        paths, Paths, &[DataPath], |v| v.as_slice()
    );
    typed_getter!(
        /// The tuple shape at `key`.
        tuple_shape, TupleShape, &[usize], |v| v.as_slice()
    );
    typed_getter!(
        /// The element-type tag at `key`.
        data_type, Type, DataType, |v| *v
    );
}
