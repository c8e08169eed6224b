//! DataMillError: unified error type for data-mill public APIs.
//!
//! Every expected failure mode of the store, geometry, action, filter and
//! pipeline layers is reported through this enum; the core never panics for
//! a missing path, a shape mismatch, or a cancellation. Each variant carries
//! a stable signed code (see [`DataMillError::code`]) that the message
//! channel and external tools key on.

use thiserror::Error;

use crate::store::path::DataPath;
use crate::store::tagged::DataType;

/// Unified error type for data-mill operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataMillError {
    /// A `DataPath` must contain at least one segment.
    #[error("data path must contain at least one segment")]
    EmptyPath,
    /// Path segments must be non-empty.
    #[error("data path segment must not be empty")]
    EmptyPathSegment,
    /// Path segments must not embed the separator.
    #[error("data path segment `{0}` contains the reserved separator `/`")]
    InvalidPathSegment(String),
    /// `parent()` called on a single-segment path.
    #[error("data path `{0}` has no parent")]
    NoParent(DataPath),

    /// No object exists at the given path.
    #[error("no object found at `{0}`")]
    NotFound(DataPath),
    /// The parent path of an insertion target does not exist.
    #[error("parent path `{0}` not found")]
    ParentNotFound(DataPath),
    /// A sibling with the same name already exists.
    #[error("an object named `{name}` already exists under `{parent}`")]
    DuplicateName { parent: DataPath, name: String },
    /// The object at the path is not of the requested kind.
    #[error("object at `{path}` is a {found}, expected {expected}")]
    WrongType {
        path: DataPath,
        expected: &'static str,
        found: &'static str,
    },
    /// An array's tuple shape disagrees with its attribute matrix.
    #[error(
        "tuple shape {found:?} does not match attribute matrix `{matrix}` shape {expected:?}"
    )]
    ShapeMismatch {
        matrix: DataPath,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    /// Attempted to insert a child into a non-container object.
    #[error("object at `{0}` cannot hold children")]
    NotAContainer(DataPath),
    /// A removal would sever a live geometry link.
    #[error("geometry `{geometry}` still links data at `{linked}`; remove with force to sever")]
    GeometryLinkInUse { geometry: DataPath, linked: DataPath },

    /// Flat element access past the end of an array buffer.
    #[error("index {index} out of range for array of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    /// A type tag outside the supported element-type set.
    #[error("unsupported element type `{0}`")]
    UnsupportedType(String),
    /// Two co-indexed arrays disagree on tuple count.
    #[error(
        "tuple count mismatch: `{left}` has {left_count} tuples but `{right}` has {right_count}"
    )]
    TupleCountMismatch {
        left: DataPath,
        left_count: usize,
        right: DataPath,
        right_count: usize,
    },

    /// The geometry has no element count yet.
    #[error("geometry `{0}` has no element count yet")]
    UnsizedGeometry(DataPath),
    /// One-way sizing transition attempted twice.
    #[error("geometry `{0}` is already sized; use resize instead")]
    AlreadySized(DataPath),
    /// A linked array is shared with a geometry of a different size.
    #[error(
        "cannot resize `{array}` to {requested} tuples: geometry `{other}` links it at {other_count} elements"
    )]
    SharedResizeConflict {
        array: DataPath,
        requested: usize,
        other: DataPath,
        other_count: usize,
    },

    /// A filter argument was not supplied.
    #[error("missing argument `{0}`")]
    MissingArgument(String),
    /// A filter argument holds a value of the wrong kind.
    #[error("argument `{key}` holds a {found}, expected {expected}")]
    ArgumentTypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    /// An argument selected an element type outside an allowed subset.
    #[error("element type {0:?} is not allowed here")]
    DisallowedType(DataType),

    /// A pipeline document referenced a filter the registry does not know.
    #[error("no filter named `{0}` is registered")]
    UnknownFilter(String),
    /// Cooperative cancellation was observed.
    #[error("execution cancelled")]
    Cancelled,
}

impl DataMillError {
    /// Stable signed code for this failure site.
    ///
    /// Codes are part of the public vocabulary: tests and external tools
    /// match on them, so they never change once published.
    pub fn code(&self) -> i32 {
        match self {
            DataMillError::EmptyPath => -100,
            DataMillError::EmptyPathSegment => -101,
            DataMillError::InvalidPathSegment(_) => -102,
            DataMillError::NoParent(_) => -103,
            DataMillError::NotFound(_) => -110,
            DataMillError::ParentNotFound(_) => -111,
            DataMillError::DuplicateName { .. } => -112,
            DataMillError::WrongType { .. } => -113,
            DataMillError::ShapeMismatch { .. } => -114,
            DataMillError::NotAContainer(_) => -115,
            DataMillError::GeometryLinkInUse { .. } => -116,
            DataMillError::IndexOutOfRange { .. } => -120,
            DataMillError::UnsupportedType(_) => -121,
            DataMillError::TupleCountMismatch { .. } => -122,
            DataMillError::UnsizedGeometry(_) => -130,
            DataMillError::AlreadySized(_) => -131,
            DataMillError::SharedResizeConflict { .. } => -132,
            DataMillError::MissingArgument(_) => -140,
            DataMillError::ArgumentTypeMismatch { .. } => -141,
            DataMillError::DisallowedType(_) => -142,
            DataMillError::UnknownFilter(_) => -150,
            DataMillError::Cancelled => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::path::DataPath;

    #[test]
    fn codes_are_stable() {
        let p = DataPath::parse("A/B").unwrap();
        assert_eq!(DataMillError::EmptyPath.code(), -100);
        assert_eq!(DataMillError::NoParent(p.clone()).code(), -103);
        assert_eq!(DataMillError::NotFound(p.clone()).code(), -110);
        assert_eq!(
            DataMillError::DuplicateName {
                parent: p.clone(),
                name: "x".into()
            }
            .code(),
            -112
        );
        assert_eq!(
            DataMillError::IndexOutOfRange { index: 4, len: 4 }.code(),
            -120
        );
        assert_eq!(DataMillError::UnsupportedType("i128".into()).code(), -121);
        assert_eq!(DataMillError::Cancelled.code(), -1);
    }

    #[test]
    fn codes_are_unique() {
        use std::collections::HashSet;
        let p = DataPath::parse("A").unwrap();
        let samples = vec![
            DataMillError::EmptyPath,
            DataMillError::EmptyPathSegment,
            DataMillError::InvalidPathSegment("a/b".into()),
            DataMillError::NoParent(p.clone()),
            DataMillError::NotFound(p.clone()),
            DataMillError::ParentNotFound(p.clone()),
            DataMillError::DuplicateName {
                parent: p.clone(),
                name: "x".into(),
            },
            DataMillError::WrongType {
                path: p.clone(),
                expected: "array",
                found: "group",
            },
            DataMillError::ShapeMismatch {
                matrix: p.clone(),
                expected: vec![10],
                found: vec![9],
            },
            DataMillError::NotAContainer(p.clone()),
            DataMillError::GeometryLinkInUse {
                geometry: p.clone(),
                linked: p.clone(),
            },
            DataMillError::IndexOutOfRange { index: 0, len: 0 },
            DataMillError::UnsupportedType("?".into()),
            DataMillError::TupleCountMismatch {
                left: p.clone(),
                left_count: 1,
                right: p.clone(),
                right_count: 2,
            },
            DataMillError::UnsizedGeometry(p.clone()),
            DataMillError::AlreadySized(p.clone()),
            DataMillError::SharedResizeConflict {
                array: p.clone(),
                requested: 1,
                other: p.clone(),
                other_count: 2,
            },
            DataMillError::MissingArgument("k".into()),
            DataMillError::ArgumentTypeMismatch {
                key: "k".into(),
                expected: "path",
                found: "bool",
            },
            DataMillError::DisallowedType(crate::store::tagged::DataType::Boolean),
            DataMillError::UnknownFilter("f".into()),
            DataMillError::Cancelled,
        ];
        let codes: HashSet<i32> = samples.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), samples.len());
    }
}
