//! `DataPath`: a strong, validated address for objects in the store.
//!
//! A `DataPath` is an immutable ordered sequence of names identifying a node
//! in a [`DataStructure`](crate::store::structure::DataStructure). It is a
//! pure value type: copied freely, compared segment-wise, and never held as
//! the sole reference to a node — the store is the source of truth.
//!
//! Segments must be non-empty and must not embed the `/` separator, which is
//! reserved for the textual rendering.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::mill_error::DataMillError;

/// Ordered name sequence identifying a node in the store.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct DataPath {
    segments: Vec<String>,
}

impl DataPath {
    /// Build a path from owned segments, validating each one.
    ///
    /// # Errors
    /// - `EmptyPath` if `segments` is empty,
    /// - `EmptyPathSegment` if any segment is empty,
    /// - `InvalidPathSegment` if any segment contains `/`.
    pub fn new(segments: Vec<String>) -> Result<Self, DataMillError> {
        if segments.is_empty() {
            return Err(DataMillError::EmptyPath);
        }
        for seg in &segments {
            validate_segment(seg)?;
        }
        Ok(Self { segments })
    }

    /// Build a single-segment path.
    pub fn single(name: impl Into<String>) -> Result<Self, DataMillError> {
        Self::new(vec![name.into()])
    }

    /// Parse a `/`-separated rendering, e.g. `"DataContainer/CellData/Ids"`.
    ///
    /// A leading `/` is tolerated so `DataPath::parse("/A/B")` and
    /// `DataPath::parse("A/B")` name the same node.
    pub fn parse(text: &str) -> Result<Self, DataMillError> {
        let trimmed = text.strip_prefix('/').unwrap_or(text);
        if trimmed.is_empty() {
            return Err(DataMillError::EmptyPath);
        }
        let segments: Vec<String> = trimmed.split('/').map(str::to_owned).collect();
        if segments.iter().any(String::is_empty) {
            return Err(DataMillError::EmptyPathSegment);
        }
        Ok(Self { segments })
    }

    /// The validated segments, in order.
    #[inline]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Paths always hold at least one segment.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The final segment: the target object's name.
    #[inline]
    pub fn name(&self) -> &str {
        self.segments.last().expect("DataPath is never empty")
    }

    /// The path with the final segment removed.
    ///
    /// # Errors
    /// Returns `NoParent` if this path has a single segment.
    pub fn parent(&self) -> Result<DataPath, DataMillError> {
        if self.segments.len() == 1 {
            return Err(DataMillError::NoParent(self.clone()));
        }
        Ok(DataPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// A new path extending this one by `name`.
    pub fn child(&self, name: impl Into<String>) -> Result<DataPath, DataMillError> {
        let name = name.into();
        validate_segment(&name)?;
        let mut segments = self.segments.clone();
        segments.push(name);
        Ok(DataPath { segments })
    }

    /// A new path with the final segment replaced by `name`.
    pub fn with_name(&self, name: impl Into<String>) -> Result<DataPath, DataMillError> {
        let name = name.into();
        validate_segment(&name)?;
        let mut segments = self.segments.clone();
        *segments.last_mut().expect("DataPath is never empty") = name;
        Ok(DataPath { segments })
    }

    /// True if `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &DataPath) -> bool {
        other.segments.len() > self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }
}

fn validate_segment(seg: &str) -> Result<(), DataMillError> {
    if seg.is_empty() {
        return Err(DataMillError::EmptyPathSegment);
    }
    if seg.contains('/') {
        return Err(DataMillError::InvalidPathSegment(seg.to_owned()));
    }
    Ok(())
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.iter().join("/"))
    }
}

impl fmt::Debug for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataPath({self})")
    }
}

impl FromStr for DataPath {
    type Err = DataMillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<Vec<String>> for DataPath {
    type Error = DataMillError;

    fn try_from(segments: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(segments)
    }
}

impl From<DataPath> for Vec<String> {
    fn from(path: DataPath) -> Self {
        path.segments
    }
}
