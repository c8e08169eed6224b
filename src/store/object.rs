//! `ObjectId` and `DataObject`: arena handles and graph nodes.
//!
//! Every node in the store is owned by the
//! [`DataStructure`](crate::store::structure::DataStructure) arena and
//! addressed by a stable `ObjectId`. Paths resolve to ids through the name
//! walk; nothing outside the arena holds a direct reference. A node may be
//! held by more than one parent (shared ownership); it stays alive as long
//! as at least one holder remains, and its first parent edge defines the
//! primary path.

use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::geometry::GeometryObject;
use crate::store::tagged::TaggedArray;

/// Stable arena handle for a store node.
///
/// Wraps a nonzero `u64` so 0 stays reserved as an invalid sentinel; the
/// `repr(transparent)` layout matches a plain `u64`.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct ObjectId(NonZeroU64);

impl ObjectId {
    /// Wrap a raw id. Returns `None` for the reserved value 0.
    #[inline]
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(ObjectId)
    }

    /// The raw id value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectId").field(&self.get()).finish()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// The capability a node carries: container, shaped container, typed array,
/// or geometry descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ObjectPayload {
    /// Plain container of arbitrary children.
    Group,
    /// Container fixing a tuple shape every child array must match.
    AttributeMatrix {
        /// Ordered tuple dimensions shared by all child arrays.
        tuple_shape: Vec<usize>,
    },
    /// Typed, tuple-shaped buffer.
    Array(TaggedArray),
    /// Mesh/grid descriptor validating linked-array element counts.
    Geometry(GeometryObject),
}

impl ObjectPayload {
    /// Short kind label used in `WrongType` diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ObjectPayload::Group => "group",
            ObjectPayload::AttributeMatrix { .. } => "attribute matrix",
            ObjectPayload::Array(_) => "array",
            ObjectPayload::Geometry(_) => "geometry",
        }
    }

    /// True for payloads that may hold children.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ObjectPayload::Group
                | ObjectPayload::AttributeMatrix { .. }
                | ObjectPayload::Geometry(_)
        )
    }
}

/// A node of the object graph: name, parent/child edges, payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataObject {
    pub(crate) name: String,
    /// Holders, in attach order; the first is the primary parent. Empty for
    /// top-level objects.
    pub(crate) parents: Vec<ObjectId>,
    /// Children in insertion order; names are unique among siblings.
    pub(crate) children: Vec<ObjectId>,
    pub(crate) payload: ObjectPayload,
}

impl DataObject {
    pub(crate) fn new(name: String, payload: ObjectPayload) -> Self {
        Self {
            name,
            parents: Vec::new(),
            children: Vec::new(),
            payload,
        }
    }

    /// The node's name, unique among its siblings.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Holder ids in attach order.
    #[inline]
    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    /// Child ids in insertion order.
    #[inline]
    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    /// The node's payload.
    #[inline]
    pub fn payload(&self) -> &ObjectPayload {
        &self.payload
    }
}

#[cfg(test)]
mod layout_tests {
    //! Compile-time assertion that `ObjectId` has the same layout as `u64`.
    use super::*;
    use static_assertions::{assert_eq_align, assert_eq_size};

    assert_eq_size!(ObjectId, u64);
    assert_eq_size!(Option<ObjectId>, u64);

    #[test]
    fn alignment_matches_u64() {
        assert_eq_align!(ObjectId, u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_id_is_rejected() {
        assert!(ObjectId::new(0).is_none());
        assert_eq!(ObjectId::new(7).unwrap().get(), 7);
    }

    #[test]
    fn debug_and_display() {
        let id = ObjectId::new(3).unwrap();
        assert_eq!(format!("{id:?}"), "ObjectId(3)");
        assert_eq!(format!("{id}"), "3");
    }

    #[test]
    fn payload_kinds() {
        assert_eq!(ObjectPayload::Group.kind(), "group");
        assert!(ObjectPayload::Group.is_container());
        let arr = ObjectPayload::Array(crate::store::tagged::TaggedArray::new(
            crate::store::tagged::DataType::Int32,
            vec![1],
            vec![1],
        ));
        assert_eq!(arr.kind(), "array");
        assert!(!arr.is_container());
    }
}
