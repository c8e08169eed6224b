//! Geometry descriptors: grids and meshes with linked per-element data.
//!
//! A geometry defines an element count (cells, points, faces) against which
//! the tuple counts of linked arrays are validated. Geometries never own the
//! vertex or connectivity buffers they describe; they hold weak
//! [`ObjectId`](crate::store::object::ObjectId) references into the arena,
//! so a vertex list may be shared by several geometries.
//!
//! Each instance moves through a one-directional sizing state machine:
//! `Unsized` (created, no element count yet) to `Sized` (dimensions set or
//! vertex/connectivity lists attached). Re-sizing a `Sized` geometry is a
//! distinct store-level operation that also resizes every linked array; see
//! [`DataStructure::resize_geometry`](crate::store::structure::DataStructure::resize_geometry).

use serde::{Deserialize, Serialize};

use crate::store::object::ObjectId;

/// The supported geometry kinds.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    /// Regular axis-aligned voxel grid.
    Image,
    /// Rectilinear grid with per-axis bound arrays.
    RectGrid,
    /// 0D point cloud; elements are the vertices themselves.
    Vertex,
    /// 1D segments.
    Edge,
    /// 2D simplices.
    Triangle,
    /// 2D tensor-product faces.
    Quad,
    /// 3D simplices.
    Tetrahedral,
    /// 3D tensor-product cells.
    Hexahedral,
}

impl GeometryKind {
    /// Nodes per element for node-based kinds; `None` for grid kinds.
    pub fn nodes_per_element(self) -> Option<usize> {
        match self {
            GeometryKind::Image | GeometryKind::RectGrid => None,
            GeometryKind::Vertex => Some(1),
            GeometryKind::Edge => Some(2),
            GeometryKind::Triangle => Some(3),
            GeometryKind::Quad => Some(4),
            GeometryKind::Tetrahedral => Some(4),
            GeometryKind::Hexahedral => Some(8),
        }
    }

    /// True for kinds sized by vertex/connectivity lists rather than
    /// grid dimensions.
    pub fn is_node_based(self) -> bool {
        self.nodes_per_element().is_some()
    }
}

/// Sizing state: what fixes this geometry's element count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GeometryShape {
    /// Created, no element count yet.
    Unsized,
    /// Voxel grid sized by its cell dimensions.
    Image {
        /// Cell counts along x, y, z.
        dims: [usize; 3],
        /// Physical cell spacing.
        spacing: [f64; 3],
        /// Physical origin of the grid.
        origin: [f64; 3],
    },
    /// Rectilinear grid sized by its per-axis bound arrays.
    RectGrid {
        /// Bound arrays along x, y, z; each holds axis positions, so the
        /// cell count per axis is one less than the tuple count.
        bounds: [ObjectId; 3],
    },
    /// Mesh sized by a shared vertex list and, for 1D+ kinds, a
    /// connectivity array.
    NodeBased {
        /// Shared vertex list (may be referenced by other geometries).
        vertices: ObjectId,
        /// Element connectivity; `None` for vertex geometries.
        connectivity: Option<ObjectId>,
    },
}

/// A geometry node's payload: kind, sizing state, and linked data ids.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeometryObject {
    kind: GeometryKind,
    shape: GeometryShape,
    /// Arrays whose tuple count must equal the element count.
    cell_data: Vec<ObjectId>,
    /// Arrays whose tuple count must equal the vertex count.
    point_data: Vec<ObjectId>,
}

impl GeometryObject {
    /// A new, unsized geometry of the given kind.
    pub fn new(kind: GeometryKind) -> Self {
        Self {
            kind,
            shape: GeometryShape::Unsized,
            cell_data: Vec::new(),
            point_data: Vec::new(),
        }
    }

    /// The geometry kind.
    #[inline]
    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    /// Current sizing state.
    #[inline]
    pub fn shape(&self) -> &GeometryShape {
        &self.shape
    }

    /// True once the element count is fixed.
    #[inline]
    pub fn is_sized(&self) -> bool {
        !matches!(self.shape, GeometryShape::Unsized)
    }

    /// For image geometries, the cell count implied by the dimensions.
    pub fn image_cell_count(&self) -> Option<usize> {
        match &self.shape {
            GeometryShape::Image { dims, .. } => Some(dims.iter().product()),
            _ => None,
        }
    }

    /// Ids of arrays linked as per-cell data.
    #[inline]
    pub fn cell_data(&self) -> &[ObjectId] {
        &self.cell_data
    }

    /// Ids of arrays linked as per-point data.
    #[inline]
    pub fn point_data(&self) -> &[ObjectId] {
        &self.point_data
    }

    /// Every id this geometry references structurally (vertex lists,
    /// connectivity, bounds), excluding linked data.
    pub fn structural_ids(&self) -> Vec<ObjectId> {
        match &self.shape {
            GeometryShape::Unsized | GeometryShape::Image { .. } => Vec::new(),
            GeometryShape::RectGrid { bounds } => bounds.to_vec(),
            GeometryShape::NodeBased {
                vertices,
                connectivity,
            } => {
                let mut ids = vec![*vertices];
                ids.extend(connectivity.iter().copied());
                ids
            }
        }
    }

    /// Every linked-data id (cell and point associations).
    pub fn linked_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.cell_data.iter().chain(self.point_data.iter()).copied()
    }

    pub(crate) fn set_shape(&mut self, shape: GeometryShape) {
        self.shape = shape;
    }

    pub(crate) fn push_cell_data(&mut self, id: ObjectId) {
        if !self.cell_data.contains(&id) {
            self.cell_data.push(id);
        }
    }

    pub(crate) fn push_point_data(&mut self, id: ObjectId) {
        if !self.point_data.contains(&id) {
            self.point_data.push(id);
        }
    }

    pub(crate) fn sever_link(&mut self, id: ObjectId) {
        self.cell_data.retain(|&linked| linked != id);
        self.point_data.retain(|&linked| linked != id);
    }
}

/// Serializable construction parameters for a geometry, as carried by a
/// `CreateGeometry` action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GeometryConfig {
    /// An image geometry sized at creation.
    Image {
        /// Cell counts along x, y, z.
        dims: [usize; 3],
        /// Physical cell spacing.
        spacing: [f64; 3],
        /// Physical origin.
        origin: [f64; 3],
    },
    /// Any other kind, created unsized and attached later.
    Unsized {
        /// The geometry kind to create.
        kind: GeometryKind,
    },
}

impl GeometryConfig {
    /// The kind this configuration produces.
    pub fn kind(&self) -> GeometryKind {
        match self {
            GeometryConfig::Image { .. } => GeometryKind::Image,
            GeometryConfig::Unsized { kind } => *kind,
        }
    }

    /// Build the geometry payload this configuration describes.
    pub fn build(&self) -> GeometryObject {
        match self {
            GeometryConfig::Image {
                dims,
                spacing,
                origin,
            } => {
                let mut geom = GeometryObject::new(GeometryKind::Image);
                geom.set_shape(GeometryShape::Image {
                    dims: *dims,
                    spacing: *spacing,
                    origin: *origin,
                });
                geom
            }
            GeometryConfig::Unsized { kind } => GeometryObject::new(*kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_per_element() {
        assert_eq!(GeometryKind::Image.nodes_per_element(), None);
        assert_eq!(GeometryKind::Vertex.nodes_per_element(), Some(1));
        assert_eq!(GeometryKind::Edge.nodes_per_element(), Some(2));
        assert_eq!(GeometryKind::Triangle.nodes_per_element(), Some(3));
        assert_eq!(GeometryKind::Quad.nodes_per_element(), Some(4));
        assert_eq!(GeometryKind::Tetrahedral.nodes_per_element(), Some(4));
        assert_eq!(GeometryKind::Hexahedral.nodes_per_element(), Some(8));
    }

    #[test]
    fn image_config_is_sized_at_creation() {
        let config = GeometryConfig::Image {
            dims: [10, 10, 10],
            spacing: [1.0; 3],
            origin: [0.0; 3],
        };
        let geom = config.build();
        assert!(geom.is_sized());
        assert_eq!(geom.image_cell_count(), Some(1000));
    }

    #[test]
    fn unsized_config_starts_unsized() {
        let geom = GeometryConfig::Unsized {
            kind: GeometryKind::Triangle,
        }
        .build();
        assert!(!geom.is_sized());
        assert_eq!(geom.image_cell_count(), None);
        assert!(geom.structural_ids().is_empty());
    }

    #[test]
    fn links_deduplicate_and_sever() {
        let mut geom = GeometryConfig::Image {
            dims: [2, 2, 2],
            spacing: [1.0; 3],
            origin: [0.0; 3],
        }
        .build();
        let id = ObjectId::new(5).unwrap();
        geom.push_cell_data(id);
        geom.push_cell_data(id);
        assert_eq!(geom.cell_data(), &[id]);
        geom.sever_link(id);
        assert!(geom.cell_data().is_empty());
    }
}
