//! `DataStructure`: the invariant-enforcing owner of the object graph.
//!
//! The structure is an arena of [`DataObject`]s indexed by stable
//! [`ObjectId`]s. A [`DataPath`] resolves to an id through the name walk;
//! nothing holds direct pointers. Shared ownership is modelled as multiple
//! parent edges: an object stays alive while at least one holder remains,
//! and geometries reference vertex/connectivity/linked arrays by id (weak:
//! relation plus lookup, never ownership).
//!
//! Invariants enforced at every mutation:
//! - sibling names are unique, so no two paths resolve ambiguously;
//! - every array inside an attribute matrix matches the matrix tuple shape;
//! - removals either leave no dangling geometry reference or fail (unless
//!   forced, in which case severed links are reported as warnings).
//!
//! Mutating operations log nothing by themselves; callers (the pipeline,
//! filter execute bodies) are responsible for messaging.

use hashbrown::HashMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::debug_invariants::DebugInvariants;
use crate::geometry::{GeometryKind, GeometryObject, GeometryShape};
use crate::mill_error::DataMillError;
use crate::result::WarningMessage;
use crate::store::array::DataArray;
use crate::store::object::{DataObject, ObjectId, ObjectPayload};
use crate::store::path::DataPath;
use crate::store::tagged::{ArrayElement, TaggedArray};

/// Hierarchical, path-addressed, typed in-memory data store.
///
/// Created once per pipeline run and mutated only by action application
/// between preflight and execute, or by filter execute bodies writing into
/// typed arrays. Deep equality (`PartialEq`) compares the whole graph and
/// backs the atomicity and preflight-purity guarantees in the test suite.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataStructure {
    objects: HashMap<ObjectId, DataObject>,
    /// Top-level objects in insertion order.
    top_level: Vec<ObjectId>,
    next_id: u64,
}

impl Default for DataStructure {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStructure {
    /// An empty store.
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            top_level: Vec::new(),
            next_id: 1,
        }
    }

    fn make_id(&mut self) -> ObjectId {
        let id = ObjectId::new(self.next_id).expect("id counter starts at 1");
        self.next_id += 1;
        id
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True if the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Borrow a node by id.
    pub fn object(&self, id: ObjectId) -> Option<&DataObject> {
        self.objects.get(&id)
    }

    /// Ids of the top-level objects, in insertion order.
    pub fn top_level(&self) -> &[ObjectId] {
        &self.top_level
    }

    // ---------------------------------------------------------------------
    // Path resolution
    // ---------------------------------------------------------------------

    fn child_by_name(&self, parent: ObjectId, name: &str) -> Option<ObjectId> {
        let node = self.objects.get(&parent)?;
        node.children
            .iter()
            .copied()
            .find(|id| self.objects.get(id).is_some_and(|c| c.name == name))
    }

    fn top_by_name(&self, name: &str) -> Option<ObjectId> {
        self.top_level
            .iter()
            .copied()
            .find(|id| self.objects.get(id).is_some_and(|c| c.name == name))
    }

    /// Resolve a path to its arena id.
    ///
    /// # Errors
    /// `NotFound` carrying the unresolved path.
    pub fn resolve(&self, path: &DataPath) -> Result<ObjectId, DataMillError> {
        let mut segments = path.segments().iter();
        let first = segments.next().expect("DataPath is never empty");
        let mut current = self
            .top_by_name(first)
            .ok_or_else(|| DataMillError::NotFound(path.clone()))?;
        for segment in segments {
            current = self
                .child_by_name(current, segment)
                .ok_or_else(|| DataMillError::NotFound(path.clone()))?;
        }
        Ok(current)
    }

    /// True if an object exists at `path`.
    pub fn contains(&self, path: &DataPath) -> bool {
        self.resolve(path).is_ok()
    }

    /// The primary path of a live object (first-parent chain).
    pub fn path_of(&self, id: ObjectId) -> Result<DataPath, DataMillError> {
        let mut segments = Vec::new();
        let mut current = id;
        loop {
            let node = self.objects.get(&current).ok_or(DataMillError::NotFound(
                DataPath::single(format!("#{current}")).expect("id renders as a segment"),
            ))?;
            segments.push(node.name.clone());
            match node.parents.first() {
                Some(&parent) => current = parent,
                None => break,
            }
        }
        segments.reverse();
        DataPath::new(segments)
    }

    // ---------------------------------------------------------------------
    // Insertion and shared ownership
    // ---------------------------------------------------------------------

    fn check_child_slot(
        &self,
        parent: ObjectId,
        parent_path: &DataPath,
        name: &str,
        payload: &ObjectPayload,
    ) -> Result<(), DataMillError> {
        let parent_node = &self.objects[&parent];
        if !parent_node.payload.is_container() {
            return Err(DataMillError::NotAContainer(parent_path.clone()));
        }
        if self.child_by_name(parent, name).is_some() {
            return Err(DataMillError::DuplicateName {
                parent: parent_path.clone(),
                name: name.to_owned(),
            });
        }
        if let ObjectPayload::AttributeMatrix { tuple_shape } = &parent_node.payload {
            match payload {
                ObjectPayload::Array(array) => {
                    if array.tuple_shape() != tuple_shape.as_slice() {
                        return Err(DataMillError::ShapeMismatch {
                            matrix: parent_path.clone(),
                            expected: tuple_shape.clone(),
                            found: array.tuple_shape().to_vec(),
                        });
                    }
                }
                other => {
                    return Err(DataMillError::WrongType {
                        path: parent_path.clone(),
                        expected: "array",
                        found: other.kind(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Insert a new object under `parent` (or at the top level).
    ///
    /// # Errors
    /// `ParentNotFound` if the parent path is absent, `DuplicateName` if a
    /// sibling carries the name, `ShapeMismatch`/`WrongType` for attribute
    /// matrix children, `NotAContainer` if the parent cannot hold children.
    pub fn insert(
        &mut self,
        parent: Option<&DataPath>,
        name: impl Into<String>,
        payload: ObjectPayload,
    ) -> Result<ObjectId, DataMillError> {
        let name = name.into();
        // Reuse path-segment validation for object names.
        DataPath::single(name.clone())?;

        let parent_id = match parent {
            Some(path) => {
                let id = self
                    .resolve(path)
                    .map_err(|_| DataMillError::ParentNotFound(path.clone()))?;
                self.check_child_slot(id, path, &name, &payload)?;
                Some(id)
            }
            None => {
                if self.top_by_name(&name).is_some() {
                    return Err(DataMillError::DuplicateName {
                        parent: DataPath::single(name.as_str()).expect("validated above"),
                        name,
                    });
                }
                None
            }
        };

        let id = self.make_id();
        let mut node = DataObject::new(name, payload);
        if let Some(parent_id) = parent_id {
            node.parents.push(parent_id);
        }
        self.objects.insert(id, node);
        match parent_id {
            Some(parent_id) => self
                .objects
                .get_mut(&parent_id)
                .expect("parent checked above")
                .children
                .push(id),
            None => self.top_level.push(id),
        }
        self.debug_assert_invariants();
        Ok(id)
    }

    /// True if `target` is reachable from `from` through child edges.
    fn is_reachable(&self, from: ObjectId, target: ObjectId) -> bool {
        if from == target {
            return true;
        }
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.objects.get(&id) {
                for &child in &node.children {
                    if child == target {
                        return true;
                    }
                    stack.push(child);
                }
            }
        }
        false
    }

    /// Register an additional holder for the object at `path` (shared
    /// ownership). The object then appears under both parents and lives
    /// until the last holder drops it.
    pub fn link(&mut self, path: &DataPath, new_parent: &DataPath) -> Result<(), DataMillError> {
        let id = self.resolve(path)?;
        let parent_id = self
            .resolve(new_parent)
            .map_err(|_| DataMillError::ParentNotFound(new_parent.clone()))?;
        // A holder inside the object's own subtree would orphan the graph.
        if self.is_reachable(id, parent_id) {
            return Err(DataMillError::NotAContainer(new_parent.clone()));
        }
        let node = &self.objects[&id];
        self.check_child_slot(parent_id, new_parent, &node.name, &node.payload)?;
        self.objects.get_mut(&id).expect("resolved").parents.push(parent_id);
        self.objects
            .get_mut(&parent_id)
            .expect("resolved")
            .children
            .push(id);
        self.debug_assert_invariants();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Removal
    // ---------------------------------------------------------------------

    /// Objects that would die if the edge `parent -> id` were detached:
    /// `id` if this was its last holder, plus descendants held by nothing
    /// outside the dying set.
    fn prospective_dead(&self, id: ObjectId, detach_from: Option<ObjectId>) -> Vec<ObjectId> {
        let node = &self.objects[&id];
        let remaining = node
            .parents
            .iter()
            .filter(|&&p| Some(p) != detach_from)
            .count();
        if remaining > 0 && detach_from.is_some() {
            return Vec::new();
        }
        let mut dead = vec![id];
        let mut cursor = 0;
        while cursor < dead.len() {
            let current = dead[cursor];
            cursor += 1;
            for &child in &self.objects[&current].children {
                if dead.contains(&child) {
                    continue;
                }
                let holders_outside = self.objects[&child]
                    .parents
                    .iter()
                    .filter(|p| !dead.contains(p))
                    .count();
                if holders_outside == 0 {
                    dead.push(child);
                }
            }
        }
        dead
    }

    /// Detach and possibly destroy the object at `path`.
    ///
    /// Cascades to descendants that lose their last holder. If a live
    /// geometry elsewhere references a dying object, the call fails
    /// `GeometryLinkInUse` unless `force` is set, in which case those links
    /// are severed (an unsized shape results when a structural reference
    /// dies) and each severed reference is reported as a warning.
    pub fn remove(
        &mut self,
        path: &DataPath,
        force: bool,
    ) -> Result<Vec<WarningMessage>, DataMillError> {
        let id = self.resolve(path)?;
        // Detach the edge the caller addressed, which for a shared object
        // may be any of its holders.
        let detach_from = match path.parent() {
            Ok(parent_path) => Some(self.resolve(&parent_path)?),
            Err(_) => None,
        };
        let dead = self.prospective_dead(id, detach_from);

        let mut warnings = Vec::new();
        let mut severed: Vec<(ObjectId, ObjectId, bool)> = Vec::new();
        for (&geom_id, node) in &self.objects {
            if dead.contains(&geom_id) {
                continue;
            }
            let ObjectPayload::Geometry(geom) = &node.payload else {
                continue;
            };
            for linked in geom.linked_ids() {
                if dead.contains(&linked) {
                    severed.push((geom_id, linked, false));
                }
            }
            for structural in geom.structural_ids() {
                if dead.contains(&structural) {
                    severed.push((geom_id, structural, true));
                }
            }
        }
        if !severed.is_empty() {
            if !force {
                let (geom_id, linked, _) = severed[0];
                return Err(DataMillError::GeometryLinkInUse {
                    geometry: self.path_of(geom_id)?,
                    linked: self.path_of(linked)?,
                });
            }
            for &(geom_id, linked, structural) in &severed {
                let geom_path = self.path_of(geom_id)?;
                let linked_path = self.path_of(linked)?;
                warnings.push(WarningMessage::new(
                    DataMillError::GeometryLinkInUse {
                        geometry: geom_path.clone(),
                        linked: linked_path.clone(),
                    }
                    .code(),
                    format!(
                        "severed geometry reference: `{geom_path}` no longer {} `{linked_path}`",
                        if structural { "is sized by" } else { "links" }
                    ),
                ));
            }
        }

        // Commit: sever geometry references, detach the edge, drop the dead.
        for (geom_id, linked, structural) in severed {
            let node = self.objects.get_mut(&geom_id).expect("live geometry");
            let ObjectPayload::Geometry(geom) = &mut node.payload else {
                unreachable!("collected above");
            };
            if structural {
                geom.set_shape(GeometryShape::Unsized);
            } else {
                geom.sever_link(linked);
            }
        }
        match detach_from {
            Some(parent) => {
                self.objects
                    .get_mut(&parent)
                    .expect("edge exists")
                    .children
                    .retain(|&c| c != id);
                self.objects
                    .get_mut(&id)
                    .expect("resolved")
                    .parents
                    .retain(|&p| p != parent);
            }
            None => self.top_level.retain(|&t| t != id),
        }
        for dead_id in &dead {
            // Scrub edges between the dying object and any survivor.
            let node = &self.objects[dead_id];
            let (parents, children) = (node.parents.clone(), node.children.clone());
            for parent in parents {
                if !dead.contains(&parent) {
                    if let Some(parent_node) = self.objects.get_mut(&parent) {
                        parent_node.children.retain(|c| c != dead_id);
                    }
                }
            }
            for child in children {
                if !dead.contains(&child) {
                    if let Some(child_node) = self.objects.get_mut(&child) {
                        child_node.parents.retain(|p| p != dead_id);
                    }
                }
            }
            self.objects.remove(dead_id);
        }
        self.debug_assert_invariants();
        Ok(warnings)
    }

    // ---------------------------------------------------------------------
    // Rename and reparent
    // ---------------------------------------------------------------------

    /// Rename the object at `path`.
    ///
    /// The new name must be free under every holder of the object.
    pub fn rename(&mut self, path: &DataPath, new_name: impl Into<String>) -> Result<(), DataMillError> {
        let new_name = new_name.into();
        DataPath::single(new_name.clone())?;
        let id = self.resolve(path)?;
        let parents = self.objects[&id].parents.clone();
        if parents.is_empty() {
            if let Some(existing) = self.top_by_name(&new_name) {
                if existing != id {
                    return Err(DataMillError::DuplicateName {
                        parent: DataPath::single(new_name.as_str()).expect("validated above"),
                        name: new_name,
                    });
                }
            }
        }
        for parent in &parents {
            if let Some(existing) = self.child_by_name(*parent, &new_name) {
                if existing != id {
                    return Err(DataMillError::DuplicateName {
                        parent: self.path_of(*parent)?,
                        name: new_name,
                    });
                }
            }
        }
        self.objects.get_mut(&id).expect("resolved").name = new_name;
        self.debug_assert_invariants();
        Ok(())
    }

    /// Move the object at `path` from its primary parent to `new_parent`.
    pub fn reparent(
        &mut self,
        path: &DataPath,
        new_parent: &DataPath,
    ) -> Result<(), DataMillError> {
        let id = self.resolve(path)?;
        let target_id = self
            .resolve(new_parent)
            .map_err(|_| DataMillError::ParentNotFound(new_parent.clone()))?;
        if self.is_reachable(id, target_id) {
            return Err(DataMillError::NotAContainer(new_parent.clone()));
        }
        let node = &self.objects[&id];
        self.check_child_slot(target_id, new_parent, &node.name, &node.payload)?;

        // Detach the edge the caller addressed, not an arbitrary holder.
        let old_parent = match path.parent() {
            Ok(parent_path) => Some(self.resolve(&parent_path)?),
            Err(_) => None,
        };
        match old_parent {
            Some(parent) => {
                self.objects
                    .get_mut(&parent)
                    .expect("edge exists")
                    .children
                    .retain(|&c| c != id);
                let node = self.objects.get_mut(&id).expect("resolved");
                node.parents.retain(|&p| p != parent);
                node.parents.insert(0, target_id);
            }
            None => {
                self.top_level.retain(|&t| t != id);
                self.objects
                    .get_mut(&id)
                    .expect("resolved")
                    .parents
                    .insert(0, target_id);
            }
        }
        self.objects
            .get_mut(&target_id)
            .expect("resolved")
            .children
            .push(id);
        self.debug_assert_invariants();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Typed accessors (borrowing; never copy buffers)
    // ---------------------------------------------------------------------

    fn wrong_type(&self, path: &DataPath, expected: &'static str, id: ObjectId) -> DataMillError {
        DataMillError::WrongType {
            path: path.clone(),
            expected,
            found: self.objects[&id].payload.kind(),
        }
    }

    /// The tagged array at `path`.
    pub fn array(&self, path: &DataPath) -> Result<&TaggedArray, DataMillError> {
        let id = self.resolve(path)?;
        match &self.objects[&id].payload {
            ObjectPayload::Array(array) => Ok(array),
            _ => Err(self.wrong_type(path, "array", id)),
        }
    }

    /// The tagged array at `path`, mutable.
    pub fn array_mut(&mut self, path: &DataPath) -> Result<&mut TaggedArray, DataMillError> {
        let id = self.resolve(path)?;
        match &self.objects[&id].payload {
            ObjectPayload::Array(_) => {}
            _ => return Err(self.wrong_type(path, "array", id)),
        }
        match &mut self.objects.get_mut(&id).expect("resolved").payload {
            ObjectPayload::Array(array) => Ok(array),
            _ => unreachable!("checked above"),
        }
    }

    /// The typed array at `path`, checked against `T`.
    pub fn array_of<T: ArrayElement>(
        &self,
        path: &DataPath,
    ) -> Result<&DataArray<T>, DataMillError> {
        let tagged = self.array(path)?;
        tagged
            .downcast::<T>()
            .ok_or_else(|| DataMillError::WrongType {
                path: path.clone(),
                expected: T::DATA_TYPE.as_str(),
                found: tagged.data_type().as_str(),
            })
    }

    /// The typed array at `path`, mutable, checked against `T`.
    pub fn array_of_mut<T: ArrayElement>(
        &mut self,
        path: &DataPath,
    ) -> Result<&mut DataArray<T>, DataMillError> {
        // Tag check first so the error can borrow immutably.
        let found = self.array(path)?.data_type();
        if found != T::DATA_TYPE {
            return Err(DataMillError::WrongType {
                path: path.clone(),
                expected: T::DATA_TYPE.as_str(),
                found: found.as_str(),
            });
        }
        Ok(self
            .array_mut(path)?
            .downcast_mut::<T>()
            .expect("tag checked above"))
    }

    /// The tuple shape of the attribute matrix at `path`.
    pub fn attribute_matrix_shape(&self, path: &DataPath) -> Result<&[usize], DataMillError> {
        let id = self.resolve(path)?;
        match &self.objects[&id].payload {
            ObjectPayload::AttributeMatrix { tuple_shape } => Ok(tuple_shape),
            _ => Err(self.wrong_type(path, "attribute matrix", id)),
        }
    }

    /// The geometry at `path`.
    pub fn geometry(&self, path: &DataPath) -> Result<&GeometryObject, DataMillError> {
        let id = self.resolve(path)?;
        match &self.objects[&id].payload {
            ObjectPayload::Geometry(geom) => Ok(geom),
            _ => Err(self.wrong_type(path, "geometry", id)),
        }
    }

    fn geometry_mut_by_id(&mut self, id: ObjectId) -> &mut GeometryObject {
        match &mut self.objects.get_mut(&id).expect("caller resolved").payload {
            ObjectPayload::Geometry(geom) => geom,
            _ => unreachable!("caller checked payload"),
        }
    }

    fn geometry_id(&self, path: &DataPath) -> Result<ObjectId, DataMillError> {
        let id = self.resolve(path)?;
        match &self.objects[&id].payload {
            ObjectPayload::Geometry(_) => Ok(id),
            _ => Err(self.wrong_type(path, "geometry", id)),
        }
    }

    // ---------------------------------------------------------------------
    // Shape queries and cascading resizes
    // ---------------------------------------------------------------------

    /// Check that every path names an array and that all tuple counts agree.
    ///
    /// Pure query. Returns the first mismatching pair with both counts.
    pub fn validate_number_of_tuples(&self, paths: &[DataPath]) -> Result<(), DataMillError> {
        let mut counted = Vec::with_capacity(paths.len());
        for path in paths {
            counted.push((path, self.array(path)?.tuple_count()));
        }
        for ((left, left_count), (right, right_count)) in counted.iter().tuple_windows() {
            if left_count != right_count {
                return Err(DataMillError::TupleCountMismatch {
                    left: (*left).clone(),
                    left_count: *left_count,
                    right: (*right).clone(),
                    right_count: *right_count,
                });
            }
        }
        Ok(())
    }

    /// Reshape an attribute matrix, cascading to every child array.
    pub fn resize_attribute_matrix(
        &mut self,
        path: &DataPath,
        new_shape: Vec<usize>,
    ) -> Result<(), DataMillError> {
        let id = self.resolve(path)?;
        match &mut self.objects.get_mut(&id).expect("resolved").payload {
            ObjectPayload::AttributeMatrix { tuple_shape } => {
                *tuple_shape = new_shape.clone();
            }
            _ => return Err(self.wrong_type(path, "attribute matrix", id)),
        }
        let children = self.objects[&id].children.clone();
        for child in children {
            if let ObjectPayload::Array(array) =
                &mut self.objects.get_mut(&child).expect("child edge").payload
            {
                array.resize_tuples(new_shape.clone());
            }
        }
        self.debug_assert_invariants();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Geometry sizing and linkage
    // ---------------------------------------------------------------------

    /// The element count (cells, faces, edges, points) of a sized geometry.
    pub fn geometry_element_count(&self, path: &DataPath) -> Result<usize, DataMillError> {
        let geom = self.geometry(path)?;
        match geom.shape() {
            GeometryShape::Unsized => Err(DataMillError::UnsizedGeometry(path.clone())),
            GeometryShape::Image { dims, .. } => Ok(dims.iter().product()),
            GeometryShape::RectGrid { bounds } => {
                let mut cells = 1usize;
                for axis in bounds {
                    let count = self.tuple_count_by_id(*axis)?;
                    cells *= count.saturating_sub(1);
                }
                Ok(cells)
            }
            GeometryShape::NodeBased {
                vertices,
                connectivity,
            } => match connectivity {
                Some(conn) => self.tuple_count_by_id(*conn),
                None => self.tuple_count_by_id(*vertices),
            },
        }
    }

    /// The vertex count of a sized geometry (for per-point data).
    pub fn geometry_vertex_count(&self, path: &DataPath) -> Result<usize, DataMillError> {
        let geom = self.geometry(path)?;
        match geom.shape() {
            GeometryShape::Unsized => Err(DataMillError::UnsizedGeometry(path.clone())),
            GeometryShape::Image { dims, .. } => {
                Ok(dims.iter().map(|d| d + 1).product())
            }
            GeometryShape::RectGrid { bounds } => {
                let mut points = 1usize;
                for axis in bounds {
                    points *= self.tuple_count_by_id(*axis)?;
                }
                Ok(points)
            }
            GeometryShape::NodeBased { vertices, .. } => self.tuple_count_by_id(*vertices),
        }
    }

    fn tuple_count_by_id(&self, id: ObjectId) -> Result<usize, DataMillError> {
        let node = self
            .objects
            .get(&id)
            .ok_or_else(|| DataMillError::NotFound(DataPath::single("?").expect("literal")))?;
        match &node.payload {
            ObjectPayload::Array(array) => Ok(array.tuple_count()),
            other => Err(DataMillError::WrongType {
                path: self.path_of(id)?,
                expected: "array",
                found: other.kind(),
            }),
        }
    }

    /// Size an unsized image geometry: the `Unsized -> Sized` transition.
    pub fn set_image_dimensions(
        &mut self,
        path: &DataPath,
        dims: [usize; 3],
        spacing: [f64; 3],
        origin: [f64; 3],
    ) -> Result<(), DataMillError> {
        let id = self.geometry_id(path)?;
        let geom = self.geometry_mut_by_id(id);
        if geom.is_sized() {
            return Err(DataMillError::AlreadySized(path.clone()));
        }
        geom.set_shape(GeometryShape::Image {
            dims,
            spacing,
            origin,
        });
        Ok(())
    }

    /// Size an unsized node-based geometry by attaching its vertex list and,
    /// for 1D+ kinds, its connectivity array.
    pub fn attach_mesh(
        &mut self,
        path: &DataPath,
        vertices: &DataPath,
        connectivity: Option<&DataPath>,
    ) -> Result<(), DataMillError> {
        let id = self.geometry_id(path)?;
        let kind = match &self.objects[&id].payload {
            ObjectPayload::Geometry(g) => g.kind(),
            _ => unreachable!("geometry_id checked"),
        };
        if !kind.is_node_based() {
            return Err(DataMillError::WrongType {
                path: path.clone(),
                expected: "node-based geometry",
                found: "grid geometry",
            });
        }
        if self.geometry(path)?.is_sized() {
            return Err(DataMillError::AlreadySized(path.clone()));
        }
        let vertex_id = self.resolve(vertices)?;
        self.tuple_count_by_id(vertex_id)?;
        let connectivity_id = match (kind, connectivity) {
            (GeometryKind::Vertex, None) => None,
            (GeometryKind::Vertex, Some(conn)) => {
                return Err(DataMillError::WrongType {
                    path: conn.clone(),
                    expected: "no connectivity for vertex geometry",
                    found: "array",
                });
            }
            (_, Some(conn)) => {
                let conn_id = self.resolve(conn)?;
                self.tuple_count_by_id(conn_id)?;
                Some(conn_id)
            }
            (_, None) => return Err(DataMillError::UnsizedGeometry(path.clone())),
        };
        let geom = self.geometry_mut_by_id(id);
        geom.set_shape(GeometryShape::NodeBased {
            vertices: vertex_id,
            connectivity: connectivity_id,
        });
        Ok(())
    }

    /// Size an unsized rectilinear grid by attaching per-axis bound arrays.
    pub fn attach_rect_grid_bounds(
        &mut self,
        path: &DataPath,
        bounds: [&DataPath; 3],
    ) -> Result<(), DataMillError> {
        let id = self.geometry_id(path)?;
        let kind = self.geometry(path)?.kind();
        if kind != GeometryKind::RectGrid {
            return Err(DataMillError::WrongType {
                path: path.clone(),
                expected: "rectilinear grid geometry",
                found: "geometry",
            });
        }
        if self.geometry(path)?.is_sized() {
            return Err(DataMillError::AlreadySized(path.clone()));
        }
        let mut ids = [ObjectId::new(1).expect("nonzero literal"); 3];
        for (slot, axis) in ids.iter_mut().zip(bounds) {
            let axis_id = self.resolve(axis)?;
            self.tuple_count_by_id(axis_id)?;
            *slot = axis_id;
        }
        let geom = self.geometry_mut_by_id(id);
        geom.set_shape(GeometryShape::RectGrid { bounds: ids });
        Ok(())
    }

    /// Register an array as per-cell data of a sized geometry.
    ///
    /// # Errors
    /// `UnsizedGeometry` before sizing; `TupleCountMismatch` if the array's
    /// tuple count differs from the geometry's element count at
    /// registration time.
    pub fn add_cell_data(
        &mut self,
        geometry: &DataPath,
        array: &DataPath,
    ) -> Result<(), DataMillError> {
        let elements = self.geometry_element_count(geometry)?;
        let array_id = self.resolve(array)?;
        let tuples = self.tuple_count_by_id(array_id)?;
        if tuples != elements {
            return Err(DataMillError::TupleCountMismatch {
                left: geometry.clone(),
                left_count: elements,
                right: array.clone(),
                right_count: tuples,
            });
        }
        let id = self.geometry_id(geometry)?;
        self.geometry_mut_by_id(id).push_cell_data(array_id);
        Ok(())
    }

    /// Register an array as per-point data of a sized geometry.
    pub fn add_point_data(
        &mut self,
        geometry: &DataPath,
        array: &DataPath,
    ) -> Result<(), DataMillError> {
        let points = self.geometry_vertex_count(geometry)?;
        let array_id = self.resolve(array)?;
        let tuples = self.tuple_count_by_id(array_id)?;
        if tuples != points {
            return Err(DataMillError::TupleCountMismatch {
                left: geometry.clone(),
                left_count: points,
                right: array.clone(),
                right_count: tuples,
            });
        }
        let id = self.geometry_id(geometry)?;
        self.geometry_mut_by_id(id).push_point_data(array_id);
        Ok(())
    }

    /// The paths a geometry currently links (cell then point data).
    ///
    /// External filters use this to discover what must stay
    /// shape-consistent with the geometry.
    pub fn linked_geometry_data(&self, path: &DataPath) -> Result<Vec<DataPath>, DataMillError> {
        let geom = self.geometry(path)?;
        geom.linked_ids().map(|id| self.path_of(id)).collect()
    }

    /// Resize a sized image geometry and every linked array.
    ///
    /// Fails `SharedResizeConflict` if a linked array is also linked by a
    /// geometry whose element count would disagree; on failure nothing is
    /// resized.
    pub fn resize_geometry(
        &mut self,
        path: &DataPath,
        dims: [usize; 3],
    ) -> Result<(), DataMillError> {
        let id = self.geometry_id(path)?;
        let (spacing, origin) = match self.geometry(path)?.shape() {
            GeometryShape::Unsized => return Err(DataMillError::UnsizedGeometry(path.clone())),
            GeometryShape::Image {
                spacing, origin, ..
            } => (*spacing, *origin),
            _ => {
                return Err(DataMillError::WrongType {
                    path: path.clone(),
                    expected: "image geometry",
                    found: "geometry",
                });
            }
        };
        let new_cells: usize = dims.iter().product();
        let new_points: usize = dims.iter().map(|d| d + 1).product();

        // Plan first: collect every linked array with its target count and
        // refuse if any is co-linked by a differently-sized geometry.
        let geom = self.geometry(path)?;
        let plan: Vec<(ObjectId, usize)> = geom
            .cell_data()
            .iter()
            .map(|&a| (a, new_cells))
            .chain(geom.point_data().iter().map(|&a| (a, new_points)))
            .collect();
        for &(array_id, requested) in &plan {
            for (&other_id, node) in &self.objects {
                if other_id == id {
                    continue;
                }
                let ObjectPayload::Geometry(other) = &node.payload else {
                    continue;
                };
                if !other.linked_ids().any(|linked| linked == array_id) {
                    continue;
                }
                let other_path = self.path_of(other_id)?;
                let other_count = self.geometry_element_count(&other_path)?;
                if other_count != requested {
                    return Err(DataMillError::SharedResizeConflict {
                        array: self.path_of(array_id)?,
                        requested,
                        other: other_path,
                        other_count,
                    });
                }
            }
        }

        for &(array_id, requested) in &plan {
            let shape = if requested == new_cells {
                dims.to_vec()
            } else {
                dims.iter().map(|d| d + 1).collect()
            };
            // An array owned by an attribute matrix resizes through the
            // matrix, so the shape agreement with its siblings holds.
            let matrix_parent = self.objects[&array_id]
                .parents
                .iter()
                .copied()
                .find(|p| {
                    matches!(
                        self.objects[p].payload,
                        ObjectPayload::AttributeMatrix { .. }
                    )
                });
            match matrix_parent {
                Some(matrix_id) => {
                    let matrix_path = self.path_of(matrix_id)?;
                    self.resize_attribute_matrix(&matrix_path, shape)?;
                }
                None => {
                    if let ObjectPayload::Array(array) =
                        &mut self.objects.get_mut(&array_id).expect("linked id").payload
                    {
                        array.resize_tuples(shape);
                    }
                }
            }
        }
        let geom = self.geometry_mut_by_id(id);
        geom.set_shape(GeometryShape::Image {
            dims,
            spacing,
            origin,
        });
        self.debug_assert_invariants();
        Ok(())
    }
}

impl DebugInvariants for DataStructure {
    fn debug_assert_invariants(&self) {
        crate::mill_debug_assert_ok!(self.validate_invariants(), "DataStructure invalid");
    }

    fn validate_invariants(&self) -> Result<(), DataMillError> {
        // 1) sibling names unique at the top level and under every container
        let sibling_sets = std::iter::once((None, &self.top_level)).chain(
            self.objects
                .iter()
                .map(|(id, node)| (Some(*id), &node.children)),
        );
        for (holder, children) in sibling_sets {
            let mut seen = std::collections::HashSet::new();
            for child in children {
                let child_node = self.objects.get(child).ok_or_else(|| {
                    DataMillError::NotFound(DataPath::single("?").expect("literal"))
                })?;
                if !seen.insert(child_node.name.as_str()) {
                    let parent = match holder {
                        Some(id) => self.path_of(id)?,
                        None => DataPath::single(child_node.name.clone())?,
                    };
                    return Err(DataMillError::DuplicateName {
                        parent,
                        name: child_node.name.clone(),
                    });
                }
            }
        }

        // 2) parent/child mirror agreement, both directions
        for (id, node) in &self.objects {
            for child in &node.children {
                let child_node = self.objects.get(child).ok_or_else(|| {
                    DataMillError::NotFound(DataPath::single("?").expect("literal"))
                })?;
                if !child_node.parents.contains(id) {
                    return Err(DataMillError::NotFound(self.path_of(*child)?));
                }
            }
            for parent in &node.parents {
                let parent_node = self.objects.get(parent).ok_or_else(|| {
                    DataMillError::NotFound(DataPath::single("?").expect("literal"))
                })?;
                if !parent_node.children.contains(id) {
                    return Err(DataMillError::NotFound(self.path_of(*id)?));
                }
            }
            if node.parents.is_empty() && !self.top_level.contains(id) {
                return Err(DataMillError::NotFound(self.path_of(*id)?));
            }
        }

        // 3) attribute matrix children are arrays matching the matrix shape
        for (id, node) in &self.objects {
            let ObjectPayload::AttributeMatrix { tuple_shape } = &node.payload else {
                continue;
            };
            for child in &node.children {
                match &self.objects[child].payload {
                    ObjectPayload::Array(array) => {
                        if array.tuple_shape() != tuple_shape.as_slice() {
                            return Err(DataMillError::ShapeMismatch {
                                matrix: self.path_of(*id)?,
                                expected: tuple_shape.clone(),
                                found: array.tuple_shape().to_vec(),
                            });
                        }
                    }
                    other => {
                        return Err(DataMillError::WrongType {
                            path: self.path_of(*id)?,
                            expected: "array",
                            found: other.kind(),
                        });
                    }
                }
            }
        }

        // 4) geometry references point at live objects
        for (id, node) in &self.objects {
            let ObjectPayload::Geometry(geom) = &node.payload else {
                continue;
            };
            for referenced in geom.linked_ids().chain(geom.structural_ids()) {
                if !self.objects.contains_key(&referenced) {
                    return Err(DataMillError::GeometryLinkInUse {
                        geometry: self.path_of(*id)?,
                        linked: DataPath::single("?").expect("literal"),
                    });
                }
            }
        }

        Ok(())
    }
}
