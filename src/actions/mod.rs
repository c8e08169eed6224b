//! Actions: staged, replayable descriptions of structural mutations.
//!
//! A filter's preflight never touches the store; instead it emits an ordered
//! [`OutputActions`] set describing the structural changes its execute phase
//! relies on. The engine applies the set between preflight and execute.
//!
//! Application is all-or-nothing: actions run against a cloned staging
//! structure in declaration order, and the store is swapped only when every
//! action succeeded. A creation action's resulting path is resolvable for
//! actions later in the same set, so a `LinkGeometryData` may target an
//! array created two actions earlier.

use serde::{Deserialize, Serialize};

use crate::geometry::GeometryConfig;
use crate::mill_error::DataMillError;
use crate::result::{ErrorMessage, WarningMessage};
use crate::store::object::ObjectPayload;
use crate::store::path::DataPath;
use crate::store::structure::DataStructure;
use crate::store::tagged::{DataType, TaggedArray};

/// Which geometry count a linked array is validated against.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum DataAssociation {
    /// Tuple count must match the geometry's element count.
    Cell,
    /// Tuple count must match the geometry's vertex count.
    Point,
}

/// One staged structural mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Create a plain group at `path`.
    CreateGroup {
        /// Full path of the group to create.
        path: DataPath,
    },
    /// Create an attribute matrix fixing a tuple shape for its children.
    CreateAttributeMatrix {
        /// Full path of the matrix to create.
        path: DataPath,
        /// Tuple shape every child array must match.
        tuple_shape: Vec<usize>,
    },
    /// Create a typed array, default-filled.
    CreateArray {
        /// Full path of the array to create.
        path: DataPath,
        /// Element type tag.
        data_type: DataType,
        /// Ordered tuple dimensions.
        tuple_shape: Vec<usize>,
        /// Ordered per-tuple component dimensions.
        component_shape: Vec<usize>,
    },
    /// Create a geometry from a serializable configuration.
    CreateGeometry {
        /// Full path of the geometry to create.
        path: DataPath,
        /// Kind and sizing parameters.
        config: GeometryConfig,
    },
    /// Detach/destroy the object at `path` (non-forced).
    DeleteObject {
        /// Path of the object to remove.
        path: DataPath,
    },
    /// Rename the object at `path`.
    RenameObject {
        /// Path of the object to rename.
        path: DataPath,
        /// Its new name.
        new_name: String,
    },
    /// Register an array as cell or point data of a geometry.
    LinkGeometryData {
        /// The geometry registering the link.
        geometry: DataPath,
        /// The array whose tuple count is validated.
        array: DataPath,
        /// Which element count the array is held against.
        association: DataAssociation,
    },
}

impl Action {
    /// For creation actions, the path the action will produce.
    ///
    /// Read before commit, e.g. to derive a child path for a subsequent
    /// action in the same set.
    pub fn created_path(&self) -> Option<&DataPath> {
        match self {
            Action::CreateGroup { path }
            | Action::CreateAttributeMatrix { path, .. }
            | Action::CreateArray { path, .. }
            | Action::CreateGeometry { path, .. } => Some(path),
            Action::DeleteObject { .. }
            | Action::RenameObject { .. }
            | Action::LinkGeometryData { .. } => None,
        }
    }

    /// Perform this action against a staging structure.
    fn apply_one(&self, store: &mut DataStructure) -> Result<Vec<WarningMessage>, DataMillError> {
        match self {
            Action::CreateGroup { path } => {
                insert_at(store, path, ObjectPayload::Group)?;
                Ok(Vec::new())
            }
            Action::CreateAttributeMatrix { path, tuple_shape } => {
                insert_at(
                    store,
                    path,
                    ObjectPayload::AttributeMatrix {
                        tuple_shape: tuple_shape.clone(),
                    },
                )?;
                Ok(Vec::new())
            }
            Action::CreateArray {
                path,
                data_type,
                tuple_shape,
                component_shape,
            } => {
                insert_at(
                    store,
                    path,
                    ObjectPayload::Array(TaggedArray::new(
                        *data_type,
                        tuple_shape.clone(),
                        component_shape.clone(),
                    )),
                )?;
                Ok(Vec::new())
            }
            Action::CreateGeometry { path, config } => {
                insert_at(store, path, ObjectPayload::Geometry(config.build()))?;
                Ok(Vec::new())
            }
            Action::DeleteObject { path } => store.remove(path, false),
            Action::RenameObject { path, new_name } => {
                store.rename(path, new_name.clone())?;
                Ok(Vec::new())
            }
            Action::LinkGeometryData {
                geometry,
                array,
                association,
            } => {
                match association {
                    DataAssociation::Cell => store.add_cell_data(geometry, array)?,
                    DataAssociation::Point => store.add_point_data(geometry, array)?,
                }
                Ok(Vec::new())
            }
        }
    }
}

fn insert_at(
    store: &mut DataStructure,
    path: &DataPath,
    payload: ObjectPayload,
) -> Result<(), DataMillError> {
    let parent = path.parent().ok();
    store.insert(parent.as_ref(), path.name(), payload)?;
    Ok(())
}

/// An ordered sequence of staged actions; order is commit order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputActions {
    actions: Vec<Action>,
}

impl OutputActions {
    /// An empty action set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action, preserving declaration order.
    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// The staged actions in commit order.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Number of staged actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// True if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Apply the whole set to `store`, atomically.
    ///
    /// The actions run in declaration order against a cloned staging
    /// structure; each creation's path is resolvable for later actions in
    /// the set. On the first failure the original store is left exactly as
    /// it was and the error is returned with the index of the failing
    /// action. On success the staging structure replaces the store and the
    /// accumulated warnings are returned.
    pub fn apply_to(&self, store: &mut DataStructure) -> Result<Vec<WarningMessage>, Vec<ErrorMessage>> {
        let mut staging = store.clone();
        let mut warnings = Vec::new();
        for (index, action) in self.actions.iter().enumerate() {
            match action.apply_one(&mut staging) {
                Ok(mut action_warnings) => warnings.append(&mut action_warnings),
                Err(err) => {
                    let code = err.code();
                    return Err(vec![ErrorMessage::new(
                        code,
                        format!("action {index} failed: {err}"),
                    )]);
                }
            }
        }
        *store = staging;
        Ok(warnings)
    }
}

impl FromIterator<Action> for OutputActions {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Self {
            actions: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tagged::DataType;

    fn create_ids(tuples: usize) -> OutputActions {
        [
            Action::CreateGroup {
                path: DataPath::parse("Data").unwrap(),
            },
            Action::CreateArray {
                path: DataPath::parse("Data/Ids").unwrap(),
                data_type: DataType::Int32,
                tuple_shape: vec![tuples],
                component_shape: vec![1],
            },
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn created_paths_resolve_for_later_actions() {
        let mut actions = create_ids(1000);
        // Derive the geometry's link target from the creation two slots up.
        let array_path = actions.actions()[1].created_path().unwrap().clone();
        actions.push(Action::CreateGeometry {
            path: DataPath::parse("Data/Image").unwrap(),
            config: GeometryConfig::Image {
                dims: [10, 10, 10],
                spacing: [1.0; 3],
                origin: [0.0; 3],
            },
        });
        actions.push(Action::LinkGeometryData {
            geometry: DataPath::parse("Data/Image").unwrap(),
            array: array_path,
            association: DataAssociation::Cell,
        });

        let mut store = DataStructure::new();
        let warnings = actions.apply_to(&mut store).unwrap();
        assert!(warnings.is_empty());
        let linked = store
            .linked_geometry_data(&DataPath::parse("Data/Image").unwrap())
            .unwrap();
        assert_eq!(linked, vec![DataPath::parse("Data/Ids").unwrap()]);
    }

    #[test]
    fn apply_is_all_or_nothing() {
        let mut store = DataStructure::new();
        create_ids(100).apply_to(&mut store).unwrap();
        let before = store.clone();

        // Third action collides with an existing name; nothing may stick.
        let mut actions = OutputActions::new();
        actions.push(Action::CreateGroup {
            path: DataPath::parse("Data/New").unwrap(),
        });
        actions.push(Action::CreateArray {
            path: DataPath::parse("Data/New/Values").unwrap(),
            data_type: DataType::Float64,
            tuple_shape: vec![4],
            component_shape: vec![1],
        });
        actions.push(Action::CreateGroup {
            path: DataPath::parse("Data/Ids").unwrap(),
        });

        let errors = actions.apply_to(&mut store).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, -112);
        assert!(errors[0].message.starts_with("action 2 failed"));
        assert_eq!(store, before);
    }

    #[test]
    fn rename_and_delete_actions() {
        let mut store = DataStructure::new();
        create_ids(10).apply_to(&mut store).unwrap();

        let mut actions = OutputActions::new();
        actions.push(Action::RenameObject {
            path: DataPath::parse("Data/Ids").unwrap(),
            new_name: "FeatureIds".into(),
        });
        actions.push(Action::DeleteObject {
            path: DataPath::parse("Data/FeatureIds").unwrap(),
        });
        actions.apply_to(&mut store).unwrap();
        assert!(!store.contains(&DataPath::parse("Data/Ids").unwrap()));
        assert!(!store.contains(&DataPath::parse("Data/FeatureIds").unwrap()));
    }

    #[test]
    fn serde_roundtrip() {
        let actions = create_ids(7);
        let json = serde_json::to_string(&actions).expect("serialize");
        let de: OutputActions = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(de, actions);

        let bytes = bincode::serialize(&actions).expect("bincode serialize");
        let de: OutputActions = bincode::deserialize(&bytes).expect("bincode deserialize");
        assert_eq!(de, actions);
    }
}
