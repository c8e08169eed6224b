//! Action-staging guarantees: atomic application, in-set path visibility,
//! and serde replayability.

use data_mill::prelude::*;

fn seeded_store() -> DataStructure {
    let mut store = DataStructure::new();
    store.insert(None, "Data", ObjectPayload::Group).unwrap();
    store
        .insert(
            Some(&DataPath::parse("Data").unwrap()),
            "Existing",
            ObjectPayload::Array(TaggedArray::new(DataType::Int32, vec![8], vec![1])),
        )
        .unwrap();
    store
}

fn failing_set(fail_at: usize) -> OutputActions {
    // A chain of valid creations with one doomed action spliced at `fail_at`
    // (duplicate of an existing path).
    let mut actions: Vec<Action> = (0..4)
        .map(|i| Action::CreateArray {
            path: DataPath::parse(&format!("Data/New{i}")).unwrap(),
            data_type: DataType::Float32,
            tuple_shape: vec![8],
            component_shape: vec![1],
        })
        .collect();
    actions.insert(
        fail_at,
        Action::CreateGroup {
            path: DataPath::parse("Data/Existing").unwrap(),
        },
    );
    actions.into_iter().collect()
}

#[test]
fn failed_apply_leaves_store_deep_equal_for_any_position() {
    for fail_at in 0..5 {
        let mut store = seeded_store();
        let before = store.clone();
        let errors = failing_set(fail_at).apply_to(&mut store).unwrap_err();
        assert_eq!(errors.len(), 1, "fail_at={fail_at}");
        assert_eq!(errors[0].code, -112);
        assert_eq!(store, before, "store mutated for fail_at={fail_at}");
    }
}

#[test]
fn successful_apply_commits_in_declaration_order() {
    let mut store = seeded_store();
    let actions: OutputActions = [
        Action::CreateGroup {
            path: DataPath::parse("Data/Sub").unwrap(),
        },
        Action::CreateArray {
            path: DataPath::parse("Data/Sub/Values").unwrap(),
            data_type: DataType::Float64,
            tuple_shape: vec![3],
            component_shape: vec![1],
        },
        Action::RenameObject {
            path: DataPath::parse("Data/Sub/Values").unwrap(),
            new_name: "Renamed".into(),
        },
    ]
    .into_iter()
    .collect();

    actions.apply_to(&mut store).unwrap();
    assert!(store.contains(&DataPath::parse("Data/Sub/Renamed").unwrap()));
    assert!(!store.contains(&DataPath::parse("Data/Sub/Values").unwrap()));
}

#[test]
fn later_actions_resolve_paths_created_earlier_in_the_set() {
    let mut store = DataStructure::new();
    let actions: OutputActions = [
        Action::CreateGroup {
            path: DataPath::parse("DC").unwrap(),
        },
        Action::CreateGeometry {
            path: DataPath::parse("DC/Image").unwrap(),
            config: GeometryConfig::Image {
                dims: [4, 4, 4],
                spacing: [0.5; 3],
                origin: [0.0; 3],
            },
        },
        Action::CreateArray {
            path: DataPath::parse("DC/Conf").unwrap(),
            data_type: DataType::Float32,
            tuple_shape: vec![64],
            component_shape: vec![1],
        },
        Action::LinkGeometryData {
            geometry: DataPath::parse("DC/Image").unwrap(),
            array: DataPath::parse("DC/Conf").unwrap(),
            association: DataAssociation::Cell,
        },
    ]
    .into_iter()
    .collect();

    actions.apply_to(&mut store).unwrap();
    assert_eq!(
        store
            .linked_geometry_data(&DataPath::parse("DC/Image").unwrap())
            .unwrap(),
        vec![DataPath::parse("DC/Conf").unwrap()]
    );
}

#[test]
fn replayed_actions_produce_an_identical_store() {
    let actions = {
        let mut set = OutputActions::new();
        set.push(Action::CreateGroup {
            path: DataPath::parse("Data").unwrap(),
        });
        set.push(Action::CreateAttributeMatrix {
            path: DataPath::parse("Data/Cells").unwrap(),
            tuple_shape: vec![6],
        });
        set.push(Action::CreateArray {
            path: DataPath::parse("Data/Cells/Ids").unwrap(),
            data_type: DataType::Int64,
            tuple_shape: vec![6],
            component_shape: vec![1],
        });
        set
    };

    // Serialize, deserialize, and apply both sets to fresh stores.
    let bytes = bincode::serialize(&actions).expect("serialize");
    let replayed: OutputActions = bincode::deserialize(&bytes).expect("deserialize");

    let mut direct = DataStructure::new();
    actions.apply_to(&mut direct).unwrap();
    let mut via_wire = DataStructure::new();
    replayed.apply_to(&mut via_wire).unwrap();
    assert_eq!(direct, via_wire);
}

#[test]
fn delete_action_warnings_surface_through_apply() {
    let mut store = DataStructure::new();
    store.insert(None, "Data", ObjectPayload::Group).unwrap();
    let data = DataPath::parse("Data").unwrap();
    store
        .insert(
            Some(&data),
            "Ids",
            ObjectPayload::Array(TaggedArray::new(DataType::Int32, vec![27], vec![1])),
        )
        .unwrap();
    store
        .insert(
            Some(&data),
            "Image",
            ObjectPayload::Geometry(
                GeometryConfig::Image {
                    dims: [3, 3, 3],
                    spacing: [1.0; 3],
                    origin: [0.0; 3],
                }
                .build(),
            ),
        )
        .unwrap();
    store
        .add_cell_data(
            &DataPath::parse("Data/Image").unwrap(),
            &DataPath::parse("Data/Ids").unwrap(),
        )
        .unwrap();

    // A non-forced delete of the linked array must refuse, atomically.
    let actions: OutputActions = [Action::DeleteObject {
        path: DataPath::parse("Data/Ids").unwrap(),
    }]
    .into_iter()
    .collect();
    let before = store.clone();
    let errors = actions.apply_to(&mut store).unwrap_err();
    assert_eq!(errors[0].code, -116);
    assert_eq!(store, before);
}
