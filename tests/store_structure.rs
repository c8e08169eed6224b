//! Integration coverage for the store: path round-trips, uniqueness,
//! attribute-matrix shape enforcement, and tuple-count validation.

use data_mill::prelude::*;

use proptest::prelude::*;

fn int_array(tuples: usize) -> ObjectPayload {
    ObjectPayload::Array(TaggedArray::new(DataType::Int32, vec![tuples], vec![1]))
}

#[test]
fn inserted_object_round_trips_exactly() {
    let mut store = DataStructure::new();
    store.insert(None, "Data", ObjectPayload::Group).unwrap();
    let path = DataPath::parse("Data/Ids").unwrap();
    let id = store
        .insert(Some(&DataPath::parse("Data").unwrap()), "Ids", int_array(100))
        .unwrap();

    assert_eq!(store.resolve(&path).unwrap(), id);
    assert_eq!(store.object(id).unwrap().name(), "Ids");
    assert_eq!(store.path_of(id).unwrap(), path);
    assert_eq!(store.array(&path).unwrap().tuple_count(), 100);
}

#[test]
fn sibling_name_collision_fails_duplicate_name() {
    let mut store = DataStructure::new();
    store.insert(None, "Data", ObjectPayload::Group).unwrap();
    let data = DataPath::parse("Data").unwrap();
    store.insert(Some(&data), "Ids", int_array(1)).unwrap();

    let err = store
        .insert(
            Some(&data),
            "Ids",
            ObjectPayload::Array(TaggedArray::new(DataType::Float64, vec![1], vec![1])),
        )
        .unwrap_err();
    assert_eq!(err.code(), -112);
    // The original object is untouched.
    assert_eq!(
        store
            .array(&DataPath::parse("Data/Ids").unwrap())
            .unwrap()
            .data_type(),
        DataType::Int32
    );
}

#[test]
fn attribute_matrix_rejects_mismatched_and_cascades_resize() {
    let mut store = DataStructure::new();
    store.insert(None, "Data", ObjectPayload::Group).unwrap();
    let data = DataPath::parse("Data").unwrap();
    let matrix = DataPath::parse("Data/Cells").unwrap();
    store
        .insert(
            Some(&data),
            "Cells",
            ObjectPayload::AttributeMatrix {
                tuple_shape: vec![8, 8],
            },
        )
        .unwrap();

    let err = store
        .insert(
            Some(&matrix),
            "Wrong",
            ObjectPayload::Array(TaggedArray::new(DataType::Float32, vec![64], vec![1])),
        )
        .unwrap_err();
    assert_eq!(err.code(), -114);

    store
        .insert(
            Some(&matrix),
            "Euler",
            ObjectPayload::Array(TaggedArray::new(DataType::Float32, vec![8, 8], vec![3])),
        )
        .unwrap();
    store
        .insert(
            Some(&matrix),
            "Phase",
            ObjectPayload::Array(TaggedArray::new(DataType::UInt8, vec![8, 8], vec![1])),
        )
        .unwrap();

    store.resize_attribute_matrix(&matrix, vec![16, 4]).unwrap();
    for name in ["Euler", "Phase"] {
        let child = matrix.child(name).unwrap();
        assert_eq!(store.array(&child).unwrap().tuple_shape(), &[16, 4]);
    }
    store.validate_invariants().unwrap();
}

#[test]
fn remove_respects_geometry_links_unless_forced() {
    let mut store = DataStructure::new();
    store.insert(None, "Data", ObjectPayload::Group).unwrap();
    let data = DataPath::parse("Data").unwrap();
    store.insert(Some(&data), "Ids", int_array(1000)).unwrap();
    store
        .insert(
            Some(&data),
            "Image",
            ObjectPayload::Geometry(
                GeometryConfig::Image {
                    dims: [10, 10, 10],
                    spacing: [1.0; 3],
                    origin: [0.0; 3],
                }
                .build(),
            ),
        )
        .unwrap();
    let geom = DataPath::parse("Data/Image").unwrap();
    let ids = DataPath::parse("Data/Ids").unwrap();
    store.add_cell_data(&geom, &ids).unwrap();

    let err = store.remove(&ids, false).unwrap_err();
    assert_eq!(err.code(), -116);
    assert!(store.contains(&ids));

    let warnings = store.remove(&ids, true).unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].code, -116);
    assert!(!store.contains(&ids));
    assert!(store.linked_geometry_data(&geom).unwrap().is_empty());
    store.validate_invariants().unwrap();
}

#[test]
fn store_snapshot_serde_roundtrip() {
    let mut store = DataStructure::new();
    store.insert(None, "Data", ObjectPayload::Group).unwrap();
    let data = DataPath::parse("Data").unwrap();
    store.insert(Some(&data), "Ids", int_array(16)).unwrap();

    let json = serde_json::to_string(&store).expect("serialize");
    let restored: DataStructure = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(restored, store);
    restored.validate_invariants().unwrap();
}

proptest! {
    #[test]
    fn path_display_parse_roundtrip(segments in prop::collection::vec("[A-Za-z0-9_]{1,12}", 1..6)) {
        let path = DataPath::new(segments.clone()).unwrap();
        let reparsed = DataPath::parse(&path.to_string()).unwrap();
        prop_assert_eq!(&reparsed, &path);
        prop_assert_eq!(reparsed.segments().len(), segments.len());
    }

    #[test]
    fn tuple_validation_is_commutative(a in 1usize..2048, b in 1usize..2048) {
        let mut store = DataStructure::new();
        store.insert(None, "Data", ObjectPayload::Group).unwrap();
        let data = DataPath::parse("Data").unwrap();
        store.insert(Some(&data), "A", int_array(a)).unwrap();
        store.insert(Some(&data), "B", int_array(b)).unwrap();
        let pa = DataPath::parse("Data/A").unwrap();
        let pb = DataPath::parse("Data/B").unwrap();

        let forward = store.validate_number_of_tuples(&[pa.clone(), pb.clone()]);
        let backward = store.validate_number_of_tuples(&[pb, pa]);
        prop_assert_eq!(forward.is_ok(), backward.is_ok());
        prop_assert_eq!(forward.is_ok(), a == b);
    }
}
