//! Geometry sizing, linked-data validation, and shared-vertex semantics.

use data_mill::prelude::*;

fn float_array(tuples: usize, comps: usize) -> ObjectPayload {
    ObjectPayload::Array(TaggedArray::new(
        DataType::Float32,
        vec![tuples],
        vec![comps],
    ))
}

fn image_10x10x10(store: &mut DataStructure, parent: &DataPath, name: &str) -> DataPath {
    store
        .insert(
            Some(parent),
            name,
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
    parent.child(name).unwrap()
}

#[test]
fn image_geometry_validates_cell_tuple_counts() {
    let mut store = DataStructure::new();
    store.insert(None, "DC", ObjectPayload::Group).unwrap();
    let dc = DataPath::parse("DC").unwrap();
    let geom = image_10x10x10(&mut store, &dc, "Image");
    assert_eq!(store.geometry_element_count(&geom).unwrap(), 1000);

    store
        .insert(
            Some(&dc),
            "Short",
            ObjectPayload::Array(TaggedArray::new(DataType::Int32, vec![999], vec![1])),
        )
        .unwrap();
    let err = store
        .add_cell_data(&geom, &DataPath::parse("DC/Short").unwrap())
        .unwrap_err();
    match err {
        DataMillError::TupleCountMismatch {
            left_count,
            right_count,
            ..
        } => assert_eq!((left_count, right_count), (1000, 999)),
        other => panic!("unexpected error {other:?}"),
    }

    store
        .insert(
            Some(&dc),
            "Exact",
            ObjectPayload::Array(TaggedArray::new(DataType::Int32, vec![1000], vec![1])),
        )
        .unwrap();
    store
        .add_cell_data(&geom, &DataPath::parse("DC/Exact").unwrap())
        .unwrap();
    assert_eq!(
        store.linked_geometry_data(&geom).unwrap(),
        vec![DataPath::parse("DC/Exact").unwrap()]
    );
}

#[test]
fn unsized_geometry_rejects_links_until_attached() {
    let mut store = DataStructure::new();
    store.insert(None, "DC", ObjectPayload::Group).unwrap();
    let dc = DataPath::parse("DC").unwrap();
    store
        .insert(
            Some(&dc),
            "Tris",
            ObjectPayload::Geometry(
                GeometryConfig::Unsized {
                    kind: GeometryKind::Triangle,
                }
                .build(),
            ),
        )
        .unwrap();
    let geom = DataPath::parse("DC/Tris").unwrap();
    store.insert(Some(&dc), "Areas", float_array(20, 1)).unwrap();

    let err = store
        .add_cell_data(&geom, &DataPath::parse("DC/Areas").unwrap())
        .unwrap_err();
    assert_eq!(err.code(), -130);

    // Attach a vertex list and connectivity: Unsized -> Sized.
    store.insert(Some(&dc), "Verts", float_array(12, 3)).unwrap();
    store
        .insert(
            Some(&dc),
            "Faces",
            ObjectPayload::Array(TaggedArray::new(DataType::UInt64, vec![20], vec![3])),
        )
        .unwrap();
    store
        .attach_mesh(
            &geom,
            &DataPath::parse("DC/Verts").unwrap(),
            Some(&DataPath::parse("DC/Faces").unwrap()),
        )
        .unwrap();
    assert_eq!(store.geometry_element_count(&geom).unwrap(), 20);
    assert_eq!(store.geometry_vertex_count(&geom).unwrap(), 12);

    // Sizing is one-directional.
    let err = store
        .attach_mesh(
            &geom,
            &DataPath::parse("DC/Verts").unwrap(),
            Some(&DataPath::parse("DC/Faces").unwrap()),
        )
        .unwrap_err();
    assert_eq!(err.code(), -131);

    store
        .add_cell_data(&geom, &DataPath::parse("DC/Areas").unwrap())
        .unwrap();
    // Point data validates against the vertex count.
    store
        .insert(Some(&dc), "Normals", float_array(12, 3))
        .unwrap();
    store
        .add_point_data(&geom, &DataPath::parse("DC/Normals").unwrap())
        .unwrap();
    assert_eq!(store.linked_geometry_data(&geom).unwrap().len(), 2);
}

#[test]
fn rect_grid_counts_come_from_bound_arrays() {
    let mut store = DataStructure::new();
    store.insert(None, "DC", ObjectPayload::Group).unwrap();
    let dc = DataPath::parse("DC").unwrap();
    for (name, positions) in [("X", 11), ("Y", 6), ("Z", 3)] {
        store
            .insert(Some(&dc), name, float_array(positions, 1))
            .unwrap();
    }
    store
        .insert(
            Some(&dc),
            "Grid",
            ObjectPayload::Geometry(
                GeometryConfig::Unsized {
                    kind: GeometryKind::RectGrid,
                }
                .build(),
            ),
        )
        .unwrap();
    let grid = DataPath::parse("DC/Grid").unwrap();
    store
        .attach_rect_grid_bounds(
            &grid,
            [
                &DataPath::parse("DC/X").unwrap(),
                &DataPath::parse("DC/Y").unwrap(),
                &DataPath::parse("DC/Z").unwrap(),
            ],
        )
        .unwrap();

    // Bounds hold axis positions; cells are one fewer per axis.
    assert_eq!(store.geometry_element_count(&grid).unwrap(), 10 * 5 * 2);
    assert_eq!(store.geometry_vertex_count(&grid).unwrap(), 11 * 6 * 3);

    store
        .insert(
            Some(&dc),
            "Pressure",
            ObjectPayload::Array(TaggedArray::new(DataType::Float64, vec![100], vec![1])),
        )
        .unwrap();
    store
        .add_cell_data(&grid, &DataPath::parse("DC/Pressure").unwrap())
        .unwrap();
}

#[test]
fn shared_vertex_list_between_two_geometries() {
    let mut store = DataStructure::new();
    store.insert(None, "DC", ObjectPayload::Group).unwrap();
    let dc = DataPath::parse("DC").unwrap();
    store.insert(Some(&dc), "Verts", float_array(30, 3)).unwrap();
    let verts = DataPath::parse("DC/Verts").unwrap();

    for name in ["Cloud1", "Cloud2"] {
        store
            .insert(
                Some(&dc),
                name,
                ObjectPayload::Geometry(
                    GeometryConfig::Unsized {
                        kind: GeometryKind::Vertex,
                    }
                    .build(),
                ),
            )
            .unwrap();
        store
            .attach_mesh(&dc.child(name).unwrap(), &verts, None)
            .unwrap();
    }
    for name in ["Cloud1", "Cloud2"] {
        assert_eq!(
            store
                .geometry_element_count(&dc.child(name).unwrap())
                .unwrap(),
            30
        );
    }

    // Removing the shared vertex list without force is refused.
    let err = store.remove(&verts, false).unwrap_err();
    assert_eq!(err.code(), -116);
}

#[test]
fn resize_cascades_to_linked_arrays() {
    let mut store = DataStructure::new();
    store.insert(None, "DC", ObjectPayload::Group).unwrap();
    let dc = DataPath::parse("DC").unwrap();
    let geom = image_10x10x10(&mut store, &dc, "Image");
    store
        .insert(
            Some(&dc),
            "Mask",
            ObjectPayload::Array(TaggedArray::new(DataType::Boolean, vec![1000], vec![1])),
        )
        .unwrap();
    let mask = DataPath::parse("DC/Mask").unwrap();
    store.add_cell_data(&geom, &mask).unwrap();

    store.resize_geometry(&geom, [5, 5, 5]).unwrap();
    assert_eq!(store.geometry_element_count(&geom).unwrap(), 125);
    assert_eq!(store.array(&mask).unwrap().tuple_count(), 125);
}

#[test]
fn resize_refuses_arrays_shared_with_a_differently_sized_geometry() {
    let mut store = DataStructure::new();
    store.insert(None, "DC", ObjectPayload::Group).unwrap();
    let dc = DataPath::parse("DC").unwrap();
    let geom_a = image_10x10x10(&mut store, &dc, "A");
    let geom_b = image_10x10x10(&mut store, &dc, "B");
    store
        .insert(
            Some(&dc),
            "Shared",
            ObjectPayload::Array(TaggedArray::new(DataType::Float64, vec![1000], vec![1])),
        )
        .unwrap();
    let shared = DataPath::parse("DC/Shared").unwrap();
    store.add_cell_data(&geom_a, &shared).unwrap();
    store.add_cell_data(&geom_b, &shared).unwrap();

    // Shrinking A would desynchronize B's 1000-element view of `Shared`.
    let err = store.resize_geometry(&geom_a, [5, 5, 5]).unwrap_err();
    assert_eq!(err.code(), -132);
    assert_eq!(store.array(&shared).unwrap().tuple_count(), 1000);
    assert_eq!(store.geometry_element_count(&geom_a).unwrap(), 1000);
}
