use approx::assert_relative_eq;
use atomcloud::{Atom, AtomError, AtomStore, SortDirection};
use nalgebra::Point3;

fn store_from(points: &[[f64; 3]]) -> AtomStore {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| Atom::new(i as i32, Point3::new(p[0], p[1], p[2]), 0))
        .collect()
}

#[test]
fn test_append_and_reserve() {
    let mut store = AtomStore::new();
    store.append_point(Point3::new(1.0, 2.0, 3.0));
    assert_eq!(store.size(), 1);

    store.reserve(4);
    assert!(store.is_empty());
    for i in 0..4 {
        store.append(Atom::new(i, Point3::origin(), 7));
    }
    assert_eq!(store.size(), 4);
    assert_eq!(store.marker(3).unwrap(), 7);
}

#[test]
fn test_merge_law() {
    let mut a = store_from(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
    let mut b = store_from(&[[5.0, 5.0, 5.0], [6.0, 5.0, 5.0], [7.0, 5.0, 5.0]]);
    b.set_marker(1, 42).unwrap();

    let size_a = a.size();
    a += &b;

    assert_eq!(a.size(), size_a + b.size());
    assert_eq!(&a.atoms()[size_a..], b.atoms());
    assert_eq!(a.marker(size_a + 1).unwrap(), 42);
}

#[test]
fn test_triangle_statistics() {
    // (0,0,0), (2,0,0), (1,2,0)
    let mut store = store_from(&[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [1.0, 2.0, 0.0]]);
    store.calc_statistics();
    let s = store.sizes();

    assert_relative_eq!(s.xmin, 0.0);
    assert_relative_eq!(s.xmax, 2.0);
    assert_relative_eq!(s.xmean, 1.0);
    assert_relative_eq!(s.ymin, 0.0);
    assert_relative_eq!(s.ymax, 2.0);
}

#[test]
fn test_out_of_range_access() {
    let mut store = store_from(&[[0.0, 0.0, 0.0]]);
    assert!(matches!(
        store.point(1),
        Err(AtomError::IndexOutOfRange { index: 1, len: 1 })
    ));
    assert!(store.set_x(5, 1.0).is_err());
}

#[test]
fn test_sorts_move_ids_and_markers() {
    let mut store = store_from(&[[3.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);
    store.set_marker(0, 9).unwrap();

    store.sort_atoms(0, "up").unwrap();
    let ids: Vec<i32> = store.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![1, 2, 0]);
    assert_eq!(store.marker(2).unwrap(), 9);

    // sorting twice gives the same permutation
    let once = store.atoms().to_vec();
    store.sort_atoms(0, "up").unwrap();
    assert_eq!(store.atoms(), once.as_slice());

    assert_eq!(SortDirection::from("sideways"), SortDirection::Down);
    store.sort_atoms(0, "sideways").unwrap();
    let ids: Vec<i32> = store.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![0, 2, 1]);

    assert!(matches!(
        store.sort_atoms(4, "up"),
        Err(AtomError::UnknownSortAxis(4))
    ));
}

#[test]
fn test_spatial_sort_is_a_permutation() {
    let mut points = Vec::new();
    for i in 0..6 {
        for j in 0..6 {
            points.push([i as f64, j as f64, ((i * j) % 3) as f64]);
        }
    }
    let mut store = store_from(&points);
    store.sort_spatial();
    assert_eq!(store.size(), points.len());

    store.sort_by_id();
    for (i, atom) in store.iter().enumerate() {
        assert_eq!(atom.id, i as i32);
        assert_eq!(atom.point, Point3::from(points[i]));
    }
}

#[test]
fn test_probe_all() {
    let store = store_from(&[[3.0, 4.0, 0.0], [0.0, 0.0, 2.0]]);
    let distance = |p: &Point3<f64>| p.coords.norm();
    let values = store.probe_all(&distance);
    assert_eq!(values.len(), 2);
    assert_relative_eq!(values[0], 5.0);
    assert_relative_eq!(values[1], 2.0);
}
