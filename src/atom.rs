use nalgebra::Point3;

/// Marker given to atoms whose marker has not been assigned by the caller.
pub const UNSET_MARKER: i32 = -1;

/// A labeled point: external id, position and an opaque integer tag.
///
/// The id is not required to be unique; an atom's identity inside an
/// [`AtomStore`](crate::AtomStore) is its slot index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Atom {
    pub id: i32,
    pub point: Point3<f64>,
    pub marker: i32,
}

impl Atom {
    pub fn new(id: i32, point: Point3<f64>, marker: i32) -> Self {
        Self { id, point, marker }
    }

    pub fn distance_squared(&self, other: &Atom) -> f64 {
        nalgebra::distance_squared(&self.point, &other.point)
    }
}

impl Default for Atom {
    fn default() -> Self {
        Self {
            id: 0,
            point: Point3::origin(),
            marker: UNSET_MARKER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance_squared() {
        let a = Atom::new(1, Point3::new(0.0, 0.0, 0.0), 0);
        let b = Atom::new(2, Point3::new(1.0, 2.0, 2.0), 0);
        assert_relative_eq!(a.distance_squared(&b), 9.0);
        assert_relative_eq!(b.distance_squared(&a), 9.0);
    }

    #[test]
    fn test_default_marker_is_unset() {
        assert_eq!(Atom::default().marker, UNSET_MARKER);
    }
}
