use crate::error::{AtomError, Result};
use nalgebra::{Point3, Vector3};

/// Orthorhombic simulation box with per-axis periodicity.
///
/// Axes of zero length are never periodic, whatever flag was requested.
#[derive(Clone, Debug, PartialEq)]
pub struct PeriodicBox {
    lo: Point3<f64>,
    lengths: Vector3<f64>,
    pbc: Vector3<bool>,
}

impl PeriodicBox {
    pub fn new(lo: Point3<f64>, hi: Point3<f64>, pbc: Vector3<bool>) -> Result<Self> {
        let lengths = hi - lo;
        if !lo.iter().all(|v| v.is_finite()) || !lengths.iter().all(|v| v.is_finite() && *v >= 0.0)
        {
            return Err(AtomError::InvalidBox);
        }
        let pbc = Vector3::new(
            pbc.x && lengths.x > 0.0,
            pbc.y && lengths.y > 0.0,
            pbc.z && lengths.z > 0.0,
        );
        Ok(Self { lo, lengths, pbc })
    }

    /// Box without any periodic axis; distances are plain Euclidean.
    pub fn open(lo: Point3<f64>, hi: Point3<f64>) -> Result<Self> {
        Self::new(lo, hi, Vector3::new(false, false, false))
    }

    pub fn lo(&self) -> &Point3<f64> {
        &self.lo
    }

    pub fn lengths(&self) -> &Vector3<f64> {
        &self.lengths
    }

    pub fn pbc(&self) -> &Vector3<bool> {
        &self.pbc
    }

    pub fn is_periodic(&self) -> bool {
        self.pbc.iter().any(|&p| p)
    }

    /// Position relative to `lo` in units of the box lengths. Zero-length
    /// axes map to 0.
    pub fn to_fractional(&self, p: &Point3<f64>) -> Vector3<f64> {
        let d = p - self.lo;
        Vector3::from_fn(|k, _| {
            if self.lengths[k] > 0.0 {
                d[k] / self.lengths[k]
            } else {
                0.0
            }
        })
    }

    /// Folds `p` back into the box along periodic axes.
    pub fn wrap(&self, p: &Point3<f64>) -> Point3<f64> {
        let frac = self.to_fractional(p);
        let mut wrapped = *p;
        for k in 0..3 {
            if self.pbc[k] {
                wrapped[k] -= frac[k].floor() * self.lengths[k];
            }
        }
        wrapped
    }

    /// Minimum-image displacement from `r_i` to `r_j`, together with the
    /// number of box lengths the image of `r_j` was shifted by on each axis.
    pub fn shift_and_displacement(
        &self,
        r_i: &Point3<f64>,
        r_j: &Point3<f64>,
    ) -> (Vector3<i32>, Vector3<f64>) {
        let mut disp = r_j - r_i;
        let mut shift = Vector3::zeros();
        for k in 0..3 {
            if self.pbc[k] {
                let s = -(disp[k] / self.lengths[k]).round();
                disp[k] += s * self.lengths[k];
                shift[k] = s as i32;
            }
        }
        (shift, disp)
    }

    pub fn distance_squared(&self, r_i: &Point3<f64>, r_j: &Point3<f64>) -> f64 {
        self.shift_and_displacement(r_i, r_j).1.norm_squared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cube(l: f64, pbc: [bool; 3]) -> PeriodicBox {
        PeriodicBox::new(
            Point3::origin(),
            Point3::new(l, l, l),
            Vector3::new(pbc[0], pbc[1], pbc[2]),
        )
        .unwrap()
    }

    #[test]
    fn test_fractional() {
        let b = PeriodicBox::open(Point3::new(1.0, 1.0, 1.0), Point3::new(11.0, 11.0, 1.0)).unwrap();
        let frac = b.to_fractional(&Point3::new(6.0, 3.0, 1.0));
        assert_relative_eq!(frac.x, 0.5);
        assert_relative_eq!(frac.y, 0.2);
        // zero-length axis
        assert_relative_eq!(frac.z, 0.0);
    }

    #[test]
    fn test_invalid_box() {
        assert!(PeriodicBox::open(Point3::new(1.0, 0.0, 0.0), Point3::origin()).is_err());
        assert!(PeriodicBox::open(Point3::origin(), Point3::new(f64::INFINITY, 1.0, 1.0)).is_err());
    }

    #[test]
    fn test_zero_length_axis_not_periodic() {
        let b = PeriodicBox::new(
            Point3::origin(),
            Point3::new(10.0, 10.0, 0.0),
            Vector3::new(true, true, true),
        )
        .unwrap();
        assert_eq!(b.pbc(), &Vector3::new(true, true, false));
    }

    #[test]
    fn test_wrapping() {
        let b = cube(10.0, [true, true, true]);
        let wrapped = b.wrap(&Point3::new(15.0, -2.0, 8.0));
        assert_relative_eq!(wrapped.x, 5.0);
        assert_relative_eq!(wrapped.y, 8.0);
        assert_relative_eq!(wrapped.z, 8.0);
    }

    #[test]
    fn test_mixed_pbc_wrapping() {
        let b = cube(10.0, [true, false, false]);
        let wrapped = b.wrap(&Point3::new(15.0, 15.0, 15.0));
        assert_relative_eq!(wrapped.x, 5.0);
        assert_relative_eq!(wrapped.y, 15.0);
        assert_relative_eq!(wrapped.z, 15.0);
    }

    #[test]
    fn test_minimum_image() {
        let b = cube(10.0, [true, true, true]);
        let (shift, disp) =
            b.shift_and_displacement(&Point3::new(1.0, 1.0, 1.0), &Point3::new(9.0, 9.0, 9.0));

        assert_eq!(shift, Vector3::new(-1, -1, -1));
        assert_relative_eq!(disp.x, -2.0);
        assert_relative_eq!(disp.y, -2.0);
        assert_relative_eq!(disp.z, -2.0);
    }

    #[test]
    fn test_mixed_pbc_minimum_image() {
        let b = cube(10.0, [true, false, false]);
        let (shift, disp) =
            b.shift_and_displacement(&Point3::new(1.0, 1.0, 1.0), &Point3::new(9.0, 9.0, 9.0));

        assert_eq!(shift, Vector3::new(-1, 0, 0));
        assert_relative_eq!(disp.x, -2.0);
        assert_relative_eq!(disp.y, 8.0);
        assert_relative_eq!(disp.z, 8.0);
        assert!(b.is_periodic());
        assert!(!cube(10.0, [false, false, false]).is_periodic());
    }
}
