use nalgebra::Point3;

/// A field evaluated at arbitrary points, e.g. the potential or electric
/// field produced by an external PDE solver.
///
/// Implementations must be `Sync` so atoms can be probed in parallel.
pub trait FieldProbe: Sync {
    type Value: Send;

    fn probe(&self, point: &Point3<f64>) -> Self::Value;
}

impl<F, V> FieldProbe for F
where
    F: Fn(&Point3<f64>) -> V + Sync,
    V: Send,
{
    type Value = V;

    fn probe(&self, point: &Point3<f64>) -> V {
        self(point)
    }
}
