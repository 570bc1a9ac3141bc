use crate::atom::Atom;
use crate::error::{AtomError, Result};
use nalgebra::Point3;
use tracing::info_span;

/// Axis-aligned simulation box a caller may impose on top of the atom cloud.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationBox {
    lo: Point3<f64>,
    hi: Point3<f64>,
}

impl SimulationBox {
    pub fn new(lo: Point3<f64>, hi: Point3<f64>) -> Result<Self> {
        let finite = lo.iter().chain(hi.iter()).all(|v| v.is_finite());
        if !finite || (0..3).any(|k| lo[k] > hi[k]) {
            return Err(AtomError::InvalidBox);
        }
        Ok(Self { lo, hi })
    }

    pub fn lo(&self) -> &Point3<f64> {
        &self.lo
    }

    pub fn hi(&self) -> &Point3<f64> {
        &self.hi
    }
}

/// Extents of the atom cloud and of the simulation box around it.
///
/// `*min`/`*max` bound the atoms only. `*minbox`/`*maxbox` bound the
/// simulation box, which contains the atoms but may be wider when a
/// [`SimulationBox`] was seeded. `xbox`, `ybox` and `zbox` are the box lengths.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sizes {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub zmin: f64,
    pub zmax: f64,
    pub xminbox: f64,
    pub xmaxbox: f64,
    pub yminbox: f64,
    pub ymaxbox: f64,
    pub zminbox: f64,
    pub zmaxbox: f64,
    pub xbox: f64,
    pub ybox: f64,
    pub zbox: f64,
    pub xmean: f64,
    pub ymean: f64,
    pub zmean: f64,
    pub xmid: f64,
    pub ymid: f64,
    pub zmid: f64,
}

impl Sizes {
    /// Single pass over `atoms`. With no atoms every atom statistic is zero
    /// and the box is the seed (or empty at the origin).
    pub fn compute(atoms: &[Atom], seed: Option<&SimulationBox>) -> Self {
        let _span = info_span!("Sizes::compute", n_atoms = atoms.len()).entered();

        let mut sizes = Sizes::default();
        if !atoms.is_empty() {
            let mut min = Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
            let mut max = Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
            let mut sum = [0.0f64; 3];
            for atom in atoms {
                for k in 0..3 {
                    let v = atom.point[k];
                    min[k] = min[k].min(v);
                    max[k] = max[k].max(v);
                    sum[k] += v;
                }
            }
            let n = atoms.len() as f64;

            sizes.xmin = min.x;
            sizes.xmax = max.x;
            sizes.ymin = min.y;
            sizes.ymax = max.y;
            sizes.zmin = min.z;
            sizes.zmax = max.z;
            sizes.xmean = sum[0] / n;
            sizes.ymean = sum[1] / n;
            sizes.zmean = sum[2] / n;
            sizes.xmid = 0.5 * (min.x + max.x);
            sizes.ymid = 0.5 * (min.y + max.y);
            sizes.zmid = 0.5 * (min.z + max.z);
        }

        let (mut lo, mut hi) = match (seed, atoms.is_empty()) {
            (Some(b), true) => (*b.lo(), *b.hi()),
            (Some(b), false) => (
                Point3::new(
                    b.lo().x.min(sizes.xmin),
                    b.lo().y.min(sizes.ymin),
                    b.lo().z.min(sizes.zmin),
                ),
                Point3::new(
                    b.hi().x.max(sizes.xmax),
                    b.hi().y.max(sizes.ymax),
                    b.hi().z.max(sizes.zmax),
                ),
            ),
            (None, _) => (
                Point3::new(sizes.xmin, sizes.ymin, sizes.zmin),
                Point3::new(sizes.xmax, sizes.ymax, sizes.zmax),
            ),
        };
        // All-NaN coordinates leave the extents at +/-inf.
        for k in 0..3 {
            if !lo[k].is_finite() || !hi[k].is_finite() || lo[k] > hi[k] {
                lo[k] = 0.0;
                hi[k] = 0.0;
            }
        }

        sizes.xminbox = lo.x;
        sizes.xmaxbox = hi.x;
        sizes.yminbox = lo.y;
        sizes.ymaxbox = hi.y;
        sizes.zminbox = lo.z;
        sizes.zmaxbox = hi.z;
        sizes.xbox = hi.x - lo.x;
        sizes.ybox = hi.y - lo.y;
        sizes.zbox = hi.z - lo.z;
        sizes
    }

    pub fn box_lo(&self) -> Point3<f64> {
        Point3::new(self.xminbox, self.yminbox, self.zminbox)
    }

    pub fn box_hi(&self) -> Point3<f64> {
        Point3::new(self.xmaxbox, self.ymaxbox, self.zmaxbox)
    }
}
