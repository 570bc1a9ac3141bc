use crate::atom::{Atom, UNSET_MARKER};
use crate::cell::CellIndex;
use crate::config;
use crate::error::{AtomError, Result};
use crate::probe::FieldProbe;
use crate::search::NeighborList;
use crate::sort::{self, SortAxis, SortDirection};
use crate::stats::{SimulationBox, Sizes};
use nalgebra::{Point2, Point3};
use rayon::prelude::*;
use std::ops::AddAssign;
use tracing::{debug, info_span};

/// Ordered, index-addressable collection of atoms.
///
/// Slots are dense in `[0, size())`. Statistics are recomputed only by
/// [`calc_statistics`](Self::calc_statistics) and go stale after any
/// mutation; the linked-list cells are dropped by every mutation that moves,
/// adds, removes or reorders atoms.
#[derive(Clone, Debug, Default)]
pub struct AtomStore {
    atoms: Vec<Atom>,
    sizes: Sizes,
    sim_box: Option<SimulationBox>,
    cells: Option<CellIndex>,
}

impl AtomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store with room for `n_atoms`.
    pub fn with_capacity(n_atoms: usize) -> Self {
        let mut store = Self::new();
        store.reserve(n_atoms);
        store
    }

    /// Discards all atoms and allocates room for exactly `n_atoms`.
    pub fn reserve(&mut self, n_atoms: usize) {
        self.atoms = Vec::with_capacity(n_atoms);
        self.cells = None;
    }

    /// Grows or shrinks to `n_atoms`, keeping the existing prefix. New slots
    /// hold an atom at the origin whose id is its slot index (saturating at
    /// `i32::MAX`).
    pub fn resize(&mut self, n_atoms: usize) {
        let old = self.atoms.len();
        if n_atoms <= old {
            self.atoms.truncate(n_atoms);
        } else {
            self.atoms.extend((old..n_atoms).map(|i| Atom {
                id: slot_id(i),
                ..Atom::default()
            }));
        }
        self.cells = None;
    }

    pub fn append(&mut self, atom: Atom) {
        self.atoms.push(atom);
        self.cells = None;
    }

    /// Appends a point with id equal to its slot index and an unset marker.
    /// Slots past `i32::MAX` all get the id `i32::MAX`.
    pub fn append_point(&mut self, point: Point3<f64>) {
        let id = slot_id(self.atoms.len());
        self.append(Atom::new(id, point, UNSET_MARKER));
    }

    /// Appends every atom of `other`, ids and markers included.
    pub fn merge(&mut self, other: &AtomStore) {
        self.atoms.extend_from_slice(&other.atoms);
        self.cells = None;
    }

    pub fn size(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Atom> {
        self.atoms.iter()
    }

    fn slot(&self, i: usize) -> Result<&Atom> {
        self.atoms.get(i).ok_or(AtomError::IndexOutOfRange {
            index: i,
            len: self.atoms.len(),
        })
    }

    fn slot_mut(&mut self, i: usize) -> Result<&mut Atom> {
        let len = self.atoms.len();
        self.atoms
            .get_mut(i)
            .ok_or(AtomError::IndexOutOfRange { index: i, len })
    }

    pub fn atom(&self, i: usize) -> Result<Atom> {
        self.slot(i).copied()
    }

    pub fn id(&self, i: usize) -> Result<i32> {
        Ok(self.slot(i)?.id)
    }

    pub fn point(&self, i: usize) -> Result<Point3<f64>> {
        Ok(self.slot(i)?.point)
    }

    /// The (x, y) projection of the i-th atom.
    pub fn point2(&self, i: usize) -> Result<Point2<f64>> {
        let p = self.slot(i)?.point;
        Ok(Point2::new(p.x, p.y))
    }

    pub fn x(&self, i: usize) -> Result<f64> {
        Ok(self.slot(i)?.point.x)
    }

    pub fn y(&self, i: usize) -> Result<f64> {
        Ok(self.slot(i)?.point.y)
    }

    pub fn z(&self, i: usize) -> Result<f64> {
        Ok(self.slot(i)?.point.z)
    }

    pub fn marker(&self, i: usize) -> Result<i32> {
        Ok(self.slot(i)?.marker)
    }

    pub fn set_atom(&mut self, i: usize, atom: Atom) -> Result<()> {
        *self.slot_mut(i)? = atom;
        self.cells = None;
        Ok(())
    }

    pub fn set_id(&mut self, i: usize, id: i32) -> Result<()> {
        self.slot_mut(i)?.id = id;
        Ok(())
    }

    pub fn set_point(&mut self, i: usize, point: Point3<f64>) -> Result<()> {
        self.slot_mut(i)?.point = point;
        self.cells = None;
        Ok(())
    }

    pub fn set_x(&mut self, i: usize, x: f64) -> Result<()> {
        self.slot_mut(i)?.point.x = x;
        self.cells = None;
        Ok(())
    }

    pub fn set_y(&mut self, i: usize, y: f64) -> Result<()> {
        self.slot_mut(i)?.point.y = y;
        self.cells = None;
        Ok(())
    }

    pub fn set_z(&mut self, i: usize, z: f64) -> Result<()> {
        self.slot_mut(i)?.point.z = z;
        self.cells = None;
        Ok(())
    }

    pub fn set_marker(&mut self, i: usize, marker: i32) -> Result<()> {
        self.slot_mut(i)?.marker = marker;
        Ok(())
    }

    /// Copies every point of `other` into the matching slot of this store,
    /// leaving ids and markers alone.
    pub fn update_positions(&mut self, other: &AtomStore) -> Result<()> {
        if other.size() != self.size() {
            return Err(AtomError::SizeMismatch {
                expected: self.size(),
                found: other.size(),
            });
        }
        for (atom, src) in self.atoms.iter_mut().zip(&other.atoms) {
            atom.point = src.point;
        }
        self.cells = None;
        Ok(())
    }

    // Statistics

    /// Seeds the simulation box. The next [`calc_statistics`](Self::calc_statistics)
    /// reports a box covering both this seed and the atoms.
    pub fn set_simulation_box(&mut self, sim_box: SimulationBox) {
        self.sim_box = Some(sim_box);
    }

    pub fn clear_simulation_box(&mut self) {
        self.sim_box = None;
    }

    pub fn calc_statistics(&mut self) {
        self.sizes = Sizes::compute(&self.atoms, self.sim_box.as_ref());
    }

    pub fn copy_statistics(&mut self, other: &AtomStore) {
        self.sizes = other.sizes;
    }

    /// Last computed (or copied) statistics; not refreshed automatically.
    pub fn sizes(&self) -> &Sizes {
        &self.sizes
    }

    // Spatial indexing

    /// Recomputes the statistics and rebuilds the linked-list cells for `r_cut`.
    pub fn calc_linked_list(&mut self, r_cut: f64) -> Result<()> {
        self.calc_statistics();
        let cells = CellIndex::build(&self.atoms, &self.sizes, r_cut)?;
        self.cells = Some(cells);
        Ok(())
    }

    /// Linked-list cells from the last [`calc_linked_list`](Self::calc_linked_list),
    /// if no mutation has discarded them since.
    pub fn cell_index(&self) -> Option<&CellIndex> {
        self.cells.as_ref()
    }

    /// Neighbor list of every atom within `r_cut`. Requires linked-list
    /// cells built for the same cutoff. Large stores are searched on the
    /// rayon pool.
    pub fn calc_verlet_nborlist(&self, r_cut: f64, periodic: bool) -> Result<NeighborList> {
        let cells = self.cells.as_ref().ok_or(AtomError::MissingCellIndex)?;
        if self.atoms.len() >= config::get_parallel_threshold() {
            cells.par_verlet_nborlist(&self.atoms, r_cut, periodic)
        } else {
            cells.verlet_nborlist(&self.atoms, r_cut, periodic)
        }
    }

    // Sorting

    /// Sorts along axis `coord` (0 = x, 1 = y, 2 = z, 3 = radial); see
    /// [`SortDirection`] for how `direction` is read.
    pub fn sort_atoms(&mut self, coord: usize, direction: &str) -> Result<()> {
        let axis = SortAxis::try_from(coord)?;
        sort::sort_by_axis(&mut self.atoms, axis, SortDirection::from(direction));
        self.cells = None;
        Ok(())
    }

    /// Sorts by `x1`, breaking ties by `x2`.
    pub fn sort_atoms_by(&mut self, x1: usize, x2: usize, direction: &str) -> Result<()> {
        let primary = SortAxis::try_from(x1)?;
        let secondary = SortAxis::try_from(x2)?;
        sort::sort_by_axes(
            &mut self.atoms,
            primary,
            secondary,
            SortDirection::from(direction),
        );
        self.cells = None;
        Ok(())
    }

    pub fn sort_spatial(&mut self) {
        sort::sort_spatial(&mut self.atoms);
        self.cells = None;
    }

    pub fn sort_by_id(&mut self) {
        sort::sort_by_id(&mut self.atoms);
        self.cells = None;
    }

    // External field

    /// Evaluates `probe` at every atom, in storage order.
    pub fn probe_all<P: FieldProbe>(&self, probe: &P) -> Vec<P::Value> {
        let _span = info_span!("AtomStore::probe_all", n_atoms = self.atoms.len()).entered();
        let values: Vec<P::Value> = self.atoms.par_iter().map(|a| probe.probe(&a.point)).collect();
        debug!(n_values = values.len(), "field probed");
        values
    }
}

/// Default id for slot `i`, saturating at `i32::MAX`.
fn slot_id(i: usize) -> i32 {
    i32::try_from(i).unwrap_or(i32::MAX)
}

impl AddAssign<&AtomStore> for AtomStore {
    fn add_assign(&mut self, other: &AtomStore) {
        self.merge(other);
    }
}

impl Extend<Atom> for AtomStore {
    fn extend<T: IntoIterator<Item = Atom>>(&mut self, iter: T) {
        self.atoms.extend(iter);
        self.cells = None;
    }
}

impl FromIterator<Atom> for AtomStore {
    fn from_iter<T: IntoIterator<Item = Atom>>(iter: T) -> Self {
        Self {
            atoms: iter.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl<'a> IntoIterator for &'a AtomStore {
    type Item = &'a Atom;
    type IntoIter = std::slice::Iter<'a, Atom>;

    fn into_iter(self) -> Self::IntoIter {
        self.atoms.iter()
    }
}
