//! Linked-list cells: a uniform grid over the simulation box where every
//! cell owns an intrusive singly-linked chain of atom indices.
//!
//! The chains live in two flat arrays. `head[cell]` is the first atom of a
//! cell and `list[i]` is the atom following `i` in the same cell, so building
//! the index is a single O(N) pass with no per-atom allocation.

use crate::atom::Atom;
use crate::boundary::PeriodicBox;
use crate::config;
use crate::error::{AtomError, Result};
use crate::stats::Sizes;
use nalgebra::{Point3, Vector3};
use tracing::{debug, info_span};

/// End-of-chain marker in `head` and `list`.
const EMPTY: usize = usize::MAX;

pub(crate) fn check_cutoff(r_cut: f64) -> Result<()> {
    if !r_cut.is_finite() || r_cut <= 0.0 {
        return Err(AtomError::InvalidCutoff(r_cut));
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct CellIndex {
    r_cut: f64,
    /// Number of cells along x, y and z.
    nborbox_size: [usize; 3],
    lo: Point3<f64>,
    lengths: Vector3<f64>,
    cell_width: Vector3<f64>,
    head: Vec<usize>,
    list: Vec<usize>,
    /// Cell coordinates of every atom.
    nborbox_indices: Vec<[usize; 3]>,
}

impl CellIndex {
    /// Bins `atoms` into cells of at least `r_cut` on a side spanning the
    /// simulation box recorded in `sizes`.
    ///
    /// An axis shorter than `r_cut` (including a zero-width one) collapses to
    /// a single cell. Atoms outside the box are clamped into the boundary
    /// cells. A grid of more than [`config::get_max_cells`] cells, or one
    /// whose `head` array cannot be allocated, is `GridTooLarge`.
    pub fn build(atoms: &[Atom], sizes: &Sizes, r_cut: f64) -> Result<Self> {
        let _span = info_span!("CellIndex::build", n_atoms = atoms.len(), r_cut).entered();
        check_cutoff(r_cut)?;

        let lo = sizes.box_lo();
        let lengths = sizes.box_hi() - lo;

        let mut nborbox_size = [1usize; 3];
        for (k, n) in nborbox_size.iter_mut().enumerate() {
            // `as` saturates, so absurdly small cutoffs surface as GridTooLarge below
            *n = ((lengths[k] / r_cut).floor() as usize).max(1);
        }
        let [nx, ny, nz] = nborbox_size;
        let total_cells = nx
            .checked_mul(ny)
            .and_then(|c| c.checked_mul(nz))
            .filter(|&c| c <= config::get_max_cells())
            .ok_or(AtomError::GridTooLarge { nx, ny, nz })?;

        let mut head = Vec::new();
        head.try_reserve_exact(total_cells)
            .map_err(|_| AtomError::GridTooLarge { nx, ny, nz })?;
        head.resize(total_cells, EMPTY);

        let cell_width = Vector3::new(
            lengths.x / nx as f64,
            lengths.y / ny as f64,
            lengths.z / nz as f64,
        );

        let mut index = Self {
            r_cut,
            nborbox_size,
            lo,
            lengths,
            cell_width,
            head,
            list: vec![EMPTY; atoms.len()],
            nborbox_indices: Vec::with_capacity(atoms.len()),
        };

        for (i, atom) in atoms.iter().enumerate() {
            let c = index.bin(&atom.point);
            let cell = index.linear_index(c[0], c[1], c[2]);
            index.list[i] = index.head[cell];
            index.head[cell] = i;
            index.nborbox_indices.push(c);
        }

        debug!(nx, ny, nz, total_cells, "linked-list cells built");
        Ok(index)
    }

    /// Cell coordinates of an arbitrary point, clamped into the grid.
    pub fn bin(&self, p: &Point3<f64>) -> [usize; 3] {
        let mut c = [0usize; 3];
        for (k, ck) in c.iter_mut().enumerate() {
            let n = self.nborbox_size[k];
            if n > 1 && self.cell_width[k] > 0.0 {
                let f = ((p[k] - self.lo[k]) / self.cell_width[k]).floor();
                // NaN falls through to cell 0
                *ck = if f > 0.0 {
                    (f as usize).min(n - 1)
                } else {
                    0
                };
            }
        }
        c
    }

    pub fn linear_index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        let [nx, ny, _] = self.nborbox_size;
        (iz * ny + iy) * nx + ix
    }

    /// Atom indices chained in cell `(ix, iy, iz)`; empty when out of range.
    pub fn atoms_in_cell(&self, ix: usize, iy: usize, iz: usize) -> Chain<'_> {
        let [nx, ny, nz] = self.nborbox_size;
        if ix >= nx || iy >= ny || iz >= nz {
            return Chain {
                list: &self.list,
                next: EMPTY,
            };
        }
        self.chain(self.linear_index(ix, iy, iz))
    }

    pub(crate) fn chain(&self, cell: usize) -> Chain<'_> {
        Chain {
            list: &self.list,
            next: self.head[cell],
        }
    }

    pub fn cell_of(&self, atom: usize) -> Option<[usize; 3]> {
        self.nborbox_indices.get(atom).copied()
    }

    pub(crate) fn cell_coords(&self) -> &[[usize; 3]] {
        &self.nborbox_indices
    }

    pub fn r_cut(&self) -> f64 {
        self.r_cut
    }

    pub fn nborbox_size(&self) -> [usize; 3] {
        self.nborbox_size
    }

    pub fn num_cells(&self) -> usize {
        self.head.len()
    }

    /// Number of atoms indexed.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// The box the grid spans, periodic on every non-degenerate axis when
    /// `periodic` is set.
    pub fn periodic_box(&self, periodic: bool) -> Result<PeriodicBox> {
        let hi = self.lo + self.lengths;
        PeriodicBox::new(self.lo, hi, Vector3::new(periodic, periodic, periodic))
    }
}

/// Iterator over one cell's chain. Yields atoms in reverse insertion order,
/// which callers must not rely on.
#[derive(Clone, Debug)]
pub struct Chain<'a> {
    list: &'a [usize],
    next: usize,
}

impl Iterator for Chain<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.next == EMPTY {
            return None;
        }
        let i = self.next;
        self.next = self.list[i];
        Some(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atoms(points: &[[f64; 3]]) -> Vec<Atom> {
        points
            .iter()
            .enumerate()
            .map(|(i, p)| Atom::new(i as i32, Point3::new(p[0], p[1], p[2]), 0))
            .collect()
    }

    #[test]
    fn test_cell_list_structure() {
        let a = atoms(&[
            [0.0, 0.0, 0.0], // cell [0, 0, 0]
            [9.0, 9.0, 9.0], // cell [2, 2, 2]
            [0.1, 0.1, 0.1], // cell [0, 0, 0]
        ]);
        let sizes = Sizes::compute(&a, None);
        let cells = CellIndex::build(&a, &sizes, 3.0).unwrap();

        assert_eq!(cells.nborbox_size(), [3, 3, 3]);
        assert_eq!(cells.num_cells(), 27);

        let mut cell0: Vec<usize> = cells.atoms_in_cell(0, 0, 0).collect();
        cell0.sort();
        assert_eq!(cell0, vec![0, 2]);

        let cell2: Vec<usize> = cells.atoms_in_cell(2, 2, 2).collect();
        assert_eq!(cell2, vec![1]);

        assert_eq!(cells.atoms_in_cell(1, 1, 1).count(), 0);
        assert_eq!(cells.atoms_in_cell(3, 0, 0).count(), 0);
    }

    #[test]
    fn test_chains_partition_atoms() {
        let mut points = Vec::new();
        for i in 0..7 {
            for j in 0..5 {
                points.push([i as f64 * 0.7, j as f64 * 1.3, (i * j) as f64 * 0.1]);
            }
        }
        let a = atoms(&points);
        let sizes = Sizes::compute(&a, None);
        let cells = CellIndex::build(&a, &sizes, 1.0).unwrap();

        let mut seen = vec![0usize; a.len()];
        for cell in 0..cells.num_cells() {
            for i in cells.chain(cell) {
                seen[i] += 1;
            }
        }
        assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_chain_is_reverse_insertion_order() {
        let a = atoms(&[[0.0, 0.0, 0.0], [0.1, 0.0, 0.0], [0.2, 0.0, 0.0]]);
        let sizes = Sizes::compute(&a, None);
        let cells = CellIndex::build(&a, &sizes, 1.0).unwrap();
        let chain: Vec<usize> = cells.atoms_in_cell(0, 0, 0).collect();
        assert_eq!(chain, vec![2, 1, 0]);
    }

    #[test]
    fn test_degenerate_axes_collapse() {
        // all atoms in the z = 0 plane, extent along y smaller than r_cut
        let a = atoms(&[[0.0, 0.0, 0.0], [10.0, 0.5, 0.0]]);
        let sizes = Sizes::compute(&a, None);
        let cells = CellIndex::build(&a, &sizes, 2.0).unwrap();
        assert_eq!(cells.nborbox_size(), [5, 1, 1]);
        assert_eq!(cells.cell_of(0), Some([0, 0, 0]));
        // the atom on the upper face is clamped into the last cell
        assert_eq!(cells.cell_of(1), Some([4, 0, 0]));
        assert_eq!(cells.cell_of(2), None);
    }

    #[test]
    fn test_out_of_box_points_are_clamped() {
        let a = atoms(&[[0.0, 0.0, 0.0], [4.0, 4.0, 4.0]]);
        let sizes = Sizes::compute(&a, None);
        let cells = CellIndex::build(&a, &sizes, 1.0).unwrap();
        assert_eq!(cells.bin(&Point3::new(-5.0, 2.5, 100.0)), [0, 2, 3]);
        assert_eq!(cells.bin(&Point3::new(f64::NAN, 0.0, 0.0)), [0, 0, 0]);
    }

    #[test]
    fn test_empty_and_single_atom() {
        let empty: Vec<Atom> = Vec::new();
        let cells = CellIndex::build(&empty, &Sizes::compute(&empty, None), 1.0).unwrap();
        assert!(cells.is_empty());
        assert_eq!(cells.nborbox_size(), [1, 1, 1]);

        let one = atoms(&[[3.0, 3.0, 3.0]]);
        let cells = CellIndex::build(&one, &Sizes::compute(&one, None), 1.0).unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells.atoms_in_cell(0, 0, 0).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_invalid_cutoff() {
        let a = atoms(&[[0.0, 0.0, 0.0]]);
        let sizes = Sizes::compute(&a, None);
        for r_cut in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                CellIndex::build(&a, &sizes, r_cut),
                Err(AtomError::InvalidCutoff(_))
            ));
        }
    }

    #[test]
    fn test_grid_too_large() {
        let a = atoms(&[[0.0, 0.0, 0.0], [1.0e12, 1.0e12, 1.0e12]]);
        let sizes = Sizes::compute(&a, None);
        assert!(matches!(
            CellIndex::build(&a, &sizes, 1.0e-6),
            Err(AtomError::GridTooLarge { .. })
        ));
    }

    #[test]
    fn test_sparse_grid_rejected_without_allocating() {
        // 1e6 cells per axis for two atoms
        let a = atoms(&[[0.0, 0.0, 0.0], [1.0e4, 1.0e4, 1.0e4]]);
        let sizes = Sizes::compute(&a, None);
        assert!(matches!(
            CellIndex::build(&a, &sizes, 0.01),
            Err(AtomError::GridTooLarge {
                nx: 1_000_000,
                ny: 1_000_000,
                nz: 1_000_000
            })
        ));
        // a coarser cutoff on the same store is fine
        let cells = CellIndex::build(&a, &sizes, 1.0e3).unwrap();
        assert_eq!(cells.nborbox_size(), [10, 10, 10]);
    }
}
