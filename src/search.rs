use crate::atom::Atom;
use crate::boundary::PeriodicBox;
use crate::cell::{CellIndex, check_cutoff};
use crate::config;
use crate::error::{AtomError, Result};
use nalgebra::Vector3;
use rayon::prelude::*;
use tracing::{debug, info_span};

/// Per-atom neighbor indices. `nborlist[a]` holds every atom within the
/// cutoff of atom `a`, excluding `a` itself, in traversal order.
pub type NeighborList = Vec<Vec<usize>>;

impl CellIndex {
    fn ensure_compatible(&self, atoms: &[Atom], r_cut: f64) -> Result<()> {
        check_cutoff(r_cut)?;
        if r_cut != self.r_cut() {
            return Err(AtomError::CutoffMismatch {
                built: self.r_cut(),
                requested: r_cut,
            });
        }
        if atoms.len() != self.len() {
            return Err(AtomError::StaleCellIndex {
                built: self.len(),
                current: atoms.len(),
            });
        }
        Ok(())
    }

    /// Verlet neighbor list over the linked-list cells.
    ///
    /// Every atom visits its own cell and the adjacent ones. Without
    /// periodicity cells past the grid edge are skipped; with it they wrap
    /// around and the nearest periodic image decides whether a pair is
    /// within `r_cut`.
    pub fn verlet_nborlist(
        &self,
        atoms: &[Atom],
        r_cut: f64,
        periodic: bool,
    ) -> Result<NeighborList> {
        let _span = info_span!("CellIndex::verlet_nborlist", n_atoms = atoms.len(), periodic)
            .entered();
        self.ensure_compatible(atoms, r_cut)?;
        let pbox = self.periodic_box(periodic)?;
        let r_cut2 = r_cut * r_cut;

        let mut nborlist = Vec::with_capacity(atoms.len());
        for a in 0..atoms.len() {
            let mut nbors = Vec::new();
            self.search_atom_neighbors(a, atoms, &pbox, r_cut2, &mut nbors);
            nborlist.push(nbors);
        }
        debug!(
            n_pairs = nborlist.iter().map(Vec::len).sum::<usize>(),
            "neighbor list built"
        );
        Ok(nborlist)
    }

    /// Same result as [`verlet_nborlist`](Self::verlet_nborlist), with atoms
    /// split across the rayon pool. Each worker fills only its own atoms'
    /// lists; the cell index is shared read-only.
    pub fn par_verlet_nborlist(
        &self,
        atoms: &[Atom],
        r_cut: f64,
        periodic: bool,
    ) -> Result<NeighborList> {
        let _span = info_span!(
            "CellIndex::par_verlet_nborlist",
            n_atoms = atoms.len(),
            periodic
        )
        .entered();
        self.ensure_compatible(atoms, r_cut)?;
        let pbox = self.periodic_box(periodic)?;
        let r_cut2 = r_cut * r_cut;

        let n_atoms = atoms.len();
        let num_threads = rayon::current_num_threads();
        let min_len = (n_atoms / (num_threads * config::PARALLEL_TASKS_PER_THREAD)).max(1);

        let nborlist: NeighborList = (0..n_atoms)
            .into_par_iter()
            .with_min_len(min_len)
            .map(|a| {
                let mut nbors = Vec::new();
                self.search_atom_neighbors(a, atoms, &pbox, r_cut2, &mut nbors);
                nbors
            })
            .collect();
        debug!(
            n_pairs = nborlist.iter().map(Vec::len).sum::<usize>(),
            "neighbor list built"
        );
        Ok(nborlist)
    }

    /// Calls `f(i, j, disp, r2)` once for every unordered pair `i < j` closer
    /// than `r_cut`, where `disp` points from atom `i` to atom `j`. Boundaries
    /// are never periodic here.
    pub fn for_each_pair<F>(&self, atoms: &[Atom], r_cut: f64, mut f: F) -> Result<()>
    where
        F: FnMut(usize, usize, Vector3<f64>, f64),
    {
        let _span = info_span!("CellIndex::for_each_pair", n_atoms = atoms.len()).entered();
        self.ensure_compatible(atoms, r_cut)?;
        let r_cut2 = r_cut * r_cut;
        let size = self.nborbox_size();

        for (i, c) in self.cell_coords().iter().enumerate() {
            let point = atoms[i].point;
            let (xs, nx) = axis_neighbors(c[0], size[0], false);
            let (ys, ny) = axis_neighbors(c[1], size[1], false);
            let (zs, nz) = axis_neighbors(c[2], size[2], false);
            for &iz in &zs[..nz] {
                for &iy in &ys[..ny] {
                    for &ix in &xs[..nx] {
                        let cell = self.linear_index(ix, iy, iz);
                        for j in self.chain(cell) {
                            // each pair once
                            if i >= j {
                                continue;
                            }
                            let disp = atoms[j].point - point;
                            let r2 = disp.norm_squared();
                            if r2 <= r_cut2 {
                                f(i, j, disp, r2);
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn search_atom_neighbors(
        &self,
        a: usize,
        atoms: &[Atom],
        pbox: &PeriodicBox,
        r_cut2: f64,
        nbors: &mut Vec<usize>,
    ) {
        let size = self.nborbox_size();
        let c = self.cell_coords()[a];
        let point = atoms[a].point;
        let pbc = pbox.pbc();

        let (xs, nx) = axis_neighbors(c[0], size[0], pbc.x);
        let (ys, ny) = axis_neighbors(c[1], size[1], pbc.y);
        let (zs, nz) = axis_neighbors(c[2], size[2], pbc.z);

        for &iz in &zs[..nz] {
            for &iy in &ys[..ny] {
                for &ix in &xs[..nx] {
                    let cell = self.linear_index(ix, iy, iz);
                    for b in self.chain(cell) {
                        if b == a {
                            continue;
                        }
                        if pbox.distance_squared(&point, &atoms[b].point) <= r_cut2 {
                            nbors.push(b);
                        }
                    }
                }
            }
        }
    }
}

/// Distinct cells adjacent to `c` (itself included) along one axis of `n`
/// cells. Periodic axes wrap; with fewer than three cells the wrapped
/// coordinates coincide and are reported once.
fn axis_neighbors(c: usize, n: usize, periodic: bool) -> ([usize; 3], usize) {
    let mut out = [0usize; 3];
    let mut len = 0;
    for d in -1i64..=1 {
        let raw = c as i64 + d;
        let idx = if periodic {
            raw.rem_euclid(n as i64)
        } else {
            raw
        };
        if idx < 0 || idx >= n as i64 {
            continue;
        }
        let idx = idx as usize;
        if !out[..len].contains(&idx) {
            out[len] = idx;
            len += 1;
        }
    }
    (out, len)
}

/// Exhaustive O(N²) reference neighbor list with the same acceptance rule
/// as the cell search.
pub fn brute_force_nborlist(atoms: &[Atom], pbox: &PeriodicBox, r_cut: f64) -> Result<NeighborList> {
    check_cutoff(r_cut)?;
    let r_cut2 = r_cut * r_cut;
    let n = atoms.len();
    let mut nborlist = vec![Vec::new(); n];

    for i in 0..n {
        for j in (i + 1)..n {
            if pbox.distance_squared(&atoms[i].point, &atoms[j].point) <= r_cut2 {
                nborlist[i].push(j);
                nborlist[j].push(i);
            }
        }
    }
    Ok(nborlist)
}
