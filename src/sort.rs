//! Reordering of atom storage for memory locality.
//!
//! Every sort is a full permutation of the atoms: ids and markers travel with
//! their point, only slot indices change.

use crate::atom::Atom;
use crate::error::{AtomError, Result};
use rayon::prelude::*;
use std::cmp::Ordering;
use tracing::info_span;

const HILBERT_BITS: u32 = 21;
const HILBERT_CLAMP_MAX: f64 = 0.999999;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortAxis {
    X,
    Y,
    Z,
    /// Distance from the origin.
    Radial,
}

impl TryFrom<usize> for SortAxis {
    type Error = AtomError;

    fn try_from(coord: usize) -> Result<Self> {
        match coord {
            0 => Ok(SortAxis::X),
            1 => Ok(SortAxis::Y),
            2 => Ok(SortAxis::Z),
            3 => Ok(SortAxis::Radial),
            other => Err(AtomError::UnknownSortAxis(other)),
        }
    }
}

impl SortAxis {
    fn key(self, atom: &Atom) -> f64 {
        match self {
            SortAxis::X => atom.point.x,
            SortAxis::Y => atom.point.y,
            SortAxis::Z => atom.point.z,
            // monotone in the distance, no sqrt needed
            SortAxis::Radial => atom.point.coords.norm_squared(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Up,
    Down,
}

/// `"up"` is ascending; any other string is descending.
impl From<&str> for SortDirection {
    fn from(s: &str) -> Self {
        if s == "up" {
            SortDirection::Up
        } else {
            SortDirection::Down
        }
    }
}

impl SortDirection {
    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Up => ord,
            SortDirection::Down => ord.reverse(),
        }
    }
}

/// Stable sort along one axis.
pub fn sort_by_axis(atoms: &mut [Atom], axis: SortAxis, direction: SortDirection) {
    let _span = info_span!("sort_by_axis", n_atoms = atoms.len(), ?axis, ?direction).entered();
    atoms.sort_by(|a, b| direction.apply(axis.key(a).total_cmp(&axis.key(b))));
}

/// Stable sort with `primary` as the major key and `secondary` breaking ties,
/// both in `direction`.
pub fn sort_by_axes(
    atoms: &mut [Atom],
    primary: SortAxis,
    secondary: SortAxis,
    direction: SortDirection,
) {
    let _span = info_span!(
        "sort_by_axes",
        n_atoms = atoms.len(),
        ?primary,
        ?secondary,
        ?direction
    )
    .entered();
    atoms.sort_by(|a, b| {
        let ord = primary
            .key(a)
            .total_cmp(&primary.key(b))
            .then_with(|| secondary.key(a).total_cmp(&secondary.key(b)));
        direction.apply(ord)
    });
}

/// Stable sort by ascending id, undoing any spatial ordering.
pub fn sort_by_id(atoms: &mut [Atom]) {
    let _span = info_span!("sort_by_id", n_atoms = atoms.len()).entered();
    atoms.sort_by_key(|a| a.id);
}

/// Orders atoms along a 3D Hilbert curve laid over their bounding box.
/// Atoms sharing a curve index keep their relative order.
pub fn sort_spatial(atoms: &mut [Atom]) {
    let _span = info_span!("sort_spatial", n_atoms = atoms.len()).entered();
    if atoms.len() < 2 {
        return;
    }

    let mut lo = atoms[0].point;
    let mut hi = atoms[0].point;
    for atom in atoms.iter() {
        for k in 0..3 {
            lo[k] = lo[k].min(atom.point[k]);
            hi[k] = hi[k].max(atom.point[k]);
        }
    }
    let extent = hi - lo;

    let mut keys: Vec<(u64, usize)> = {
        let _s = info_span!("compute_hilbert_keys").entered();
        atoms
            .par_iter()
            .enumerate()
            .map(|(i, atom)| {
                let mut q = [0u32; 3];
                for (k, qk) in q.iter_mut().enumerate() {
                    let frac = if extent[k] > 0.0 {
                        (atom.point[k] - lo[k]) / extent[k]
                    } else {
                        0.0
                    };
                    *qk = (frac.clamp(0.0, HILBERT_CLAMP_MAX) * (1u64 << HILBERT_BITS) as f64)
                        as u32;
                }
                (hilbert_index(q, HILBERT_BITS), i)
            })
            .collect()
    };
    // the slot index breaks ties, so an unstable sort is deterministic
    keys.sort_unstable();

    let sorted: Vec<Atom> = keys.iter().map(|&(_, i)| atoms[i]).collect();
    atoms.copy_from_slice(&sorted);
}

/// Hilbert index of a point on a `2^bits` grid per axis, following
/// Skilling's transpose method: the coordinates are turned into the
/// transposed Hilbert index in place and then bit-interleaved.
pub(crate) fn hilbert_index(mut x: [u32; 3], bits: u32) -> u64 {
    let m = 1u32 << (bits - 1);

    // inverse undo
    let mut q = m;
    while q > 1 {
        let p = q - 1;
        for i in 0..3 {
            if x[i] & q != 0 {
                x[0] ^= p;
            } else {
                let t = (x[0] ^ x[i]) & p;
                x[0] ^= t;
                x[i] ^= t;
            }
        }
        q >>= 1;
    }

    // Gray encode
    x[1] ^= x[0];
    x[2] ^= x[1];
    let mut t = 0;
    let mut q = m;
    while q > 1 {
        if x[2] & q != 0 {
            t ^= q - 1;
        }
        q >>= 1;
    }
    for v in x.iter_mut() {
        *v ^= t;
    }

    (interleave_3(x[0] as u64) << 2) | (interleave_3(x[1] as u64) << 1) | interleave_3(x[2] as u64)
}

/// Spreads the low 21 bits of `x` so that bit `b` lands on bit `3b`.
fn interleave_3(mut x: u64) -> u64 {
    x &= 0x1fffff;
    x = (x | x << 32) & 0x1f00000000ffffu64;
    x = (x | x << 16) & 0x1f0000ff0000ffu64;
    x = (x | x << 8) & 0x100f00f00f00f00fu64;
    x = (x | x << 4) & 0x10c30c30c30c30c3u64;
    x = (x | x << 2) & 0x1249249249249249u64;
    x
}
