//! Membrane energy shared by the grid-based transformation families.

use crate::image::GridIndices;
use crate::spatial::{GridSize, Vector};

/// Membrane energy of vectors laid out on a grid.
///
/// `E = weight / N * sum over neighbour pairs |v(x + e_d) - v(x)|^2`, where
/// `N` is the number of grid points. If `gradient` is given it is
/// overwritten with `dE/dv` in interleaved component order.
pub fn membrane_energy<const D: usize>(
    size: GridSize<D>,
    values: &[Vector<D>],
    weight: f64,
    mut gradient: Option<&mut [f64]>,
) -> f64 {
    debug_assert_eq!(values.len(), size.len());
    if let Some(g) = gradient.as_deref_mut() {
        assert_eq!(g.len(), values.len() * D, "Penalty gradient has wrong length");
        g.fill(0.0);
    }
    if values.is_empty() {
        return 0.0;
    }
    let norm = weight / values.len() as f64;
    let mut energy = 0.0;
    for index in GridIndices::new(size) {
        let a = size.linear_index(index);
        for d in 0..D {
            if index[d] + 1 >= size[d] {
                continue;
            }
            let mut next = index;
            next[d] += 1;
            let b = size.linear_index(next);
            let diff = values[b] - values[a];
            energy += diff.norm_squared();
            if let Some(g) = gradient.as_deref_mut() {
                for c in 0..D {
                    g[b * D + c] += 2.0 * norm * diff[c];
                    g[a * D + c] -= 2.0 * norm * diff[c];
                }
            }
        }
    }
    norm * energy
}
