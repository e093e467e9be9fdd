//! Linear interpolation implementation.
//!
//! This module provides multilinear interpolation (bilinear for 2D,
//! trilinear for 3D) for scalar images and vector fields.

use crate::image::{Image, VectorField};
use crate::spatial::{GridSize, Vector};

/// Visit the grid corners surrounding a continuous point.
///
/// Calls `visit(offset, weight)` for each of the up to `2^D` neighbours
/// with a non-zero multilinear weight. Coordinates are clamped to the grid,
/// which replicates border values.
///
/// # Arguments
/// * `size` - Grid extent, must not be degenerate
/// * `point` - Continuous index coordinates
/// * `visit` - Receives the linear offset and weight of each corner
pub fn for_each_corner<const D: usize>(
    size: GridSize<D>,
    point: &[f64; D],
    mut visit: impl FnMut(usize, f64),
) {
    debug_assert!(!size.is_degenerate(), "Cannot interpolate on an empty grid");

    let mut low = [0usize; D];
    let mut high = [0usize; D];
    let mut frac = [0.0f64; D];
    for d in 0..D {
        let max = (size[d] - 1) as f64;
        let p = if point[d].is_finite() { point[d].clamp(0.0, max) } else { 0.0 };
        let base = p.floor();
        low[d] = base as usize;
        high[d] = (low[d] + 1).min(size[d] - 1);
        frac[d] = p - base;
    }

    for mask in 0..(1usize << D) {
        let mut weight = 1.0;
        let mut index = [0usize; D];
        for d in 0..D {
            if mask & (1 << d) != 0 {
                index[d] = high[d];
                weight *= frac[d];
            } else {
                index[d] = low[d];
                weight *= 1.0 - frac[d];
            }
        }
        if weight != 0.0 {
            visit(size.linear_index(index), weight);
        }
    }
}

/// Linear Interpolator.
///
/// Performs linear interpolation (bilinear for 2D, trilinear for 3D).
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearInterpolator;

impl LinearInterpolator {
    /// Sample a scalar image at a continuous index.
    pub fn sample_image<const D: usize>(&self, image: &Image<D>, point: &[f64; D]) -> f64 {
        let data = image.data();
        let mut value = 0.0;
        for_each_corner(image.size(), point, |offset, weight| {
            value += weight * data[offset] as f64;
        });
        value
    }

    /// Sample a vector field at a continuous index.
    pub fn sample_field<const D: usize>(&self, field: &VectorField<D>, point: &[f64; D]) -> Vector<D> {
        let data = field.as_slice();
        let mut value = Vector::zeros();
        for_each_corner(field.size(), point, |offset, weight| {
            value += data[offset] * weight;
        });
        value
    }
}
