//! Vector field on a regular grid.

use crate::image::GridIndices;
use crate::interpolation::LinearInterpolator;
use crate::spatial::{GridSize, Vector};

/// A field of D-dimensional vectors, one per grid point.
///
/// Used for dense displacements and for the per-pixel forces that cost
/// terms hand to `Transformation::translate`.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField<const D: usize> {
    size: GridSize<D>,
    data: Vec<Vector<D>>,
}

impl<const D: usize> VectorField<D> {
    /// Create a field of zero vectors.
    pub fn zeros(size: GridSize<D>) -> Self {
        Self {
            size,
            data: vec![Vector::zeros(); size.len()],
        }
    }

    /// Create a field by evaluating `f` at every grid index.
    pub fn from_fn(size: GridSize<D>, f: impl FnMut([usize; D]) -> Vector<D>) -> Self {
        Self {
            size,
            data: GridIndices::new(size).map(f).collect(),
        }
    }

    pub fn size(&self) -> GridSize<D> {
        self.size
    }

    pub fn get(&self, index: [usize; D]) -> Vector<D> {
        self.data[self.size.linear_index(index)]
    }

    pub fn get_mut(&mut self, index: [usize; D]) -> &mut Vector<D> {
        let offset = self.size.linear_index(index);
        &mut self.data[offset]
    }

    pub fn as_slice(&self) -> &[Vector<D>] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Vector<D>] {
        &mut self.data
    }

    /// Sample the field at a continuous index with linear interpolation.
    pub fn sample(&self, point: &[f64; D]) -> Vector<D> {
        LinearInterpolator.sample_field(self, point)
    }

    /// Multiply every vector by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for v in self.data.iter_mut() {
            *v *= factor;
        }
    }

    /// Multiply every vector component-wise by `factors`.
    pub fn scale_components(&mut self, factors: &[f64; D]) {
        for v in self.data.iter_mut() {
            *v = v.component_mul(factors);
        }
    }

    /// Largest vector norm in the field.
    pub fn max_norm(&self) -> f64 {
        self.data
            .iter()
            .map(|v| v.norm_squared())
            .fold(0.0, f64::max)
            .sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_between_vectors() {
        let field = VectorField::from_fn(GridSize::new([2, 1]), |[x, _]| Vector::new([x as f64, 1.0]));
        let v = field.sample(&[0.25, 0.0]);
        assert!((v[0] - 0.25).abs() < 1e-12);
        assert!((v[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scale_components() {
        let mut field = VectorField::from_fn(GridSize::new([2, 2]), |_| Vector::new([1.0, 1.0]));
        field.scale_components(&[2.0, 3.0]);
        assert_eq!(field.get([1, 1]).to_array(), [2.0, 3.0]);
        assert!((field.max_norm() - 13.0f64.sqrt()).abs() < 1e-12);
    }
}
