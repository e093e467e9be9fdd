//! Diffusion regularization of the deformation.
//!
//! Penalizes first-order spatial derivatives of the displacement field
//! sampled on the working grid:
//!
//! R(u) = 1/2 * mean over x of sum_d |u(x + e_d) - u(x)|^2
//!
//! The term has no native size and works at whatever resolution the
//! transformation operates on.

use morpho_core::transform::penalty::membrane_energy;
use morpho_core::transform::Transformation;
use morpho_core::{GridSize, Vector, VectorField};

use crate::error::Result;
use super::trait_::CostTerm;

/// Diffusion regularizer for deformations.
#[derive(Clone, Debug)]
pub struct DiffusionRegularizer<const D: usize> {
    weight: f64,
}

impl<const D: usize> DiffusionRegularizer<D> {
    /// Create a new diffusion regularizer.
    ///
    /// # Arguments
    /// * `weight` - The weight (scaling factor) for this regularizer.
    pub fn new(weight: f64) -> Self {
        Self { weight }
    }
}

impl<const D: usize> Default for DiffusionRegularizer<D> {
    fn default() -> Self {
        Self::new(0.01)
    }
}

impl<const D: usize> CostTerm<D> for DiffusionRegularizer<D> {
    fn name(&self) -> &str {
        "diffusion"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn reinit(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_size(&mut self, _size: GridSize<D>) -> Result<()> {
        Ok(())
    }

    fn value(&self, transform: &dyn Transformation<D>) -> Result<f64> {
        let field = transform.displacement_field();
        Ok(membrane_energy(field.size(), field.as_slice(), 0.5 * self.weight, None))
    }

    fn evaluate(&self, transform: &dyn Transformation<D>, gradient: &mut [f64]) -> Result<f64> {
        let field = transform.displacement_field();
        let size = field.size();
        let mut dense = vec![0.0; size.len() * D];
        let value = membrane_energy(size, field.as_slice(), 0.5 * self.weight, Some(&mut dense));
        let force = VectorField::from_fn(size, |index| {
            let offset = size.linear_index(index) * D;
            Vector::from_slice(&dense[offset..offset + D])
        });
        transform.translate(&force, gradient);
        Ok(value)
    }

    fn full_size(&self, _size: &mut Option<GridSize<D>>) -> bool {
        true
    }
}
