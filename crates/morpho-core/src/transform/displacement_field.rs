//! Displacement field transform implementation.
//!
//! This module provides a dense displacement field transform where each
//! grid point has its own displacement vector. It is the most expressive
//! family and is usually combined with a smoothness penalty.

use crate::error::{CoreError, Result};
use crate::filter::resize_field;
use crate::image::VectorField;
use crate::spatial::{GridSize, Vector};
use super::penalty::membrane_energy;
use super::trait_::{check_size, Transformation, TransformationFactory};

/// Dense displacement field transform.
///
/// One displacement vector per grid point; `N * D` parameters stored
/// point by point with interleaved components.
#[derive(Debug, Clone)]
pub struct DisplacementFieldTransform<const D: usize> {
    field: VectorField<D>,
    penalty_weight: Option<f64>,
}

impl<const D: usize> DisplacementFieldTransform<D> {
    /// Create a zero displacement field on a grid of `size`.
    pub fn zeros(size: GridSize<D>) -> Self {
        Self::new(VectorField::zeros(size))
    }

    /// Wrap an existing displacement field.
    pub fn new(field: VectorField<D>) -> Self {
        Self {
            field,
            penalty_weight: None,
        }
    }

    /// Add a membrane energy penalty with the given weight.
    pub fn with_penalty(mut self, weight: f64) -> Self {
        self.penalty_weight = Some(weight);
        self
    }

    pub fn field(&self) -> &VectorField<D> {
        &self.field
    }
}

impl<const D: usize> Transformation<D> for DisplacementFieldTransform<D> {
    fn name(&self) -> &'static str {
        "vf"
    }

    fn size(&self) -> GridSize<D> {
        self.field.size()
    }

    fn degrees_of_freedom(&self) -> usize {
        self.field.size().len() * D
    }

    fn parameters(&self) -> Vec<f64> {
        self.field.as_slice().iter().flat_map(|v| v.to_array()).collect()
    }

    fn set_parameters(&mut self, params: &[f64]) {
        assert_eq!(params.len(), self.degrees_of_freedom(), "Parameter count must match degrees of freedom");
        for (v, chunk) in self.field.as_mut_slice().iter_mut().zip(params.chunks_exact(D)) {
            *v = Vector::from_slice(chunk);
        }
    }

    fn upscale(&self, size: GridSize<D>) -> Result<Box<dyn Transformation<D>>> {
        check_size(self.name(), size)?;
        let ratio = self.size().ratio_to(&size);
        let mut field = resize_field(&self.field, size);
        field.scale_components(&ratio);
        Ok(Box::new(Self {
            field,
            penalty_weight: self.penalty_weight,
        }))
    }

    fn has_energy_penalty(&self) -> bool {
        self.penalty_weight.is_some()
    }

    fn energy_penalty(&self) -> f64 {
        match self.penalty_weight {
            Some(w) => membrane_energy(self.size(), self.field.as_slice(), w, None),
            None => 0.0,
        }
    }

    fn energy_penalty_and_gradient(&self, gradient: &mut [f64]) -> f64 {
        match self.penalty_weight {
            Some(w) => membrane_energy(self.size(), self.field.as_slice(), w, Some(gradient)),
            None => {
                gradient.fill(0.0);
                0.0
            }
        }
    }

    fn displacement(&self, index: [usize; D]) -> Vector<D> {
        self.field.get(index)
    }

    fn displacement_field(&self) -> VectorField<D> {
        self.field.clone()
    }

    fn translate(&self, force: &VectorField<D>, gradient: &mut [f64]) {
        assert_eq!(force.size(), self.size(), "Force field and transformation grid differ");
        assert_eq!(gradient.len(), self.degrees_of_freedom(), "Gradient length must match degrees of freedom");
        for (g, f) in gradient.chunks_exact_mut(D).zip(force.as_slice()) {
            for d in 0..D {
                g[d] += f[d];
            }
        }
    }
}

/// Factory for `DisplacementFieldTransform`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplacementFieldFactory {
    penalty_weight: Option<f64>,
}

impl DisplacementFieldFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give created transformations a membrane penalty of `weight`.
    pub fn with_penalty(mut self, weight: f64) -> Result<Self> {
        if !(weight >= 0.0) {
            return Err(CoreError::invalid_parameter(format!(
                "Penalty weight must be non-negative, got {}",
                weight
            )));
        }
        self.penalty_weight = Some(weight);
        Ok(self)
    }
}

impl<const D: usize> TransformationFactory<D> for DisplacementFieldFactory {
    fn name(&self) -> &'static str {
        "vf"
    }

    fn create(&self, size: GridSize<D>) -> Result<Box<dyn Transformation<D>>> {
        check_size("vf", size)?;
        let mut transform = DisplacementFieldTransform::zeros(size);
        transform.penalty_weight = self.penalty_weight;
        Ok(Box::new(transform))
    }
}
