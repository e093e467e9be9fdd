//! Translation transform implementation.

use crate::error::Result;
use crate::image::VectorField;
use crate::spatial::{GridSize, Vector};
use super::trait_::{check_size, Transformation, TransformationFactory};

/// Translation transform.
///
/// Shifts every grid point by the same vector; `D` parameters.
#[derive(Debug, Clone)]
pub struct TranslationTransform<const D: usize> {
    size: GridSize<D>,
    shift: Vector<D>,
}

impl<const D: usize> TranslationTransform<D> {
    /// Create an identity translation on a grid of `size`.
    pub fn new(size: GridSize<D>) -> Self {
        Self::with_shift(size, Vector::zeros())
    }

    /// Create a translation with the given shift.
    pub fn with_shift(size: GridSize<D>, shift: Vector<D>) -> Self {
        Self { size, shift }
    }

    pub fn shift(&self) -> Vector<D> {
        self.shift
    }
}

impl<const D: usize> Transformation<D> for TranslationTransform<D> {
    fn name(&self) -> &'static str {
        "translate"
    }

    fn size(&self) -> GridSize<D> {
        self.size
    }

    fn degrees_of_freedom(&self) -> usize {
        D
    }

    fn parameters(&self) -> Vec<f64> {
        self.shift.to_array().to_vec()
    }

    fn set_parameters(&mut self, params: &[f64]) {
        assert_eq!(params.len(), D, "Translation expects {} parameters", D);
        self.shift = Vector::from_slice(params);
    }

    fn upscale(&self, size: GridSize<D>) -> Result<Box<dyn Transformation<D>>> {
        check_size(self.name(), size)?;
        let ratio = self.size.ratio_to(&size);
        Ok(Box::new(Self::with_shift(size, self.shift.component_mul(&ratio))))
    }

    fn displacement(&self, _index: [usize; D]) -> Vector<D> {
        self.shift
    }

    fn translate(&self, force: &VectorField<D>, gradient: &mut [f64]) {
        assert_eq!(force.size(), self.size, "Force field and transformation grid differ");
        assert_eq!(gradient.len(), D, "Gradient length must match degrees of freedom");
        let mut total = Vector::<D>::zeros();
        for f in force.as_slice() {
            total += *f;
        }
        for d in 0..D {
            gradient[d] += total[d];
        }
    }
}

/// Factory for `TranslationTransform`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranslationFactory;

impl<const D: usize> TransformationFactory<D> for TranslationFactory {
    fn name(&self) -> &'static str {
        "translate"
    }

    fn create(&self, size: GridSize<D>) -> Result<Box<dyn Transformation<D>>> {
        check_size("translate", size)?;
        Ok(Box::new(TranslationTransform::new(size)))
    }
}
