//! Transformation trait for parametric spatial maps.
//!
//! This module defines the contract every transformation family must
//! satisfy to be optimized by the registration engine.

use rayon::prelude::*;

use crate::error::{CoreError, Result};
use crate::image::{Image, VectorField};
use crate::spatial::{GridSize, Vector};

/// A parametric spatial transformation at a fixed grid resolution.
///
/// A transformation maps a grid index `x` to `T(x) = x + u(x)`, where the
/// displacement `u` is determined by the parameter vector. Images are
/// warped by pulling the source back: `warped(x) = source(T(x))`.
///
/// # Type Parameters
/// * `D` - The spatial dimensionality (2 or 3)
pub trait Transformation<const D: usize>: Send + Sync {
    /// Name of the transformation family.
    fn name(&self) -> &'static str;

    /// Grid size the transformation currently operates on.
    fn size(&self) -> GridSize<D>;

    /// Length of the parameter vector.
    fn degrees_of_freedom(&self) -> usize;

    /// Current parameter vector.
    fn parameters(&self) -> Vec<f64>;

    /// Replace the parameter vector.
    ///
    /// # Panics
    /// Panics if `params.len() != self.degrees_of_freedom()`.
    fn set_parameters(&mut self, params: &[f64]);

    /// Create an equivalent transformation valid on a larger grid.
    ///
    /// The deformation is carried over as closely as the family allows;
    /// displacements scale with the size ratio.
    fn upscale(&self, size: GridSize<D>) -> Result<Box<dyn Transformation<D>>>;

    /// Enrich the parameterization at the current grid size.
    ///
    /// Returns true if the parameterization changed. The previous parameter
    /// vector is invalid afterwards and `degrees_of_freedom` may differ.
    fn refine(&mut self) -> bool {
        false
    }

    /// True if the family carries its own regularization energy.
    fn has_energy_penalty(&self) -> bool {
        false
    }

    /// Regularization energy of the current parameters.
    fn energy_penalty(&self) -> f64 {
        0.0
    }

    /// Regularization energy and its gradient.
    ///
    /// `gradient` is overwritten, not accumulated into.
    fn energy_penalty_and_gradient(&self, gradient: &mut [f64]) -> f64 {
        gradient.fill(0.0);
        0.0
    }

    /// Displacement `u(x)` at a grid index.
    fn displacement(&self, index: [usize; D]) -> Vector<D>;

    /// Project a per-pixel force field onto the parameters.
    ///
    /// Adds `sum_x J(x)^T force(x)` to `gradient`, where `J(x)` is the
    /// derivative of `u(x)` with respect to the parameters. This is the
    /// adjoint of the parameter-to-displacement map.
    ///
    /// # Panics
    /// Panics if `force` is not sampled on `self.size()` or
    /// `gradient.len() != self.degrees_of_freedom()`.
    fn translate(&self, force: &VectorField<D>, gradient: &mut [f64]);

    /// Dense displacement sampled on the transformation's grid.
    fn displacement_field(&self) -> VectorField<D> {
        VectorField::from_fn(self.size(), |index| self.displacement(index))
    }

    /// Target point `T(x)` of a grid index.
    fn apply(&self, index: [usize; D]) -> [f64; D] {
        let u = self.displacement(index);
        let mut point = [0.0; D];
        for d in 0..D {
            point[d] = index[d] as f64 + u[d];
        }
        point
    }

    /// Pull `image` back through the transformation.
    ///
    /// # Panics
    /// Panics if the image is not sampled on `self.size()`.
    fn warp(&self, image: &Image<D>) -> Image<D> {
        let size = self.size();
        assert_eq!(image.size(), size, "Image and transformation grid differ");
        let data: Vec<f32> = (0..size.len())
            .into_par_iter()
            .map(|offset| image.sample(&self.apply(size.index_of(offset))) as f32)
            .collect();
        Image::from_parts(size, data)
    }

    /// Pull a vector field back through the transformation.
    ///
    /// The vectors themselves are not reoriented.
    fn warp_field(&self, field: &VectorField<D>) -> VectorField<D> {
        let size = self.size();
        assert_eq!(field.size(), size, "Field and transformation grid differ");
        VectorField::from_fn(size, |index| field.sample(&self.apply(index)))
    }
}

/// Creates identity transformations of one family.
pub trait TransformationFactory<const D: usize>: Send + Sync {
    /// Name of the produced family.
    fn name(&self) -> &'static str;

    /// Create the identity transformation on a grid of `size`.
    ///
    /// # Errors
    /// Returns `InvalidSize` if the family cannot represent `size`.
    fn create(&self, size: GridSize<D>) -> Result<Box<dyn Transformation<D>>>;
}

/// Reject grid sizes no transformation can operate on.
pub fn check_size<const D: usize>(family: &str, size: GridSize<D>) -> Result<()> {
    if size.is_degenerate() {
        return Err(CoreError::invalid_size(format!(
            "{} transformation cannot operate on grid {}",
            family, size
        )));
    }
    Ok(())
}
