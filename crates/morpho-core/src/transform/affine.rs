//! Affine transform implementation.

use nalgebra::SMatrix;

use crate::error::Result;
use crate::image::{GridIndices, VectorField};
use crate::spatial::{GridSize, Vector};
use super::trait_::{check_size, Transformation, TransformationFactory};

/// Affine transform `T(x) = (I + M) x + b`.
///
/// Parameterized relative to the identity so that all-zero parameters
/// describe no motion. The parameter vector holds `M` in row-major order
/// followed by `b`, `D * D + D` values in total.
#[derive(Debug, Clone)]
pub struct AffineTransform<const D: usize> {
    size: GridSize<D>,
    matrix: SMatrix<f64, D, D>,
    offset: Vector<D>,
}

impl<const D: usize> AffineTransform<D> {
    /// Create an identity affine transform on a grid of `size`.
    pub fn new(size: GridSize<D>) -> Self {
        Self {
            size,
            matrix: SMatrix::zeros(),
            offset: Vector::zeros(),
        }
    }

    /// Create from the linear deviation `M` and the offset `b`.
    pub fn from_parts(size: GridSize<D>, matrix: SMatrix<f64, D, D>, offset: Vector<D>) -> Self {
        Self { size, matrix, offset }
    }

    pub fn matrix(&self) -> &SMatrix<f64, D, D> {
        &self.matrix
    }

    pub fn offset(&self) -> Vector<D> {
        self.offset
    }
}

impl<const D: usize> Transformation<D> for AffineTransform<D> {
    fn name(&self) -> &'static str {
        "affine"
    }

    fn size(&self) -> GridSize<D> {
        self.size
    }

    fn degrees_of_freedom(&self) -> usize {
        D * D + D
    }

    fn parameters(&self) -> Vec<f64> {
        let mut params = Vec::with_capacity(D * D + D);
        for i in 0..D {
            for j in 0..D {
                params.push(self.matrix[(i, j)]);
            }
        }
        params.extend(self.offset.to_array());
        params
    }

    fn set_parameters(&mut self, params: &[f64]) {
        assert_eq!(params.len(), D * D + D, "Affine expects {} parameters", D * D + D);
        for i in 0..D {
            for j in 0..D {
                self.matrix[(i, j)] = params[i * D + j];
            }
        }
        self.offset = Vector::from_slice(&params[D * D..]);
    }

    fn upscale(&self, size: GridSize<D>) -> Result<Box<dyn Transformation<D>>> {
        check_size(self.name(), size)?;
        // conjugate with R = diag(ratio): x' = R x
        let ratio = self.size.ratio_to(&size);
        let mut matrix = self.matrix;
        for i in 0..D {
            for j in 0..D {
                matrix[(i, j)] *= ratio[i] / ratio[j];
            }
        }
        Ok(Box::new(Self::from_parts(size, matrix, self.offset.component_mul(&ratio))))
    }

    fn displacement(&self, index: [usize; D]) -> Vector<D> {
        let mut x = Vector::<D>::zeros();
        for d in 0..D {
            x[d] = index[d] as f64;
        }
        Vector(self.matrix * x.0) + self.offset
    }

    fn translate(&self, force: &VectorField<D>, gradient: &mut [f64]) {
        assert_eq!(force.size(), self.size, "Force field and transformation grid differ");
        assert_eq!(gradient.len(), D * D + D, "Gradient length must match degrees of freedom");
        for (index, f) in GridIndices::new(self.size).zip(force.as_slice()) {
            for i in 0..D {
                for j in 0..D {
                    gradient[i * D + j] += f[i] * index[j] as f64;
                }
                gradient[D * D + i] += f[i];
            }
        }
    }
}

/// Factory for `AffineTransform`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AffineFactory;

impl<const D: usize> TransformationFactory<D> for AffineFactory {
    fn name(&self) -> &'static str {
        "affine"
    }

    fn create(&self, size: GridSize<D>) -> Result<Box<dyn Transformation<D>>> {
        check_size("affine", size)?;
        Ok(Box::new(AffineTransform::new(size)))
    }
}
