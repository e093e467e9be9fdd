//! Scalar image on a regular grid.

use crate::error::{CoreError, Result};
use crate::image::{GridIndices, VectorField};
use crate::interpolation::LinearInterpolator;
use crate::spatial::{GridSize, Vector};

/// A D-dimensional scalar image.
///
/// Pixels are stored as `f32` in linear storage order (dimension 0
/// fastest); arithmetic on them is carried out in `f64`.
///
/// # Type Parameters
/// * `D` - The spatial dimensionality (2 or 3)
#[derive(Debug, Clone, PartialEq)]
pub struct Image<const D: usize> {
    size: GridSize<D>,
    data: Vec<f32>,
}

impl<const D: usize> Image<D> {
    /// Create an image from pixel data.
    ///
    /// # Errors
    /// Returns `SizeMismatch` if `data` does not hold exactly one value per grid point.
    pub fn new(size: GridSize<D>, data: Vec<f32>) -> Result<Self> {
        if data.len() != size.len() {
            return Err(CoreError::size_mismatch(&[size.len()], &[data.len()]));
        }
        Ok(Self { size, data })
    }

    pub(crate) fn from_parts(size: GridSize<D>, data: Vec<f32>) -> Self {
        debug_assert_eq!(size.len(), data.len());
        Self { size, data }
    }

    /// Create an image with every pixel set to `value`.
    pub fn filled(size: GridSize<D>, value: f32) -> Self {
        Self {
            size,
            data: vec![value; size.len()],
        }
    }

    /// Create an image by evaluating `f` at every grid index.
    pub fn from_fn(size: GridSize<D>, f: impl FnMut([usize; D]) -> f32) -> Self {
        Self {
            size,
            data: GridIndices::new(size).map(f).collect(),
        }
    }

    pub fn size(&self) -> GridSize<D> {
        self.size
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Pixel value at a grid index.
    pub fn get(&self, index: [usize; D]) -> f32 {
        self.data[self.size.linear_index(index)]
    }

    /// Set the pixel value at a grid index.
    pub fn set(&mut self, index: [usize; D], value: f32) {
        let offset = self.size.linear_index(index);
        self.data[offset] = value;
    }

    /// Sample the image at a continuous index with linear interpolation.
    pub fn sample(&self, point: &[f64; D]) -> f64 {
        LinearInterpolator.sample_image(self, point)
    }

    /// Apply `f` to every pixel.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            size: self.size,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Intensity gradient by finite differences.
    ///
    /// Central differences inside the grid, one-sided differences at the
    /// border and zero along dimensions of extent one.
    pub fn gradient(&self) -> VectorField<D> {
        let size = self.size;
        VectorField::from_fn(size, |index| {
            let mut g = Vector::zeros();
            for d in 0..D {
                let n = size[d];
                if n < 2 {
                    continue;
                }
                let i = index[d];
                let mut lo = index;
                let mut hi = index;
                lo[d] = i.saturating_sub(1);
                hi[d] = (i + 1).min(n - 1);
                let span = (hi[d] - lo[d]) as f64;
                g[d] = (self.get(hi) as f64 - self.get(lo) as f64) / span;
            }
            g
        })
    }

    /// Mean and standard deviation of the pixel values.
    pub fn mean_and_sigma(&self) -> (f64, f64) {
        let n = self.data.len();
        if n == 0 {
            return (0.0, 0.0);
        }
        let sum: f64 = self.data.iter().map(|&v| v as f64).sum();
        let mean = sum / n as f64;
        if n < 2 {
            return (mean, 0.0);
        }
        let var: f64 = self
            .data
            .iter()
            .map(|&v| (v as f64 - mean).powi(2))
            .sum::<f64>()
            / (n - 1) as f64;
        (mean, var.sqrt())
    }
}
