//! Joint intensity normalization of a study/reference image pair.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::image::Image;

/// Linear intensity map `v -> scale * v + shift`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntensityScaling {
    pub scale: f64,
    pub shift: f64,
}

impl IntensityScaling {
    /// Apply the map to every pixel of `image`.
    pub fn apply<const D: usize>(&self, image: &Image<D>) -> Image<D> {
        let (scale, shift) = (self.scale, self.shift);
        image.map(|v| (scale * v as f64 + shift) as f32)
    }
}

/// Computes one intensity map for two images together.
///
/// The map gives the union of both images zero mean and unit standard
/// deviation, so both are converted identically and stay comparable.
#[derive(Debug, Clone, Copy, Default)]
pub struct JointNormalization;

impl JointNormalization {
    /// Compute the joint map.
    ///
    /// # Returns
    /// `None` if both images together hold a single intensity value; such a
    /// pair is already registered.
    pub fn compute<const D: usize>(&self, a: &Image<D>, b: &Image<D>) -> Option<IntensityScaling> {
        let n = a.data().len() + b.data().len();
        if n < 2 {
            return None;
        }
        let values = || a.data().iter().chain(b.data().iter()).map(|&v| v as f64);
        let n = n as f64;
        let mean = values().sum::<f64>() / n;
        let var = values().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0);
        let sigma = var.sqrt();
        if sigma == 0.0 || !sigma.is_finite() {
            return None;
        }
        info!("Joint intensity normalization: mean={:.6}, sigma={:.6}", mean, sigma);
        Some(IntensityScaling {
            scale: 1.0 / sigma,
            shift: -mean / sigma,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::GridSize;

    #[test]
    fn test_joint_normalization_zero_mean_unit_sigma() {
        let a = Image::from_fn(GridSize::new([4, 4]), |[x, y]| (x * y) as f32);
        let b = Image::from_fn(GridSize::new([4, 4]), |[x, _]| (3 * x) as f32 + 1.0);
        let scaling = JointNormalization.compute(&a, &b).unwrap();
        let na = scaling.apply(&a);
        let nb = scaling.apply(&b);

        let all: Vec<f64> = na.data().iter().chain(nb.data()).map(|&v| v as f64).collect();
        let mean = all.iter().sum::<f64>() / all.len() as f64;
        let var = all.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (all.len() - 1) as f64;
        assert!(mean.abs() < 1e-5);
        assert!((var.sqrt() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_constant_pair_has_no_normalization() {
        let a = Image::filled(GridSize::new([3, 3]), 2.0);
        assert!(JointNormalization.compute(&a, &a.clone()).is_none());
    }
}
