//! Sum of squared differences.

use morpho_core::Image;

use super::ImageSimilarity;

/// Sum of squared differences kernel.
///
/// Computes `0.5 * mean((w - r)^2)` over all pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ssd;

impl ImageSimilarity for Ssd {
    fn name(&self) -> &'static str {
        "ssd"
    }

    fn value<const D: usize>(&self, warped: &Image<D>, reference: &Image<D>) -> f64 {
        assert_eq!(warped.size(), reference.size(), "Images must be of the same size");
        let n = warped.data().len();
        if n == 0 {
            return 0.0;
        }
        let sum: f64 = warped
            .data()
            .iter()
            .zip(reference.data())
            .map(|(&w, &r)| {
                let d = w as f64 - r as f64;
                d * d
            })
            .sum();
        0.5 * sum / n as f64
    }

    fn value_and_derivative<const D: usize>(
        &self,
        warped: &Image<D>,
        reference: &Image<D>,
    ) -> (f64, Vec<f64>) {
        assert_eq!(warped.size(), reference.size(), "Images must be of the same size");
        let n = warped.data().len().max(1) as f64;
        let mut sum = 0.0;
        let derivative = warped
            .data()
            .iter()
            .zip(reference.data())
            .map(|(&w, &r)| {
                let d = w as f64 - r as f64;
                sum += d * d;
                d / n
            })
            .collect();
        (0.5 * sum / n, derivative)
    }
}
