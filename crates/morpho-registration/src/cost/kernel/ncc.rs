//! Normalized cross correlation.

use morpho_core::Image;

use super::ImageSimilarity;

/// Centred sums of two images.
struct Moments {
    mean_a: f64,
    mean_b: f64,
    sab: f64,
    saa: f64,
    sbb: f64,
}

impl Moments {
    fn new(a: &[f32], b: &[f32]) -> Self {
        let n = a.len().max(1) as f64;
        let mean_a = a.iter().map(|&v| v as f64).sum::<f64>() / n;
        let mean_b = b.iter().map(|&v| v as f64).sum::<f64>() / n;
        let (mut sab, mut saa, mut sbb) = (0.0, 0.0, 0.0);
        for (&x, &y) in a.iter().zip(b) {
            let da = x as f64 - mean_a;
            let db = y as f64 - mean_b;
            sab += da * db;
            saa += da * da;
            sbb += db * db;
        }
        Self { mean_a, mean_b, sab, saa, sbb }
    }

    fn degenerate(&self) -> bool {
        self.saa <= 0.0 || self.sbb <= 0.0
    }

    fn cost(&self) -> f64 {
        if self.degenerate() {
            return 1.0;
        }
        1.0 - self.sab * self.sab / (self.saa * self.sbb)
    }
}

/// Normalized cross correlation kernel.
///
/// Computes `1 - ncc^2`, so both correlated and anti-correlated images
/// are considered aligned. A constant image yields a cost of 1 and no
/// derivative.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ncc;

impl ImageSimilarity for Ncc {
    fn name(&self) -> &'static str {
        "ncc"
    }

    fn value<const D: usize>(&self, warped: &Image<D>, reference: &Image<D>) -> f64 {
        assert_eq!(warped.size(), reference.size(), "Images must be of the same size");
        Moments::new(warped.data(), reference.data()).cost()
    }

    fn value_and_derivative<const D: usize>(
        &self,
        warped: &Image<D>,
        reference: &Image<D>,
    ) -> (f64, Vec<f64>) {
        assert_eq!(warped.size(), reference.size(), "Images must be of the same size");
        let m = Moments::new(warped.data(), reference.data());
        if m.degenerate() {
            return (1.0, vec![0.0; warped.data().len()]);
        }
        let factor = -2.0 * m.sab / (m.saa * m.sbb);
        let ratio = m.sab / m.saa;
        let derivative = warped
            .data()
            .iter()
            .zip(reference.data())
            .map(|(&a, &b)| factor * ((b as f64 - m.mean_b) - ratio * (a as f64 - m.mean_a)))
            .collect();
        (m.cost(), derivative)
    }
}
