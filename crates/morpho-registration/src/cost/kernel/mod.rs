//! Image similarity kernels.
//!
//! A kernel compares a warped study image with the reference and yields
//! the derivative of the cost with respect to every warped intensity.
//! `ImageCost` turns that derivative into a force field.

pub mod ssd;
pub mod ncc;

pub use ssd::Ssd;
pub use ncc::Ncc;

use morpho_core::Image;

/// Similarity measure between two images of equal size.
///
/// Lower values indicate better alignment.
pub trait ImageSimilarity: Send + Sync {
    /// Name of the kernel.
    fn name(&self) -> &'static str;

    /// Cost of comparing `warped` with `reference`.
    fn value<const D: usize>(&self, warped: &Image<D>, reference: &Image<D>) -> f64;

    /// Cost and its derivative with respect to each warped intensity.
    fn value_and_derivative<const D: usize>(
        &self,
        warped: &Image<D>,
        reference: &Image<D>,
    ) -> (f64, Vec<f64>);
}
