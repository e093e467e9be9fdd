//! Cost term trait for registration objectives.

use morpho_core::transform::Transformation;
use morpho_core::GridSize;

use crate::error::Result;

/// Property reported by terms that need gradient images of their inputs.
pub const PROPERTY_GRADIENT: &str = "gradient";

/// One weighted contribution to the registration objective.
///
/// Values returned by `value` and `evaluate` already include the term's
/// weight, and `evaluate` adds the weighted parameter gradient into the
/// caller's accumulator.
///
/// # Type Parameters
/// * `D` - The spatial dimensionality (2 or 3)
pub trait CostTerm<const D: usize>: Send {
    /// Name of this cost term.
    fn name(&self) -> &str;

    /// Weight applied to the term.
    fn weight(&self) -> f64;

    /// Load or reload the term's input data at full resolution.
    ///
    /// Calling it again with unchanged inputs must leave the term in the
    /// same state.
    fn reinit(&mut self) -> Result<()>;

    /// Resample the cached data to the working grid `size`.
    ///
    /// Must be called before `value` or `evaluate` at that resolution.
    fn set_size(&mut self, size: GridSize<D>) -> Result<()>;

    /// Weighted cost of the current transformation.
    fn value(&self, transform: &dyn Transformation<D>) -> Result<f64>;

    /// Weighted cost of the current transformation.
    ///
    /// Adds the weighted gradient with respect to the transformation
    /// parameters into `gradient`.
    fn evaluate(&self, transform: &dyn Transformation<D>, gradient: &mut [f64]) -> Result<f64>;

    /// Report or check the native problem size of the term.
    ///
    /// If `size` is `None` the term stores its size there. Otherwise it
    /// compares and returns false on disagreement. Terms without a native
    /// size accept anything and leave `size` untouched.
    fn full_size(&self, size: &mut Option<GridSize<D>>) -> bool;

    /// Capability query, see `PROPERTY_GRADIENT`.
    fn has(&self, _property: &str) -> bool {
        false
    }

    /// Weighted cost of the inputs without any transformation applied.
    fn value_unwarped(&self) -> Result<f64> {
        Ok(0.0)
    }
}
