//! Ordered aggregation of cost terms.

use morpho_core::transform::Transformation;
use morpho_core::GridSize;
use tracing::{debug, warn};

use crate::error::Result;
use super::trait_::CostTerm;

/// An ordered list of cost terms evaluated as one objective.
///
/// Terms are evaluated in insertion order; values and gradients are
/// summed.
#[derive(Default)]
pub struct CostList<const D: usize> {
    terms: Vec<Box<dyn CostTerm<D>>>,
}

impl<const D: usize> CostList<D> {
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    /// Append a cost term.
    pub fn push(&mut self, term: Box<dyn CostTerm<D>>) {
        self.terms.push(term);
    }

    /// Builder-style `push`.
    pub fn with(mut self, term: impl CostTerm<D> + 'static) -> Self {
        self.push(Box::new(term));
        self
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Resample every term to `size`.
    pub fn set_size(&mut self, size: GridSize<D>) -> Result<()> {
        debug!("Cost list: set size {}", size);
        for term in self.terms.iter_mut() {
            term.set_size(size)?;
        }
        Ok(())
    }

    /// Reload the inputs of every term.
    pub fn reinit(&mut self) -> Result<()> {
        for term in self.terms.iter_mut() {
            term.reinit()?;
        }
        Ok(())
    }

    /// Sum of the weighted term values.
    pub fn value(&self, transform: &dyn Transformation<D>) -> Result<f64> {
        let mut total = 0.0;
        for term in &self.terms {
            let v = term.value(transform)?;
            debug!("  {}: {}", term.name(), v);
            total += v;
        }
        Ok(total)
    }

    /// Sum of the weighted term values without transformation.
    pub fn value_unwarped(&self) -> Result<f64> {
        let mut total = 0.0;
        for term in &self.terms {
            total += term.value_unwarped()?;
        }
        Ok(total)
    }

    /// Sum of the weighted term values; gradients accumulate into `gradient`.
    ///
    /// `gradient` is not cleared.
    pub fn evaluate(&self, transform: &dyn Transformation<D>, gradient: &mut [f64]) -> Result<f64> {
        let mut total = 0.0;
        for term in &self.terms {
            let v = term.evaluate(transform, gradient)?;
            debug!("  {}: {}", term.name(), v);
            total += v;
        }
        Ok(total)
    }

    /// The native problem size all terms agree on.
    ///
    /// Returns `None` if two terms disagree or no term reports a size.
    pub fn full_size(&self) -> Option<GridSize<D>> {
        let mut size = None;
        for term in &self.terms {
            if !term.full_size(&mut size) {
                warn!(
                    "Cost term '{}' disagrees with the problem size {:?}",
                    term.name(),
                    size.map(|s| s.to_string())
                );
                return None;
            }
        }
        size
    }

    /// True if any term reports `property`.
    pub fn has(&self, property: &str) -> bool {
        self.terms.iter().any(|term| term.has(property))
    }
}
