//! Minimizer and problem traits.
//!
//! A minimizer only sees a `Problem`: the parameter count and the cost
//! with its gradient at a parameter vector.

use crate::error::Result;

/// A differentiable objective over a parameter vector.
pub trait Problem {
    /// Number of parameters.
    fn size(&self) -> usize;

    /// Cost at `x`.
    fn f(&mut self, x: &[f64]) -> Result<f64>;

    /// Gradient at `x`, written to `g`.
    fn df(&mut self, x: &[f64], g: &mut [f64]) -> Result<()>;

    /// Cost and gradient at `x`.
    fn fdf(&mut self, x: &[f64], g: &mut [f64]) -> Result<f64>;

    /// Capability query forwarded from the cost terms.
    fn has(&self, _property: &str) -> bool {
        false
    }
}

/// How a minimizer run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinimizerStatus {
    /// A convergence criterion was met.
    Converged,
    /// The iteration limit was reached.
    MaxIterations,
    /// No further progress was possible at the smallest allowed step.
    StepLimit,
}

impl MinimizerStatus {
    /// True for outcomes that are accepted as success with a warning.
    pub fn is_soft(&self) -> bool {
        !matches!(self, Self::Converged)
    }
}

/// Minimization algorithm.
///
/// A minimizer does not keep state between runs; the same instance can
/// be used for every level of a registration.
pub trait Minimizer: Send {
    /// Name of the algorithm.
    fn name(&self) -> &'static str;

    /// Minimize `problem` starting from `x`, which holds the result on return.
    ///
    /// # Errors
    /// Fatal failures, including errors raised by the problem.
    fn run(&mut self, problem: &mut dyn Problem, x: &mut [f64]) -> Result<MinimizerStatus>;
}
