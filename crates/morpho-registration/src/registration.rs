//! Gradient problem adapter between a minimizer and the cost terms.
//!
//! A `RegistrationProblem` lives for one optimization epoch: one pyramid
//! level, or the part of a level after a successful refinement. It must be
//! rebuilt whenever the degrees of freedom of the transformation change.

use morpho_core::transform::Transformation;
use tracing::debug;

use crate::cost::CostList;
use crate::error::Result;
use crate::optimizer::Problem;
use crate::progress::{EvaluationInfo, ProgressTracker};

/// Registration objective presented to a minimizer.
///
/// Sets the transformation parameters, evaluates the cost list, and adds
/// the transformation's own energy penalty.
pub struct RegistrationProblem<'a, const D: usize> {
    costs: &'a CostList<D>,
    transform: &'a mut dyn Transformation<D>,
    size: usize,
    level: usize,
    pass: usize,
    func_evals: usize,
    grad_evals: usize,
    start_cost: Option<f64>,
    progress: Option<&'a ProgressTracker>,
}

impl<'a, const D: usize> RegistrationProblem<'a, D> {
    /// Create a problem over the current state of `transform`.
    pub fn new(costs: &'a CostList<D>, transform: &'a mut dyn Transformation<D>) -> Self {
        let size = transform.degrees_of_freedom();
        Self {
            costs,
            transform,
            size,
            level: 0,
            pass: 0,
            func_evals: 0,
            grad_evals: 0,
            start_cost: None,
            progress: None,
        }
    }

    /// Report evaluations to `progress`, tagged with pyramid `level` and
    /// the number of refinements done on that level so far.
    pub fn with_progress(mut self, level: usize, pass: usize, progress: &'a ProgressTracker) -> Self {
        self.level = level;
        self.pass = pass;
        self.progress = Some(progress);
        self
    }

    /// Current parameters of the transformation.
    pub fn parameters(&self) -> Vec<f64> {
        self.transform.parameters()
    }

    pub fn func_evals(&self) -> usize {
        self.func_evals
    }

    pub fn grad_evals(&self) -> usize {
        self.grad_evals
    }

    /// First cost seen in this epoch.
    pub fn start_cost(&self) -> Option<f64> {
        self.start_cost
    }

    fn set_parameters(&mut self, x: &[f64]) {
        assert_eq!(x.len(), self.size, "Parameter vector does not match problem size");
        self.transform.set_parameters(x);
    }

    /// Cost terms and penalty into a zeroed `g`.
    fn evaluate(&mut self, x: &[f64], g: &mut [f64]) -> Result<f64> {
        assert_eq!(g.len(), self.size, "Gradient buffer does not match problem size");
        self.set_parameters(x);
        g.fill(0.0);
        let mut cost = self.costs.evaluate(&*self.transform, g)?;
        if self.transform.has_energy_penalty() {
            let mut penalty_gradient = vec![0.0; self.size];
            let penalty = self.transform.energy_penalty_and_gradient(&mut penalty_gradient);
            debug!("Energy penalty: {}", penalty);
            for (gi, pi) in g.iter_mut().zip(&penalty_gradient) {
                *gi += pi;
            }
            cost += penalty;
        }
        Ok(cost)
    }

    fn report(&mut self, cost: f64) {
        let start = *self.start_cost.get_or_insert(cost);
        let ratio = if start != 0.0 { cost / start } else { 1.0 };
        debug!(
            "[{}|{}] cost: {} ratio: {}",
            self.func_evals, self.grad_evals, cost, ratio
        );
        if let Some(progress) = self.progress {
            progress.evaluation(&EvaluationInfo {
                level: self.level,
                pass: self.pass,
                func_evals: self.func_evals,
                grad_evals: self.grad_evals,
                cost,
                ratio,
                degrees_of_freedom: self.size,
                elapsed: progress.elapsed(),
            });
        }
    }
}

impl<'a, const D: usize> Problem for RegistrationProblem<'a, D> {
    fn size(&self) -> usize {
        self.size
    }

    fn f(&mut self, x: &[f64]) -> Result<f64> {
        self.set_parameters(x);
        let mut cost = self.costs.value(&*self.transform)?;
        if self.transform.has_energy_penalty() {
            let penalty = self.transform.energy_penalty();
            debug!("Energy penalty: {}", penalty);
            cost += penalty;
        }
        self.func_evals += 1;
        self.report(cost);
        Ok(cost)
    }

    fn df(&mut self, x: &[f64], g: &mut [f64]) -> Result<()> {
        let cost = self.evaluate(x, g)?;
        self.grad_evals += 1;
        self.report(cost);
        Ok(())
    }

    fn fdf(&mut self, x: &[f64], g: &mut [f64]) -> Result<f64> {
        let cost = self.evaluate(x, g)?;
        self.func_evals += 1;
        self.grad_evals += 1;
        self.report(cost);
        Ok(cost)
    }

    fn has(&self, property: &str) -> bool {
        self.costs.has(property)
    }
}
