//! L-BFGS Optimizer Implementation
//!
//! Limited-memory BFGS optimization algorithm for registration.
//! This implementation follows the standard L-BFGS two-loop recursion
//! algorithm with a backtracking line search on the Armijo condition.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{RegistrationError, Result};
use crate::validation::validate_lbfgs;
use super::trait_::{Minimizer, MinimizerStatus, Problem};
use super::{dot, max_norm};

/// L-BFGS Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LbfgsConfig {
    /// History size (number of steps to keep)
    pub history_size: usize,
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Stop if the maximum norm of the gradient falls below this value
    pub gradient_tolerance: f64,
    /// Stop if the relative decrease of the cost falls below this value
    pub ftolr: f64,
    /// Sufficient decrease constant of the Armijo condition
    pub armijo: f64,
    /// Maximum number of step halvings per line search
    pub max_backtracks: usize,
}

impl Default for LbfgsConfig {
    fn default() -> Self {
        Self {
            history_size: 10,
            max_iterations: 100,
            gradient_tolerance: 1e-6,
            ftolr: 1e-9,
            armijo: 1e-4,
            max_backtracks: 30,
        }
    }
}

impl LbfgsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history_size(mut self, history_size: usize) -> Self {
        self.history_size = history_size;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_gradient_tolerance(mut self, tolerance: f64) -> Self {
        self.gradient_tolerance = tolerance;
        self
    }

    pub fn with_ftolr(mut self, ftolr: f64) -> Self {
        self.ftolr = ftolr;
        self
    }
}

/// One stored correction pair.
struct Correction {
    s: Vec<f64>,
    y: Vec<f64>,
    rho: f64,
}

/// L-BFGS minimizer.
#[derive(Debug, Clone)]
pub struct Lbfgs {
    config: LbfgsConfig,
}

impl Lbfgs {
    /// Create a minimizer from a validated configuration.
    pub fn new(config: LbfgsConfig) -> Result<Self> {
        validate_lbfgs(&config)?;
        Ok(Self { config })
    }

    /// Search direction `-H g` from the two-loop recursion.
    fn direction(history: &VecDeque<Correction>, g: &[f64]) -> Vec<f64> {
        let mut q = g.to_vec();
        let mut alphas = Vec::with_capacity(history.len());

        // First loop (backward)
        for c in history.iter().rev() {
            let alpha = c.rho * dot(&c.s, &q);
            for (qi, yi) in q.iter_mut().zip(&c.y) {
                *qi -= alpha * yi;
            }
            alphas.push(alpha);
        }

        // Initial Hessian approximation: gamma = (s^T y) / (y^T y)
        if let Some(last) = history.back() {
            let gamma = dot(&last.s, &last.y) / dot(&last.y, &last.y);
            for qi in q.iter_mut() {
                *qi *= gamma;
            }
        }

        // Second loop (forward)
        for (c, alpha) in history.iter().zip(alphas.iter().rev()) {
            let beta = c.rho * dot(&c.y, &q);
            for (qi, si) in q.iter_mut().zip(&c.s) {
                *qi += (alpha - beta) * si;
            }
        }

        for qi in q.iter_mut() {
            *qi = -*qi;
        }
        q
    }
}

fn check_finite(what: &str, f: f64, g: &[f64]) -> Result<()> {
    if !f.is_finite() || g.iter().any(|v| !v.is_finite()) {
        return Err(RegistrationError::numerical(format!(
            "L-BFGS: non-finite {} (cost {})",
            what, f
        )));
    }
    Ok(())
}

impl Minimizer for Lbfgs {
    fn name(&self) -> &'static str {
        "lbfgs"
    }

    fn run(&mut self, problem: &mut dyn Problem, x: &mut [f64]) -> Result<MinimizerStatus> {
        let cfg = &self.config;
        let n = problem.size();
        assert_eq!(x.len(), n, "Parameter vector does not match problem size");

        let mut g = vec![0.0; n];
        let mut f = problem.fdf(x, &mut g)?;
        check_finite("initial value", f, &g)?;

        let mut history: VecDeque<Correction> = VecDeque::with_capacity(cfg.history_size);
        let mut trial = vec![0.0; n];
        let mut g_trial = vec![0.0; n];

        for iter in 0..cfg.max_iterations {
            let gmax = max_norm(&g);
            if gmax <= cfg.gradient_tolerance {
                info!("L-BFGS: gradient below {} after {} iterations", cfg.gradient_tolerance, iter);
                return Ok(MinimizerStatus::Converged);
            }

            let mut d = Self::direction(&history, &g);
            let mut slope = dot(&d, &g);
            if slope >= 0.0 {
                warn!("L-BFGS: not a descent direction, resetting history");
                history.clear();
                d = g.iter().map(|v| -v).collect();
                slope = -dot(&g, &g);
            }

            // Without curvature information, limit the first step to unit length.
            let mut alpha = if history.is_empty() { 1.0 / gmax.max(1.0) } else { 1.0 };
            let mut accepted = None;
            for _ in 0..=cfg.max_backtracks {
                for ((t, &xi), &di) in trial.iter_mut().zip(x.iter()).zip(&d) {
                    *t = xi + alpha * di;
                }
                let f_new = problem.fdf(&trial, &mut g_trial)?;
                check_finite("line search value", f_new, &g_trial)?;
                if f_new <= f + cfg.armijo * alpha * slope {
                    accepted = Some(f_new);
                    break;
                }
                alpha *= 0.5;
            }
            let Some(f_new) = accepted else {
                info!("L-BFGS: line search failed after {} iterations", iter);
                return Ok(MinimizerStatus::StepLimit);
            };
            debug!(iter, f = f_new, alpha, "L-BFGS: step");

            let s: Vec<f64> = trial.iter().zip(x.iter()).map(|(a, b)| a - b).collect();
            let y: Vec<f64> = g_trial.iter().zip(&g).map(|(a, b)| a - b).collect();
            let ys = dot(&y, &s);
            if ys > 1e-10 {
                if history.len() >= cfg.history_size {
                    history.pop_front();
                }
                history.push_back(Correction { s, y, rho: 1.0 / ys });
            }

            let dfrel = (f - f_new) / f.abs().max(f64::MIN_POSITIVE);
            x.copy_from_slice(&trial);
            std::mem::swap(&mut g, &mut g_trial);
            f = f_new;
            if dfrel < cfg.ftolr {
                info!("L-BFGS: relative decrease {} below {}", dfrel, cfg.ftolr);
                return Ok(MinimizerStatus::Converged);
            }
        }
        info!("L-BFGS: maximum number of iterations {} reached", cfg.max_iterations);
        Ok(MinimizerStatus::MaxIterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rosenbrock function.
    struct Rosenbrock;

    impl Problem for Rosenbrock {
        fn size(&self) -> usize {
            2
        }
        fn f(&mut self, x: &[f64]) -> Result<f64> {
            Ok((1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2))
        }
        fn df(&mut self, x: &[f64], g: &mut [f64]) -> Result<()> {
            g[0] = -2.0 * (1.0 - x[0]) - 400.0 * x[0] * (x[1] - x[0] * x[0]);
            g[1] = 200.0 * (x[1] - x[0] * x[0]);
            Ok(())
        }
        fn fdf(&mut self, x: &[f64], g: &mut [f64]) -> Result<f64> {
            self.df(x, g)?;
            self.f(x)
        }
    }

    struct NotFinite;

    impl Problem for NotFinite {
        fn size(&self) -> usize {
            1
        }
        fn f(&mut self, _x: &[f64]) -> Result<f64> {
            Ok(f64::NAN)
        }
        fn df(&mut self, _x: &[f64], g: &mut [f64]) -> Result<()> {
            g[0] = 1.0;
            Ok(())
        }
        fn fdf(&mut self, x: &[f64], g: &mut [f64]) -> Result<f64> {
            self.df(x, g)?;
            self.f(x)
        }
    }

    #[test]
    fn test_minimizes_rosenbrock() {
        let config = LbfgsConfig::new()
            .with_max_iterations(500)
            .with_gradient_tolerance(1e-8)
            .with_ftolr(0.0);
        let mut minimizer = Lbfgs::new(config).unwrap();
        let mut x = vec![-1.2, 1.0];
        minimizer.run(&mut Rosenbrock, &mut x).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-3, "x = {:?}", x);
        assert!((x[1] - 1.0).abs() < 1e-3, "x = {:?}", x);
    }

    #[test]
    fn test_non_finite_cost_is_fatal() {
        let mut minimizer = Lbfgs::new(LbfgsConfig::default()).unwrap();
        let mut x = vec![0.0];
        let err = minimizer.run(&mut NotFinite, &mut x).unwrap_err();
        assert!(matches!(err, RegistrationError::Numerical(_)));
    }

    #[test]
    fn test_rejects_empty_history() {
        assert!(Lbfgs::new(LbfgsConfig::new().with_history_size(0)).is_err());
    }
}
