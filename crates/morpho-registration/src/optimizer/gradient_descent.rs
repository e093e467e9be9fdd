//! Gradient descent with automatic step size correction.
//!
//! Steps are taken along the gradient scaled by its maximum norm, so the
//! step size is the largest parameter change in one iteration. The step
//! grows after a strong decrease and halves after a failed step.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RegistrationError, Result};
use crate::validation::validate_gradient_descent;
use super::max_norm;
use super::trait_::{Minimizer, MinimizerStatus, Problem};

/// Failed tries at the minimal step before giving up.
const MAX_TRIES: usize = 5;

/// Gradient descent configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientDescentConfig {
    /// Minimal absolute step size.
    pub min_step: f64,
    /// Maximal absolute step size.
    pub max_step: f64,
    /// Stop if the maximum norm of the gradient falls below this value.
    pub xtol: f64,
    /// Stop if the relative decrease of the cost falls below this value.
    pub ftolr: f64,
    /// Maximum number of iterations.
    pub max_iterations: usize,
}

impl Default for GradientDescentConfig {
    fn default() -> Self {
        Self {
            min_step: 0.1,
            max_step: 2.0,
            xtol: 0.01,
            ftolr: 0.0,
            max_iterations: 200,
        }
    }
}

impl GradientDescentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_steps(mut self, min_step: f64, max_step: f64) -> Self {
        self.min_step = min_step;
        self.max_step = max_step;
        self
    }

    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.xtol = xtol;
        self
    }

    pub fn with_ftolr(mut self, ftolr: f64) -> Self {
        self.ftolr = ftolr;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Gradient descent minimizer.
#[derive(Debug, Clone)]
pub struct GradientDescent {
    config: GradientDescentConfig,
}

impl GradientDescent {
    /// Create a minimizer from a validated configuration.
    pub fn new(config: GradientDescentConfig) -> Result<Self> {
        validate_gradient_descent(&config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GradientDescentConfig {
        &self.config
    }
}

impl Minimizer for GradientDescent {
    fn name(&self) -> &'static str {
        "gdas"
    }

    fn run(&mut self, problem: &mut dyn Problem, x: &mut [f64]) -> Result<MinimizerStatus> {
        let cfg = &self.config;
        assert_eq!(x.len(), problem.size(), "Parameter vector does not match problem size");

        let mut g = vec![0.0; x.len()];
        let mut f_old = problem.fdf(x, &mut g)?;
        if !f_old.is_finite() {
            return Err(RegistrationError::numerical(format!(
                "Initial cost is not finite: {}",
                f_old
            )));
        }
        let mut gmax = max_norm(&g);
        if gmax < cfg.xtol || gmax == 0.0 {
            info!("gdas: gradient below {} at start", cfg.xtol);
            return Ok(MinimizerStatus::Converged);
        }

        let mut step = (0.5 * (cfg.max_step - cfg.min_step)).clamp(cfg.min_step, cfg.max_step);
        let mut trial = x.to_vec();
        let mut g_trial = vec![0.0; x.len()];
        let mut tries = 0;

        for iter in 1..=cfg.max_iterations {
            let scale = step / gmax;
            for ((t, &xi), &gi) in trial.iter_mut().zip(x.iter()).zip(&g) {
                *t = xi - scale * gi;
            }
            let f = problem.fdf(&trial, &mut g_trial)?;

            if f < f_old {
                debug!(iter, f, step, "gdas: successful step");
                x.copy_from_slice(&trial);
                std::mem::swap(&mut g, &mut g_trial);
                gmax = max_norm(&g);
                tries = 0;

                if f < 0.5 * f_old && step < cfg.max_step {
                    step = (step * 1.5).min(cfg.max_step);
                    debug!("gdas: increase step size to {}", step);
                }
                let dfrel = if f_old != 0.0 { (f_old - f) / f_old.abs() } else { f64::INFINITY };
                f_old = f;

                if gmax < cfg.xtol || gmax == 0.0 {
                    info!("gdas: gradient below {} after {} iterations", cfg.xtol, iter);
                    return Ok(MinimizerStatus::Converged);
                }
                if dfrel < cfg.ftolr {
                    info!("gdas: relative decrease {} below {}", dfrel, cfg.ftolr);
                    return Ok(MinimizerStatus::Converged);
                }
            } else {
                debug!(iter, f, step, "gdas: failed step");
                if step > cfg.min_step {
                    step = (step * 0.5).max(cfg.min_step);
                    debug!("gdas: decrease step size to {}", step);
                } else if tries < MAX_TRIES {
                    tries += 1;
                } else {
                    info!("gdas: at minimal step size and no improvement, stopping");
                    return Ok(MinimizerStatus::StepLimit);
                }
            }
        }
        info!("gdas: maximum number of iterations {} reached", cfg.max_iterations);
        Ok(MinimizerStatus::MaxIterations)
    }
}
