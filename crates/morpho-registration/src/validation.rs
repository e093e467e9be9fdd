//! Validation utilities for registration operations.
//!
//! This module checks configurations before a run starts so that invalid
//! settings fail before any minimizer is invoked.

use morpho_core::GridSize;

use crate::error::{RegistrationError, Result};
use crate::optimizer::{GradientDescentConfig, LbfgsConfig};

/// Largest supported pyramid depth.
pub const MAX_LEVELS: usize = 16;

/// Validate iteration count.
pub fn validate_iterations(iterations: usize) -> Result<()> {
    if iterations == 0 {
        return Err(RegistrationError::invalid_configuration(
            "Iterations must be positive",
        ));
    }

    if iterations > 1_000_000 {
        return Err(RegistrationError::invalid_configuration(
            format!("Iterations too large: {}", iterations),
        ));
    }

    Ok(())
}

/// Validate the pyramid depth against the native problem size.
///
/// The coarsest level must not have a zero-length dimension.
pub fn validate_levels<const D: usize>(global: GridSize<D>, levels: usize) -> Result<()> {
    if levels == 0 {
        return Err(RegistrationError::invalid_configuration(
            "Number of multigrid levels must be positive",
        ));
    }

    if levels > MAX_LEVELS {
        return Err(RegistrationError::invalid_configuration(
            format!("Too many multigrid levels: {}", levels),
        ));
    }

    let coarsest = global.scale_down(1 << (levels - 1));
    if coarsest.is_degenerate() {
        return Err(RegistrationError::invalid_configuration(format!(
            "{} multigrid levels reduce size {} to {}",
            levels, global, coarsest
        )));
    }

    Ok(())
}

/// Validate gradient descent settings.
pub fn validate_gradient_descent(config: &GradientDescentConfig) -> Result<()> {
    validate_iterations(config.max_iterations)?;

    if !(config.min_step > 0.0) || !(config.max_step > 0.0) {
        return Err(RegistrationError::invalid_configuration(format!(
            "Step sizes must be positive, got [{}, {}]",
            config.min_step, config.max_step
        )));
    }

    if config.min_step > config.max_step {
        return Err(RegistrationError::invalid_configuration(format!(
            "min_step ({}) must not exceed max_step ({})",
            config.min_step, config.max_step
        )));
    }

    if !(config.xtol >= 0.0) || !(config.ftolr >= 0.0) {
        return Err(RegistrationError::invalid_configuration(
            "Tolerances must be non-negative",
        ));
    }

    Ok(())
}

/// Validate L-BFGS settings.
pub fn validate_lbfgs(config: &LbfgsConfig) -> Result<()> {
    validate_iterations(config.max_iterations)?;

    if config.history_size < 1 {
        return Err(RegistrationError::invalid_configuration(
            "L-BFGS history size must be at least 1",
        ));
    }

    if config.history_size > 100 {
        return Err(RegistrationError::invalid_configuration(
            format!("L-BFGS history size too large: {}", config.history_size),
        ));
    }

    if !(config.armijo > 0.0 && config.armijo < 1.0) {
        return Err(RegistrationError::invalid_configuration(format!(
            "Armijo constant must be in (0, 1), got {}",
            config.armijo
        )));
    }

    if !(config.gradient_tolerance >= 0.0) || !(config.ftolr >= 0.0) {
        return Err(RegistrationError::invalid_configuration(
            "Tolerances must be non-negative",
        ));
    }

    Ok(())
}
