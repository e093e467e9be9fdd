//! Error types for registration operations.
//!
//! This module provides structured error types for registration workflows.
//! Each variant names the stage of a run that failed.

use morpho_core::CoreError;
use thiserror::Error;

/// Main error type for registration operations.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Invalid configuration, detected before any minimizer runs.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The cost terms do not agree on the native problem size.
    #[error("Cost terms disagree on the problem size: {0}")]
    SizeDisagreement(String),

    /// Input data could not be loaded or has the wrong shape.
    #[error("Data error: {0}")]
    Data(String),

    /// Fatal error in optimizer operation.
    #[error("Optimizer error: {0}")]
    OptimizerError(String),

    /// Numerical instability detected.
    #[error("Numerical instability: {0}")]
    Numerical(String),

    /// Error in transform operation.
    #[error("Transform error: {0}")]
    TransformError(String),

    /// Error raised by the core data model.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for registration operations.
pub type Result<T> = std::result::Result<T, RegistrationError>;

impl RegistrationError {
    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a size disagreement error.
    pub fn size_disagreement(msg: impl Into<String>) -> Self {
        Self::SizeDisagreement(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    /// Create an optimizer error.
    pub fn optimizer(msg: impl Into<String>) -> Self {
        Self::OptimizerError(msg.into())
    }

    /// Create a numerical instability error.
    pub fn numerical(msg: impl Into<String>) -> Self {
        Self::Numerical(msg.into())
    }

    /// Create a transform error.
    pub fn transform(msg: impl Into<String>) -> Self {
        Self::TransformError(msg.into())
    }
}
