//! Minimizers driving a registration problem.

pub mod trait_;
pub mod gradient_descent;
pub mod lbfgs;

pub use trait_::{Minimizer, MinimizerStatus, Problem};
pub use gradient_descent::{GradientDescent, GradientDescentConfig};
pub use lbfgs::{Lbfgs, LbfgsConfig};

/// Largest absolute component of `v`.
pub(crate) fn max_norm(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |m, x| m.max(x.abs()))
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
