//! Interpolation on regular grids.
//!
//! Images and vector fields are sampled at continuous coordinates with
//! multilinear weights; coordinates outside the grid replicate the border.

pub mod linear;

pub use linear::{for_each_corner, LinearInterpolator};
