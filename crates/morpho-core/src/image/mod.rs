//! Scalar images and vector fields on regular grids.

pub mod grid;
pub mod image;
pub mod field;

pub use grid::GridIndices;
pub use image::Image;
pub use field::VectorField;
