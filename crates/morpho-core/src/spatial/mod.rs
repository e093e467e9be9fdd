//! Spatial types for grid extents and per-pixel vectors.
//!
//! `GridSize` describes the extent of a sampling grid independent of its
//! dimensionality, `Vector` carries displacements and forces. Vectors are
//! backed by nalgebra.

pub mod size;
pub mod vector;

pub use size::GridSize;
pub use vector::Vector;

// Common type aliases for 2D and 3D
pub type GridSize2 = GridSize<2>;
pub type GridSize3 = GridSize<3>;
pub type Vector2 = Vector<2>;
pub type Vector3 = Vector<3>;
