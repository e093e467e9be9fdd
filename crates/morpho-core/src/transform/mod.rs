//! Transformation types and operations.
//!
//! This module provides the transformation contract the registration
//! engine drives, and the parametric families implementing it.

pub mod trait_;
pub mod penalty;
pub mod translation;
pub mod affine;
pub mod displacement_field;
pub mod bspline;

pub use trait_::{check_size, Transformation, TransformationFactory};
pub use translation::{TranslationFactory, TranslationTransform};
pub use affine::{AffineFactory, AffineTransform};
pub use displacement_field::{DisplacementFieldFactory, DisplacementFieldTransform};
pub use bspline::{BSplineFactory, BSplineTransform};
