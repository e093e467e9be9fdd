//! Cost terms and their aggregation.
//!
//! A registration objective is a weighted sum of cost terms: image
//! similarity measures and regularizers of the deformation.

pub mod trait_;
pub mod list;
pub mod kernel;
pub mod image;
pub mod diffusion;

pub use trait_::{CostTerm, PROPERTY_GRADIENT};
pub use list::CostList;
pub use kernel::{ImageSimilarity, Ncc, Ssd};
pub use image::ImageCost;
pub use diffusion::DiffusionRegularizer;
