pub mod error;
pub mod spatial;
pub mod image;
pub mod interpolation;
pub mod filter;
pub mod pool;
pub mod transform;

pub use error::{CoreError, Result};
pub use image::{Image, VectorField};
pub use spatial::{GridSize, Vector};
pub use pool::{ImageKey, ImagePool};
