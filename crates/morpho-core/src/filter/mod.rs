//! Image filters used to prepare registration inputs.

pub mod resample;
pub mod normalize;

pub use resample::{resize, resize_field};
pub use normalize::{IntensityScaling, JointNormalization};
