//! Image similarity cost term.

use std::sync::Arc;

use morpho_core::filter::resize;
use morpho_core::transform::Transformation;
use morpho_core::{GridSize, Image, ImageKey, ImagePool, VectorField};
use tracing::debug;

use crate::error::{RegistrationError, Result};
use super::kernel::ImageSimilarity;
use super::trait_::{CostTerm, PROPERTY_GRADIENT};

/// Working-resolution copies of the compared images.
#[derive(Debug)]
struct Level<const D: usize> {
    source: Image<D>,
    reference: Image<D>,
    source_gradient: VectorField<D>,
}

/// Cost term comparing the warped study image with a reference image.
///
/// Both images are fetched from an `ImagePool` on `reinit`. The force
/// driving the transformation is the kernel derivative times the source
/// gradient pulled back through the transformation.
pub struct ImageCost<const D: usize, K: ImageSimilarity> {
    pool: Arc<ImagePool<D>>,
    source_key: ImageKey,
    reference_key: ImageKey,
    kernel: K,
    weight: f64,
    full: Option<(Arc<Image<D>>, Arc<Image<D>>)>,
    level: Option<Level<D>>,
}

impl<const D: usize, K: ImageSimilarity> ImageCost<D, K> {
    /// Create a cost term comparing the images stored under the given keys.
    pub fn new(
        pool: Arc<ImagePool<D>>,
        source: impl Into<String>,
        reference: impl Into<String>,
        kernel: K,
    ) -> Self {
        Self {
            pool,
            source_key: ImageKey::new(source),
            reference_key: ImageKey::new(reference),
            kernel,
            weight: 1.0,
            full: None,
            level: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    fn level(&self) -> Result<&Level<D>> {
        self.level.as_ref().ok_or_else(|| {
            RegistrationError::data(format!(
                "Cost term '{}' evaluated before set_size",
                self.kernel.name()
            ))
        })
    }

    fn check_size(&self, level: &Level<D>, transform: &dyn Transformation<D>) -> Result<()> {
        if transform.size() != level.reference.size() {
            return Err(RegistrationError::transform(format!(
                "Transformation size {} differs from working size {}",
                transform.size(),
                level.reference.size()
            )));
        }
        Ok(())
    }
}

impl<const D: usize, K: ImageSimilarity> CostTerm<D> for ImageCost<D, K> {
    fn name(&self) -> &str {
        self.kernel.name()
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn reinit(&mut self) -> Result<()> {
        let source = self.pool.get(&self.source_key)?;
        let reference = self.pool.get(&self.reference_key)?;
        if source.size() != reference.size() {
            return Err(RegistrationError::data(format!(
                "Study '{}' has size {} but reference '{}' has size {}",
                self.source_key.name(),
                source.size(),
                self.reference_key.name(),
                reference.size()
            )));
        }
        debug!(
            "{}: loaded '{}' and '{}' of size {}",
            self.kernel.name(),
            self.source_key.name(),
            self.reference_key.name(),
            source.size()
        );
        self.full = Some((source, reference));
        self.level = None;
        Ok(())
    }

    fn set_size(&mut self, size: GridSize<D>) -> Result<()> {
        let (source, reference) = self.full.as_ref().ok_or_else(|| {
            RegistrationError::data(format!(
                "Cost term '{}' resized before reinit",
                self.kernel.name()
            ))
        })?;
        if size.is_degenerate() {
            return Err(RegistrationError::data(format!(
                "Cannot resample images to {}",
                size
            )));
        }
        let source = resize(source, size);
        let source_gradient = source.gradient();
        self.level = Some(Level {
            reference: resize(reference, size),
            source,
            source_gradient,
        });
        Ok(())
    }

    fn value(&self, transform: &dyn Transformation<D>) -> Result<f64> {
        let level = self.level()?;
        self.check_size(level, transform)?;
        let warped = transform.warp(&level.source);
        Ok(self.weight * self.kernel.value(&warped, &level.reference))
    }

    fn evaluate(&self, transform: &dyn Transformation<D>, gradient: &mut [f64]) -> Result<f64> {
        let level = self.level()?;
        self.check_size(level, transform)?;
        let warped = transform.warp(&level.source);
        let warped_gradient = transform.warp_field(&level.source_gradient);
        let (value, derivative) = self.kernel.value_and_derivative(&warped, &level.reference);

        let grads = warped_gradient.as_slice();
        let size = warped.size();
        let force = VectorField::from_fn(size, |index| {
            let offset = size.linear_index(index);
            grads[offset] * (self.weight * derivative[offset])
        });
        transform.translate(&force, gradient);
        Ok(self.weight * value)
    }

    fn full_size(&self, size: &mut Option<GridSize<D>>) -> bool {
        let Some((source, _)) = self.full.as_ref() else {
            return false;
        };
        match size {
            None => {
                *size = Some(source.size());
                true
            }
            Some(expected) => *expected == source.size(),
        }
    }

    fn has(&self, property: &str) -> bool {
        property == PROPERTY_GRADIENT
    }

    fn value_unwarped(&self) -> Result<f64> {
        let level = self.level()?;
        Ok(self.weight * self.kernel.value(&level.source, &level.reference))
    }
}
