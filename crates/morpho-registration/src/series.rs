//! Registration of an image series to one of its frames.
//!
//! Every frame is registered independently to the reference frame, so the
//! frames run in parallel. Each frame gets its own engine and its own
//! pool keys; the image pool is shared.

use morpho_core::transform::Transformation;
use morpho_core::{Image, ImagePool};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::RegistrationConfig;
use crate::error::{RegistrationError, Result};
use crate::multires::MultiResolutionRegistration;

/// Transformations of a series registration, indexed by frame.
///
/// Skipped frames and the reference frame hold `None`.
pub type SeriesTransforms<const D: usize> = Vec<Option<Box<dyn Transformation<D>>>>;

/// Outcome of a series registration.
pub struct RegisteredSeries<const D: usize> {
    /// Transformation of every frame, see [`SeriesTransforms`].
    pub transforms: SeriesTransforms<D>,
    /// The frames warped into the reference frame. Skipped frames and
    /// the reference frame are passed through unchanged.
    pub frames: Vec<Image<D>>,
}

/// Registers all frames of a series to a reference frame.
#[derive(Debug, Clone, Default)]
pub struct SeriesRegistration {
    reference: Option<usize>,
    skip: usize,
    config: RegistrationConfig,
}

impl SeriesRegistration {
    pub fn new(config: RegistrationConfig) -> Self {
        Self {
            reference: None,
            skip: 0,
            config,
        }
    }

    /// Register to frame `index` instead of the middle frame.
    pub fn with_reference(mut self, index: usize) -> Self {
        self.reference = Some(index);
        self
    }

    /// Ignore the first `skip` frames.
    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// Reference frame for a series of `frames` images.
    ///
    /// Defaults to the middle frame; an out-of-range index is clamped to
    /// the last frame.
    pub fn reference_index(&self, frames: usize) -> Result<usize> {
        if frames == 0 {
            return Err(RegistrationError::invalid_configuration("Empty image series"));
        }
        let reference = match self.reference {
            None => frames / 2,
            Some(r) if r >= frames => {
                warn!("Reference frame {} out of range, using {}", r, frames - 1);
                frames - 1
            }
            Some(r) => r,
        };
        if self.skip > reference {
            return Err(RegistrationError::invalid_configuration(format!(
                "Skipping {} frames would skip the reference frame {}",
                self.skip, reference
            )));
        }
        Ok(reference)
    }

    /// Frames that get registered: everything after `skip` except the
    /// reference frame.
    pub fn registered_frames(&self, frames: usize) -> Result<Vec<usize>> {
        let reference = self.reference_index(frames)?;
        Ok(self.select(frames, reference))
    }

    fn select(&self, frames: usize, reference: usize) -> Vec<usize> {
        (self.skip..frames).filter(|&i| i != reference).collect()
    }

    /// Register every frame after `skip` to the reference frame and warp
    /// it with the resulting transformation.
    ///
    /// `build` creates the engine of one frame from a configuration whose
    /// `frame_index` is set; its cost terms must read the configuration's
    /// pool keys from `pool`.
    pub fn run<const D: usize, F>(
        &self,
        pool: &ImagePool<D>,
        frames: &[Image<D>],
        build: F,
    ) -> Result<RegisteredSeries<D>>
    where
        F: Fn(RegistrationConfig) -> Result<MultiResolutionRegistration<D>> + Sync,
    {
        let reference = self.reference_index(frames.len())?;
        let selected = self.select(frames.len(), reference);
        info!(
            "Register {} frames to frame {}, skipping {}",
            selected.len(),
            reference,
            self.skip
        );

        let registered: Vec<(usize, Box<dyn Transformation<D>>)> = selected
            .into_par_iter()
            .map(|i| {
                let config = self.config.clone().with_frame_index(i);
                let mut engine = build(config)?;
                info!("Register frame {}", i);
                let transform = engine.run_images(pool, &frames[i], &frames[reference])?;
                Ok((i, transform))
            })
            .collect::<Result<_>>()?;

        let mut transforms: SeriesTransforms<D> = (0..frames.len()).map(|_| None).collect();
        let mut warped = frames.to_vec();
        for (i, transform) in registered {
            warped[i] = transform.warp(&frames[i]);
            transforms[i] = Some(transform);
        }
        Ok(RegisteredSeries {
            transforms,
            frames: warped,
        })
    }
}
