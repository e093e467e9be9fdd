//! Multi-resolution registration engine.
//!
//! Drives a transformation through a coarse-to-fine pyramid: at every
//! level the transformation is created or upscaled, the cost terms are
//! resampled, and the minimizers run on a fresh `RegistrationProblem`.
//! Transformations that can refine are re-optimized at the same level
//! until they stop refining.

use morpho_core::filter::JointNormalization;
use morpho_core::transform::{Transformation, TransformationFactory};
use morpho_core::{CoreError, GridSize, Image, ImagePool};
use tracing::{info, warn};

use crate::config::RegistrationConfig;
use crate::cost::CostList;
use crate::error::{RegistrationError, Result};
use crate::optimizer::{Minimizer, MinimizerStatus};
use crate::progress::{LevelInfo, ProgressTracker};
use crate::registration::RegistrationProblem;
use crate::validation::validate_levels;

/// Working grid sizes from coarsest to finest.
///
/// Level `l` works on `global / 2^l`; the last entry is `global`.
pub fn pyramid_sizes<const D: usize>(global: GridSize<D>, levels: usize) -> Vec<GridSize<D>> {
    (0..levels)
        .rev()
        .map(|level| global.scale_down(1 << level))
        .collect()
}

/// Multi-resolution registration framework.
///
/// Orchestrates the registration process across multiple resolution levels
/// (coarse-to-fine) to improve robustness and convergence range.
pub struct MultiResolutionRegistration<const D: usize> {
    costs: CostList<D>,
    minimizer: Box<dyn Minimizer>,
    refinement: Option<Box<dyn Minimizer>>,
    factory: Box<dyn TransformationFactory<D>>,
    config: RegistrationConfig,
    progress: ProgressTracker,
}

impl<const D: usize> MultiResolutionRegistration<D> {
    /// Create a new multi-resolution registration.
    ///
    /// # Arguments
    /// * `costs` - The cost terms forming the objective
    /// * `minimizer` - The minimizer run at every level
    /// * `factory` - Creates the transformation at the coarsest level
    /// * `config` - Pyramid depth and data keys
    pub fn new(
        costs: CostList<D>,
        minimizer: Box<dyn Minimizer>,
        factory: Box<dyn TransformationFactory<D>>,
        config: RegistrationConfig,
    ) -> Self {
        Self {
            costs,
            minimizer,
            refinement: None,
            factory,
            config,
            progress: ProgressTracker::new(),
        }
    }

    /// Run a second minimizer after the first one at every level.
    pub fn with_refinement_minimizer(mut self, minimizer: Box<dyn Minimizer>) -> Self {
        self.refinement = Some(minimizer);
        self
    }

    pub fn with_progress(mut self, progress: ProgressTracker) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    pub fn costs(&self) -> &CostList<D> {
        &self.costs
    }

    pub fn costs_mut(&mut self) -> &mut CostList<D> {
        &mut self.costs
    }

    /// Register `source` to `reference`.
    ///
    /// Both images are stored in `pool` under the keys of the
    /// configuration, so the cost terms must read from the same pool.
    /// With normalization enabled, both images get one joint linear
    /// intensity mapping first; if both are constant there is nothing to
    /// register and the identity transformation is returned.
    pub fn run_images(
        &mut self,
        pool: &ImagePool<D>,
        source: &Image<D>,
        reference: &Image<D>,
    ) -> Result<Box<dyn Transformation<D>>> {
        if source.size() != reference.size() {
            return Err(CoreError::size_mismatch(&reference.size().dims(), &source.size().dims()).into());
        }

        let (source, reference) = if self.config.normalize_intensities {
            match JointNormalization.compute(source, reference) {
                Some(scaling) => (scaling.apply(source), scaling.apply(reference)),
                None => {
                    warn!("Both images are constant, returning the identity");
                    return Ok(self.factory.create(source.size())?);
                }
            }
        } else {
            (source.clone(), reference.clone())
        };

        pool.insert(self.config.source_key(), source);
        pool.insert(self.config.reference_key(), reference);
        self.run()
    }

    /// Run the registration on the data the cost terms read.
    ///
    /// # Errors
    /// Configuration errors are reported before any minimizer runs.
    /// Errors of the cost terms, minimizers and transformations
    /// propagate unchanged; no partial result is returned.
    pub fn run(&mut self) -> Result<Box<dyn Transformation<D>>> {
        self.progress.start();
        let result = self.run_levels();
        match &result {
            Ok(_) => self.progress.complete(),
            Err(e) => self.progress.error(&e.to_string()),
        }
        result
    }

    fn run_levels(&mut self) -> Result<Box<dyn Transformation<D>>> {
        if self.costs.is_empty() {
            return Err(RegistrationError::invalid_configuration(
                "No cost terms given",
            ));
        }

        self.costs.reinit()?;
        let global = self.costs.full_size().ok_or_else(|| {
            RegistrationError::size_disagreement(
                "the cost terms do not report one common problem size",
            )
        })?;

        let levels = self.config.mg_levels;
        validate_levels(global, levels)?;
        info!("Registration of size {} in {} levels", global, levels);

        let mut transform: Option<Box<dyn Transformation<D>>> = None;
        for (i, local) in pyramid_sizes(global, levels).into_iter().enumerate() {
            let level = levels - 1 - i;

            let mut current = match transform.take() {
                None => {
                    info!("Create {} transformation at size {}", self.factory.name(), local);
                    self.factory.create(local)?
                }
                Some(previous) => {
                    info!("Upscale {} transformation to size {}", previous.name(), local);
                    previous.upscale(local)?
                }
            };
            self.costs.set_size(local)?;

            let mut level_info = LevelInfo {
                level,
                levels,
                size: local.dims().to_vec(),
                degrees_of_freedom: current.degrees_of_freedom(),
                refinements: 0,
            };
            self.progress.level_start(&level_info);

            self.optimize(current.as_mut(), level, 0)?;
            while current.refine() {
                level_info.refinements += 1;
                info!(
                    "Refined {} transformation, now {} parameters",
                    current.name(),
                    current.degrees_of_freedom()
                );
                self.optimize(current.as_mut(), level, level_info.refinements)?;
            }

            level_info.degrees_of_freedom = current.degrees_of_freedom();
            self.progress.level_complete(&level_info);
            transform = Some(current);
        }

        transform.ok_or_else(|| RegistrationError::invalid_configuration("No pyramid level was run"))
    }

    /// One optimization epoch on a fresh problem.
    fn optimize(&mut self, transform: &mut dyn Transformation<D>, level: usize, pass: usize) -> Result<()> {
        let mut problem =
            RegistrationProblem::new(&self.costs, transform).with_progress(level, pass, &self.progress);
        let mut x = problem.parameters();

        let status = self.minimizer.run(&mut problem, &mut x)?;
        report_status(self.minimizer.name(), status, level);

        if let Some(refinement) = self.refinement.as_mut() {
            let status = refinement.run(&mut problem, &mut x)?;
            report_status(refinement.name(), status, level);
        }
        drop(problem);

        transform.set_parameters(&x);
        Ok(())
    }
}

fn report_status(name: &str, status: MinimizerStatus, level: usize) {
    if status.is_soft() {
        warn!("{} stopped with {:?} at level {}, continuing", name, status, level);
    } else {
        info!("{} converged at level {}", name, level);
    }
}
