//! Mock collaborators shared by the engine tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use morpho_core::transform::{Transformation, TransformationFactory};
use morpho_core::{GridSize, Vector, VectorField};
use morpho_registration::cost::CostTerm;
use morpho_registration::optimizer::{Minimizer, MinimizerStatus, Problem};
use morpho_registration::{RegistrationError, Result};

/// Everything the mocks observed, in call order.
#[derive(Debug, Default)]
pub struct Log {
    pub set_sizes: Vec<GridSize<2>>,
    pub reinits: usize,
    pub creates: Vec<GridSize<2>>,
    pub upscales: Vec<GridSize<2>>,
    pub problem_sizes: Vec<usize>,
    pub minimizer_runs: Vec<&'static str>,
}

pub type SharedLog = Arc<Mutex<Log>>;

pub fn shared_log() -> SharedLog {
    Arc::new(Mutex::new(Log::default()))
}

/// Transformation with free parameters and no spatial effect.
pub struct MockTransform {
    pub size: GridSize<2>,
    pub params: Vec<f64>,
    pub refine_to: Option<usize>,
    pub log: SharedLog,
}

impl Transformation<2> for MockTransform {
    fn name(&self) -> &'static str {
        "mock"
    }
    fn size(&self) -> GridSize<2> {
        self.size
    }
    fn degrees_of_freedom(&self) -> usize {
        self.params.len()
    }
    fn parameters(&self) -> Vec<f64> {
        self.params.clone()
    }
    fn set_parameters(&mut self, params: &[f64]) {
        assert_eq!(params.len(), self.params.len());
        self.params.copy_from_slice(params);
    }
    fn upscale(&self, size: GridSize<2>) -> morpho_core::Result<Box<dyn Transformation<2>>> {
        self.log.lock().unwrap().upscales.push(size);
        Ok(Box::new(MockTransform {
            size,
            params: self.params.clone(),
            refine_to: self.refine_to,
            log: self.log.clone(),
        }))
    }
    fn refine(&mut self) -> bool {
        match self.refine_to.take() {
            Some(n) => {
                self.params = vec![0.0; n];
                true
            }
            None => false,
        }
    }
    fn displacement(&self, _index: [usize; 2]) -> Vector<2> {
        Vector::zeros()
    }
    fn translate(&self, _force: &VectorField<2>, _gradient: &mut [f64]) {}
}

pub struct MockFactory {
    pub dof: usize,
    pub refine_to: Option<usize>,
    pub log: SharedLog,
}

impl TransformationFactory<2> for MockFactory {
    fn name(&self) -> &'static str {
        "mock"
    }
    fn create(&self, size: GridSize<2>) -> morpho_core::Result<Box<dyn Transformation<2>>> {
        self.log.lock().unwrap().creates.push(size);
        Ok(Box::new(MockTransform {
            size,
            params: vec![0.0; self.dof],
            refine_to: self.refine_to,
            log: self.log.clone(),
        }))
    }
}

/// Cost `weight * sum (p_i - target)^2` over the transformation parameters.
pub struct MockCost {
    pub weight: f64,
    pub target: f64,
    pub full: Option<GridSize<2>>,
    pub log: SharedLog,
}

impl MockCost {
    pub fn new(weight: f64, full: Option<[usize; 2]>, log: &SharedLog) -> Self {
        Self {
            weight,
            target: 1.0,
            full: full.map(GridSize::new),
            log: log.clone(),
        }
    }
}

impl CostTerm<2> for MockCost {
    fn name(&self) -> &str {
        "mock"
    }
    fn weight(&self) -> f64 {
        self.weight
    }
    fn reinit(&mut self) -> Result<()> {
        self.log.lock().unwrap().reinits += 1;
        Ok(())
    }
    fn set_size(&mut self, size: GridSize<2>) -> Result<()> {
        self.log.lock().unwrap().set_sizes.push(size);
        Ok(())
    }
    fn value(&self, transform: &dyn Transformation<2>) -> Result<f64> {
        let p = transform.parameters();
        Ok(self.weight * p.iter().map(|v| (v - self.target).powi(2)).sum::<f64>())
    }
    fn evaluate(&self, transform: &dyn Transformation<2>, gradient: &mut [f64]) -> Result<f64> {
        let p = transform.parameters();
        for (g, v) in gradient.iter_mut().zip(&p) {
            *g += self.weight * 2.0 * (v - self.target);
        }
        self.value(transform)
    }
    fn full_size(&self, size: &mut Option<GridSize<2>>) -> bool {
        match (self.full, *size) {
            (None, _) => true,
            (Some(mine), None) => {
                *size = Some(mine);
                true
            }
            (Some(mine), Some(other)) => mine == other,
        }
    }
}

/// Minimizer taking a few fixed gradient steps and recording what it saw.
pub struct MockMinimizer {
    pub name: &'static str,
    pub steps: usize,
    pub status: MinimizerStatus,
    pub fail: bool,
    pub log: SharedLog,
}

impl MockMinimizer {
    pub fn new(name: &'static str, log: &SharedLog) -> Self {
        Self {
            name,
            steps: 3,
            status: MinimizerStatus::Converged,
            fail: false,
            log: log.clone(),
        }
    }
}

impl Minimizer for MockMinimizer {
    fn name(&self) -> &'static str {
        self.name
    }
    fn run(&mut self, problem: &mut dyn Problem, x: &mut [f64]) -> Result<MinimizerStatus> {
        {
            let mut log = self.log.lock().unwrap();
            log.problem_sizes.push(problem.size());
            log.minimizer_runs.push(self.name);
        }
        assert_eq!(x.len(), problem.size());
        if self.fail {
            return Err(RegistrationError::optimizer("mock failure"));
        }
        let mut g = vec![0.0; x.len()];
        for _ in 0..self.steps {
            problem.fdf(x, &mut g)?;
            for (xi, gi) in x.iter_mut().zip(&g) {
                *xi -= 0.25 * gi;
            }
        }
        Ok(self.status)
    }
}
