//! Cubic B-spline transform implementation.
//!
//! The displacement is a tensor product of uniform cubic B-splines whose
//! coefficients sit on a control grid with a spacing of `rate` pixels.
//! Control point `j` is located at pixel `(j - 1) * rate`, so the grid
//! carries one extra control point before the first pixel and two after
//! the last one.

use rayon::prelude::*;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::image::VectorField;
use crate::spatial::{GridSize, Vector};
use super::penalty::membrane_energy;
use super::trait_::{check_size, Transformation, TransformationFactory};

/// Uniform cubic B-spline basis weights for fractional position `u`.
fn cubic_weights(u: f64) -> [f64; 4] {
    let u2 = u * u;
    let u3 = u2 * u;
    let v = 1.0 - u;
    [
        v * v * v / 6.0,
        (3.0 * u3 - 6.0 * u2 + 4.0) / 6.0,
        (-3.0 * u3 + 3.0 * u2 + 3.0 * u + 1.0) / 6.0,
        u3 / 6.0,
    ]
}

/// Control grid extent for `n` pixels at the given rate.
fn control_extent(n: usize, rate: f64) -> usize {
    ((n - 1) as f64 / rate).floor() as usize + 4
}

fn control_size<const D: usize>(size: GridSize<D>, rate: f64) -> GridSize<D> {
    let mut dims = [0; D];
    for d in 0..D {
        dims[d] = control_extent(size[d], rate);
    }
    GridSize::new(dims)
}

/// First supporting control point and basis weights of every pixel of one axis.
#[derive(Debug, Clone)]
struct AxisSupport {
    start: Vec<usize>,
    weights: Vec<[f64; 4]>,
}

impl AxisSupport {
    fn new(n: usize, rate: f64) -> Self {
        let mut start = Vec::with_capacity(n);
        let mut weights = Vec::with_capacity(n);
        for x in 0..n {
            let t = x as f64 / rate + 1.0;
            let base = t.floor();
            start.push(base as usize - 1);
            weights.push(cubic_weights(t - base));
        }
        Self { start, weights }
    }
}

/// Cubic B-spline transform.
///
/// Parameters are the control point coefficients, stored point by point
/// with interleaved components.
#[derive(Debug, Clone)]
pub struct BSplineTransform<const D: usize> {
    size: GridSize<D>,
    rate: f64,
    target_rate: f64,
    coefficients: VectorField<D>,
    support: Vec<AxisSupport>,
    penalty_weight: Option<f64>,
}

impl<const D: usize> BSplineTransform<D> {
    /// Create an identity spline on a grid of `size` with control spacing `rate`.
    pub fn new(size: GridSize<D>, rate: f64) -> Result<Self> {
        check_size("spline", size)?;
        if !(rate.is_finite() && rate > 0.0) {
            return Err(CoreError::invalid_parameter(format!(
                "Spline rate must be positive, got {}",
                rate
            )));
        }
        Ok(Self::with_coefficients(
            size,
            rate,
            rate,
            VectorField::zeros(control_size(size, rate)),
            None,
        ))
    }

    fn with_coefficients(
        size: GridSize<D>,
        rate: f64,
        target_rate: f64,
        coefficients: VectorField<D>,
        penalty_weight: Option<f64>,
    ) -> Self {
        debug_assert_eq!(coefficients.size(), control_size(size, rate));
        let support = (0..D).map(|d| AxisSupport::new(size[d], rate)).collect();
        Self {
            size,
            rate,
            target_rate,
            coefficients,
            support,
            penalty_weight,
        }
    }

    /// Allow `refine` to halve the control spacing down to `target`.
    pub fn with_target_rate(mut self, target: f64) -> Self {
        self.target_rate = target.min(self.rate);
        self
    }

    /// Add a membrane energy penalty on the coefficients.
    pub fn with_penalty(mut self, weight: f64) -> Self {
        self.penalty_weight = Some(weight);
        self
    }

    /// Control point spacing in pixels.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn coefficients(&self) -> &VectorField<D> {
        &self.coefficients
    }

    pub fn coefficients_mut(&mut self) -> &mut VectorField<D> {
        &mut self.coefficients
    }

    /// Visit the control points supporting pixel `index` with their weights.
    fn for_each_support(&self, index: [usize; D], mut visit: impl FnMut(usize, f64)) {
        let control = self.coefficients.size();
        for combo in 0..(1usize << (2 * D)) {
            let mut weight = 1.0;
            let mut c = [0usize; D];
            for d in 0..D {
                let k = (combo >> (2 * d)) & 3;
                let axis = &self.support[d];
                c[d] = axis.start[index[d]] + k;
                weight *= axis.weights[index[d]][k];
            }
            if weight != 0.0 {
                visit(control.linear_index(c), weight);
            }
        }
    }

    /// Sample the current coefficients at new control points.
    ///
    /// `position(d, j)` is the continuous control index in the current grid
    /// corresponding to new control point `j` along `d`.
    fn resample_coefficients(
        &self,
        control: GridSize<D>,
        position: impl Fn(usize, usize) -> f64,
        scale: &[f64; D],
    ) -> VectorField<D> {
        VectorField::from_fn(control, |j| {
            let mut point = [0.0; D];
            for d in 0..D {
                point[d] = position(d, j[d]);
            }
            self.coefficients.sample(&point).component_mul(scale)
        })
    }
}

impl<const D: usize> Transformation<D> for BSplineTransform<D> {
    fn name(&self) -> &'static str {
        "spline"
    }

    fn size(&self) -> GridSize<D> {
        self.size
    }

    fn degrees_of_freedom(&self) -> usize {
        self.coefficients.size().len() * D
    }

    fn parameters(&self) -> Vec<f64> {
        self.coefficients.as_slice().iter().flat_map(|v| v.to_array()).collect()
    }

    fn set_parameters(&mut self, params: &[f64]) {
        assert_eq!(params.len(), self.degrees_of_freedom(), "Parameter count must match degrees of freedom");
        for (v, chunk) in self.coefficients.as_mut_slice().iter_mut().zip(params.chunks_exact(D)) {
            *v = Vector::from_slice(chunk);
        }
    }

    fn upscale(&self, size: GridSize<D>) -> Result<Box<dyn Transformation<D>>> {
        check_size(self.name(), size)?;
        let ratio = self.size.ratio_to(&size);
        let rate = self.rate;
        let control = control_size(size, rate);
        let coefficients = self.resample_coefficients(
            control,
            |d, j| ((j as f64 - 1.0) * rate / ratio[d]) / rate + 1.0,
            &ratio,
        );
        Ok(Box::new(Self::with_coefficients(
            size,
            rate,
            self.target_rate,
            coefficients,
            self.penalty_weight,
        )))
    }

    fn refine(&mut self) -> bool {
        let rate = (self.rate * 0.5).max(self.target_rate);
        if rate >= self.rate {
            return false;
        }
        let old_rate = self.rate;
        let control = control_size(self.size, rate);
        let coefficients = self.resample_coefficients(
            control,
            |_, j| (j as f64 - 1.0) * rate / old_rate + 1.0,
            &[1.0; D],
        );
        debug!(
            old_rate,
            new_rate = rate,
            control_points = control.len(),
            "Refined spline control grid"
        );
        *self = Self::with_coefficients(self.size, rate, self.target_rate, coefficients, self.penalty_weight);
        true
    }

    fn has_energy_penalty(&self) -> bool {
        self.penalty_weight.is_some()
    }

    fn energy_penalty(&self) -> f64 {
        match self.penalty_weight {
            Some(w) => membrane_energy(self.coefficients.size(), self.coefficients.as_slice(), w, None),
            None => 0.0,
        }
    }

    fn energy_penalty_and_gradient(&self, gradient: &mut [f64]) -> f64 {
        match self.penalty_weight {
            Some(w) => membrane_energy(self.coefficients.size(), self.coefficients.as_slice(), w, Some(gradient)),
            None => {
                gradient.fill(0.0);
                0.0
            }
        }
    }

    fn displacement(&self, index: [usize; D]) -> Vector<D> {
        let coefs = self.coefficients.as_slice();
        let mut u = Vector::zeros();
        self.for_each_support(index, |c, w| u += coefs[c] * w);
        u
    }

    fn translate(&self, force: &VectorField<D>, gradient: &mut [f64]) {
        assert_eq!(force.size(), self.size, "Force field and transformation grid differ");
        let dof = self.degrees_of_freedom();
        assert_eq!(gradient.len(), dof, "Gradient length must match degrees of freedom");

        let forces = force.as_slice();
        let partial = (0..self.size.len())
            .into_par_iter()
            .fold(
                || vec![0.0; dof],
                |mut acc, offset| {
                    let f = forces[offset];
                    self.for_each_support(self.size.index_of(offset), |c, w| {
                        for d in 0..D {
                            acc[c * D + d] += w * f[d];
                        }
                    });
                    acc
                },
            )
            .reduce(
                || vec![0.0; dof],
                |mut a, b| {
                    for (x, y) in a.iter_mut().zip(b) {
                        *x += y;
                    }
                    a
                },
            );
        for (g, p) in gradient.iter_mut().zip(partial) {
            *g += p;
        }
    }
}

/// Factory for `BSplineTransform`.
#[derive(Debug, Clone, Copy)]
pub struct BSplineFactory {
    rate: f64,
    target_rate: Option<f64>,
    penalty_weight: Option<f64>,
}

impl BSplineFactory {
    /// Create a factory for splines with control spacing `rate`.
    pub fn new(rate: f64) -> Result<Self> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(CoreError::invalid_parameter(format!(
                "Spline rate must be positive, got {}",
                rate
            )));
        }
        Ok(Self {
            rate,
            target_rate: None,
            penalty_weight: None,
        })
    }

    /// Let created splines refine down to control spacing `target`.
    pub fn with_target_rate(mut self, target: f64) -> Result<Self> {
        if !(target.is_finite() && target > 0.0) {
            return Err(CoreError::invalid_parameter(format!(
                "Spline target rate must be positive, got {}",
                target
            )));
        }
        self.target_rate = Some(target);
        Ok(self)
    }

    /// Give created splines a membrane penalty of `weight`.
    pub fn with_penalty(mut self, weight: f64) -> Result<Self> {
        if !(weight >= 0.0) {
            return Err(CoreError::invalid_parameter(format!(
                "Penalty weight must be non-negative, got {}",
                weight
            )));
        }
        self.penalty_weight = Some(weight);
        Ok(self)
    }
}

impl<const D: usize> TransformationFactory<D> for BSplineFactory {
    fn name(&self) -> &'static str {
        "spline"
    }

    fn create(&self, size: GridSize<D>) -> Result<Box<dyn Transformation<D>>> {
        let mut transform = BSplineTransform::new(size, self.rate)?;
        if let Some(target) = self.target_rate {
            transform = transform.with_target_rate(target);
        }
        transform.penalty_weight = self.penalty_weight;
        Ok(Box::new(transform))
    }
}
