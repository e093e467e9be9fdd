use std::sync::Arc;

use morpho_core::transform::{Transformation, TransformationFactory, TranslationFactory};
use morpho_core::{GridSize, Image, ImagePool};
use morpho_registration::cost::{DiffusionRegularizer, ImageCost, Ncc, Ssd};
use morpho_registration::optimizer::{
    GradientDescent, GradientDescentConfig, Lbfgs, LbfgsConfig, Minimizer,
};
use morpho_registration::{
    CostList, MultiResolutionRegistration, RegistrationConfig, RegistrationProblem, Result,
    SeriesRegistration,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn blob(size: GridSize<2>, cx: f64, cy: f64, sigma: f64) -> Image<2> {
    Image::from_fn(size, |[x, y]| {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp() as f32
    })
}

fn gradient_descent() -> GradientDescent {
    let config = GradientDescentConfig::new()
        .with_steps(0.001, 2.0)
        .with_xtol(1e-8)
        .with_max_iterations(300);
    GradientDescent::new(config).unwrap()
}

fn ssd_engine(pool: &Arc<ImagePool<2>>, config: RegistrationConfig) -> MultiResolutionRegistration<2> {
    let costs = CostList::new().with(ImageCost::new(
        pool.clone(),
        config.source_key(),
        config.reference_key(),
        Ssd,
    ));
    MultiResolutionRegistration::new(
        costs,
        Box::new(gradient_descent()),
        Box::new(TranslationFactory),
        config,
    )
}

#[test]
fn test_registration_translation_2d() {
    init_tracing();
    let size = GridSize::new([32, 32]);
    // The study blob sits at (+2, +1) from the reference blob, so
    // source(x + t) matches reference(x) for t = (2, 1).
    let source = blob(size, 17.0, 16.0, 4.0);
    let reference = blob(size, 15.0, 15.0, 4.0);

    let pool = Arc::new(ImagePool::new());
    let mut reg = ssd_engine(&pool, RegistrationConfig::new().with_mg_levels(2));
    let transform = reg.run_images(&pool, &source, &reference).unwrap();

    let shift = transform.parameters();
    assert!((shift[0] - 2.0).abs() < 0.1, "shift = {:?}", shift);
    assert!((shift[1] - 1.0).abs() < 0.1, "shift = {:?}", shift);
    assert!(pool.contains("src.@"));
    assert!(pool.contains("ref.@"));
}

fn ssd(a: &Image<2>, b: &Image<2>) -> f64 {
    a.data()
        .iter()
        .zip(b.data())
        .map(|(&x, &y)| (x as f64 - y as f64).powi(2))
        .sum()
}

#[test]
fn test_coarse_optimum_carries_to_full_resolution() {
    init_tracing();
    let full = GridSize::new([32, 32]);
    let coarse = GridSize::new([8, 8]);
    let pool = Arc::new(ImagePool::new());
    pool.insert("src.@", blob(full, 16.0, 14.0, 3.0));
    pool.insert("ref.@", blob(full, 12.0, 14.0, 3.0));
    let mut costs = CostList::new().with(ImageCost::new(pool.clone(), "src.@", "ref.@", Ssd));
    costs.reinit().unwrap();
    costs.set_size(coarse).unwrap();

    let mut transform = TransformationFactory::<2>::create(&TranslationFactory, coarse).unwrap();
    let config = GradientDescentConfig::new()
        .with_steps(1e-4, 1.0)
        .with_xtol(1e-8)
        .with_max_iterations(500);
    let mut minimizer = GradientDescent::new(config).unwrap();
    let mut problem = RegistrationProblem::new(&costs, transform.as_mut());
    let mut x = problem.parameters();
    minimizer.run(&mut problem, &mut x).unwrap();
    drop(problem);
    transform.set_parameters(&x);

    // A shift of 4 pixels is one pixel on the coarse grid.
    assert!((x[0] - 1.0).abs() < 0.0125, "coarse shift = {:?}", x);
    let shift = transform.upscale(full).unwrap().parameters();
    assert!((shift[0] - 4.0).abs() < 0.05, "upscaled shift = {:?}", shift);
    assert!(shift[1].abs() < 0.05, "upscaled shift = {:?}", shift);
}

#[test]
fn test_registration_ncc_with_lbfgs_polish() {
    init_tracing();
    let size = GridSize::new([24, 24]);
    let source = blob(size, 13.0, 12.0, 3.5);
    let reference = blob(size, 12.0, 12.0, 3.5);

    let pool = Arc::new(ImagePool::new());
    let config = RegistrationConfig::new().with_mg_levels(1);
    let costs = CostList::new()
        .with(ImageCost::new(pool.clone(), config.source_key(), config.reference_key(), Ncc))
        .with(DiffusionRegularizer::new(0.01));
    let mut reg = MultiResolutionRegistration::new(
        costs,
        Box::new(gradient_descent()),
        Box::new(TranslationFactory),
        config,
    )
    .with_refinement_minimizer(Box::new(Lbfgs::new(LbfgsConfig::default()).unwrap()));

    let transform = reg.run_images(&pool, &source, &reference).unwrap();
    let u = transform.displacement([12, 12]);
    assert!((u[0] - 1.0).abs() < 0.1, "displacement = {:?}", u);
    assert!(u[1].abs() < 0.1, "displacement = {:?}", u);
}

#[test]
fn test_constant_images_give_identity() {
    let size = GridSize::new([8, 8]);
    let image = Image::filled(size, 3.0);
    let pool = Arc::new(ImagePool::new());
    let mut reg = ssd_engine(&pool, RegistrationConfig::new().with_mg_levels(2));
    let transform = reg.run_images(&pool, &image, &image).unwrap();
    assert_eq!(transform.size(), size);
    assert_eq!(transform.parameters(), vec![0.0, 0.0]);
    assert!(!pool.contains("src.@"));
}

#[test]
fn test_mismatched_images_are_rejected() {
    let pool = Arc::new(ImagePool::new());
    let mut reg = ssd_engine(&pool, RegistrationConfig::new());
    let a = Image::filled(GridSize::new([8, 8]), 0.0);
    let b = Image::filled(GridSize::new([8, 9]), 0.0);
    assert!(reg.run_images(&pool, &a, &b).is_err());
}

#[test]
fn test_series_registers_to_middle_frame() {
    init_tracing();
    let size = GridSize::new([20, 20]);
    let frames: Vec<Image<2>> = (0..3).map(|k| blob(size, 9.0 + k as f64, 10.0, 3.0)).collect();

    let pool = Arc::new(ImagePool::new());
    let series = SeriesRegistration::new(RegistrationConfig::new().with_mg_levels(1));
    let build = |config: RegistrationConfig| -> Result<MultiResolutionRegistration<2>> {
        Ok(ssd_engine(&pool, config))
    };
    let result = series.run(&pool, &frames, build).unwrap();

    assert_eq!(result.transforms.len(), 3);
    assert!(result.transforms[1].is_none());
    let first = result.transforms[0].as_ref().unwrap().parameters();
    let last = result.transforms[2].as_ref().unwrap().parameters();
    assert!((first[0] + 1.0).abs() < 0.15, "frame 0: {:?}", first);
    assert!((last[0] - 1.0).abs() < 0.15, "frame 2: {:?}", last);
    assert!(pool.contains("src0.@"));
    assert!(pool.contains("ref2.@"));

    assert_eq!(result.frames.len(), 3);
    assert_eq!(result.frames[1], frames[1]);
    for i in [0, 2] {
        let before = ssd(&frames[i], &frames[1]);
        let after = ssd(&result.frames[i], &frames[1]);
        assert!(after < 0.1 * before, "frame {}: {} -> {}", i, before, after);
    }
}

#[test]
fn test_series_skipped_frames_pass_through() {
    let size = GridSize::new([12, 12]);
    let frames: Vec<Image<2>> = (0..3).map(|k| blob(size, 5.0 + k as f64, 6.0, 2.0)).collect();
    let pool = Arc::new(ImagePool::new());
    let series = SeriesRegistration::new(RegistrationConfig::new().with_mg_levels(1))
        .with_reference(2)
        .with_skip(1);
    let build = |config: RegistrationConfig| -> Result<MultiResolutionRegistration<2>> {
        Ok(ssd_engine(&pool, config))
    };
    let result = series.run(&pool, &frames, build).unwrap();

    assert!(result.transforms[0].is_none());
    assert!(result.transforms[1].is_some());
    assert!(result.transforms[2].is_none());
    assert_eq!(result.frames[0], frames[0]);
    assert_eq!(result.frames[2], frames[2]);
    assert!(!pool.contains("src0.@"));
}
