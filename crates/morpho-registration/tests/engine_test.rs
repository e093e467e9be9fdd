mod common;

use common::{shared_log, MockCost, MockFactory, MockMinimizer, MockTransform};
use morpho_core::transform::TranslationTransform;
use morpho_core::{GridSize, Image, ImagePool, Vector};
use morpho_registration::cost::{ImageCost, Ssd};
use morpho_registration::optimizer::{MinimizerStatus, Problem};
use morpho_registration::{
    pyramid_sizes, CostList, HistoryCallback, MultiResolutionRegistration, ProgressTracker,
    RegistrationConfig, RegistrationError, RegistrationProblem,
};
use proptest::prelude::*;
use std::sync::Arc;

fn engine(
    costs: CostList<2>,
    factory: MockFactory,
    minimizer: MockMinimizer,
    levels: usize,
) -> MultiResolutionRegistration<2> {
    MultiResolutionRegistration::new(
        costs,
        Box::new(minimizer),
        Box::new(factory),
        RegistrationConfig::new().with_mg_levels(levels),
    )
}

#[test]
fn test_full_size_consensus() {
    let log = shared_log();
    let costs = CostList::new()
        .with(MockCost::new(1.0, Some([4, 4]), &log))
        .with(MockCost::new(2.0, Some([4, 4]), &log));
    assert_eq!(costs.full_size(), Some(GridSize::new([4, 4])));
}

#[test]
fn test_size_disagreement_aborts_before_minimizer() {
    let log = shared_log();
    let costs = CostList::new()
        .with(MockCost::new(1.0, Some([4, 4]), &log))
        .with(MockCost::new(1.0, Some([4, 5]), &log));
    assert_eq!(costs.full_size(), None);

    let factory = MockFactory { dof: 2, refine_to: None, log: log.clone() };
    let mut reg = engine(costs, factory, MockMinimizer::new("primary", &log), 2);
    let err = reg.run().err().unwrap();
    assert!(matches!(err, RegistrationError::SizeDisagreement(_)));

    let log = log.lock().unwrap();
    assert!(log.problem_sizes.is_empty());
    assert!(log.creates.is_empty());
    assert!(log.set_sizes.is_empty());
}

#[test]
fn test_no_cost_terms_is_a_configuration_error() {
    let log = shared_log();
    let factory = MockFactory { dof: 2, refine_to: None, log: log.clone() };
    let mut reg = engine(CostList::new(), factory, MockMinimizer::new("primary", &log), 1);
    assert!(matches!(reg.run(), Err(RegistrationError::InvalidConfiguration(_))));
}

#[test]
fn test_too_many_levels_is_a_configuration_error() {
    let log = shared_log();
    let costs = CostList::new().with(MockCost::new(1.0, Some([4, 4]), &log));
    let factory = MockFactory { dof: 2, refine_to: None, log: log.clone() };
    let mut reg = engine(costs, factory, MockMinimizer::new("primary", &log), 4);
    assert!(matches!(reg.run(), Err(RegistrationError::InvalidConfiguration(_))));
    assert!(log.lock().unwrap().problem_sizes.is_empty());
}

#[test]
fn test_two_level_scenario() {
    let log = shared_log();
    let costs = CostList::new().with(MockCost::new(1.0, Some([4, 4]), &log));
    let factory = MockFactory { dof: 2, refine_to: None, log: log.clone() };
    let mut reg = engine(costs, factory, MockMinimizer::new("primary", &log), 2);
    let result = reg.run().unwrap();
    assert_eq!(result.size(), GridSize::new([4, 4]));

    let log = log.lock().unwrap();
    assert_eq!(log.set_sizes, vec![GridSize::new([2, 2]), GridSize::new([4, 4])]);
    assert_eq!(log.creates, vec![GridSize::new([2, 2])]);
    assert_eq!(log.upscales, vec![GridSize::new([4, 4])]);
    assert_eq!(log.reinits, 1);
    assert_eq!(log.problem_sizes, vec![2, 2]);
}

#[test]
fn test_parameters_carry_over_and_improve() {
    let log = shared_log();
    let costs = CostList::new().with(MockCost::new(1.0, Some([8, 8]), &log));
    let factory = MockFactory { dof: 3, refine_to: None, log: log.clone() };
    let mut reg = engine(costs, factory, MockMinimizer::new("primary", &log), 3);
    let result = reg.run().unwrap();
    // Three levels of three halving steps towards 1.0.
    for p in result.parameters() {
        assert!((p - (1.0 - 0.5f64.powi(9))).abs() < 1e-12);
    }
}

#[test]
fn test_refine_reoptimizes_with_new_size() {
    let log = shared_log();
    let costs = CostList::new().with(MockCost::new(1.0, Some([4, 4]), &log));
    let factory = MockFactory { dof: 2, refine_to: Some(5), log: log.clone() };
    let mut reg = engine(costs, factory, MockMinimizer::new("primary", &log), 1);
    let result = reg.run().unwrap();
    assert_eq!(result.degrees_of_freedom(), 5);
    assert_eq!(log.lock().unwrap().problem_sizes, vec![2, 5]);
}

#[test]
fn test_refinement_minimizer_runs_after_primary() {
    let log = shared_log();
    let costs = CostList::new().with(MockCost::new(1.0, Some([4, 4]), &log));
    let factory = MockFactory { dof: 2, refine_to: None, log: log.clone() };
    let mut reg = engine(costs, factory, MockMinimizer::new("primary", &log), 2)
        .with_refinement_minimizer(Box::new(MockMinimizer::new("secondary", &log)));
    reg.run().unwrap();
    assert_eq!(
        log.lock().unwrap().minimizer_runs,
        vec!["primary", "secondary", "primary", "secondary"]
    );
}

#[test]
fn test_soft_status_continues() {
    let log = shared_log();
    let costs = CostList::new().with(MockCost::new(1.0, Some([4, 4]), &log));
    let factory = MockFactory { dof: 2, refine_to: None, log: log.clone() };
    let mut minimizer = MockMinimizer::new("primary", &log);
    minimizer.status = MinimizerStatus::StepLimit;
    let mut reg = engine(costs, factory, minimizer, 2);
    assert!(reg.run().is_ok());
    assert_eq!(log.lock().unwrap().problem_sizes.len(), 2);
}

#[test]
fn test_minimizer_failure_propagates() {
    let log = shared_log();
    let costs = CostList::new().with(MockCost::new(1.0, Some([4, 4]), &log));
    let factory = MockFactory { dof: 2, refine_to: None, log: log.clone() };
    let mut minimizer = MockMinimizer::new("primary", &log);
    minimizer.fail = true;
    let mut reg = engine(costs, factory, minimizer, 2);
    assert!(matches!(reg.run(), Err(RegistrationError::OptimizerError(_))));
    assert_eq!(log.lock().unwrap().problem_sizes.len(), 1);
}

#[test]
fn test_progress_reports_levels_and_evaluations() {
    let log = shared_log();
    let history = Arc::new(HistoryCallback::new());
    let costs = CostList::new().with(MockCost::new(1.0, Some([8, 8]), &log));
    let factory = MockFactory { dof: 2, refine_to: Some(4), log: log.clone() };
    let mut reg = engine(costs, factory, MockMinimizer::new("primary", &log), 2)
        .with_progress(ProgressTracker::new().with_callback(history.clone()));
    reg.run().unwrap();

    let levels = history.get_levels();
    assert_eq!(levels.len(), 2);
    assert_eq!(levels[0].level, 1);
    assert_eq!(levels[0].size, vec![4, 4]);
    assert_eq!(levels[0].refinements, 1);
    assert_eq!(levels[1].refinements, 0);
    assert_eq!(levels[1].degrees_of_freedom, 4);

    let evaluations = history.get_history();
    // Three steps per epoch: level 1 before and after refinement, level 0.
    assert_eq!(evaluations.len(), 9);
    assert_eq!(evaluations[0].ratio, 1.0);
    assert_eq!(evaluations[3].func_evals, 1);
    assert_eq!(evaluations[3].pass, 1);
    assert_eq!(evaluations[6].pass, 0);
    assert_eq!(evaluations[6].level, 0);
}

#[test]
fn test_gradient_additivity() {
    let log = shared_log();
    let t = MockTransform {
        size: GridSize::new([4, 4]),
        params: vec![0.5, -1.0, 2.0],
        refine_to: None,
        log: log.clone(),
    };
    let a = CostList::new().with(MockCost::new(0.5, None, &log));
    let b = CostList::new().with(MockCost::new(3.0, None, &log));
    let both = CostList::new()
        .with(MockCost::new(0.5, None, &log))
        .with(MockCost::new(3.0, None, &log));

    let (mut ga, mut gb, mut gab) = (vec![0.0; 3], vec![0.0; 3], vec![0.0; 3]);
    let va = a.evaluate(&t, &mut ga).unwrap();
    let vb = b.evaluate(&t, &mut gb).unwrap();
    let vab = both.evaluate(&t, &mut gab).unwrap();
    assert!((vab - (va + vb)).abs() < 1e-12);
    for i in 0..3 {
        assert!((gab[i] - (ga[i] + gb[i])).abs() < 1e-12);
    }
    assert!((both.value(&t).unwrap() - vab).abs() < 1e-12);
}

#[test]
fn test_idempotent_reinit() {
    let log = shared_log();
    let mut costs = CostList::new().with(MockCost::new(2.0, Some([4, 4]), &log));
    let t = MockTransform {
        size: GridSize::new([4, 4]),
        params: vec![0.25, 3.0],
        refine_to: None,
        log: log.clone(),
    };
    costs.reinit().unwrap();
    costs.set_size(GridSize::new([4, 4])).unwrap();
    let first = costs.value(&t).unwrap();
    costs.reinit().unwrap();
    costs.set_size(GridSize::new([4, 4])).unwrap();
    assert_eq!(costs.value(&t).unwrap(), first);
}

#[test]
fn test_idempotent_reinit_with_image_cost() {
    let size = GridSize::new([6, 5]);
    let pool = Arc::new(ImagePool::new());
    pool.insert("src.@", Image::from_fn(size, |[x, y]| (x * x + y) as f32));
    pool.insert("ref.@", Image::from_fn(size, |[x, y]| (x + 2 * y) as f32));
    let mut costs = CostList::new().with(ImageCost::new(pool.clone(), "src.@", "ref.@", Ssd));
    let half = GridSize::new([3, 2]);
    let t = TranslationTransform::with_shift(half, Vector::new([0.5, -0.25]));

    costs.reinit().unwrap();
    costs.set_size(half).unwrap();
    let first = costs.value(&t).unwrap();

    // A reinit drops the working level until the next set_size.
    costs.reinit().unwrap();
    assert!(matches!(costs.value(&t), Err(RegistrationError::Data(_))));
    costs.set_size(half).unwrap();
    assert_eq!(costs.value(&t).unwrap(), first);
}

proptest! {
    #[test]
    fn test_level_monotonicity(nx in 1usize..200, ny in 1usize..200, levels in 1usize..6) {
        let global = GridSize::new([nx, ny]);
        let sizes = pyramid_sizes(global, levels);
        prop_assert_eq!(sizes.len(), levels);
        prop_assert_eq!(*sizes.last().unwrap(), global);
        for (i, size) in sizes.iter().enumerate() {
            let factor = 1usize << (levels - 1 - i);
            prop_assert_eq!(*size, GridSize::new([nx / factor, ny / factor]));
        }
        for pair in sizes.windows(2) {
            prop_assert!(pair[0][0] <= pair[1][0] && pair[0][1] <= pair[1][1]);
        }
    }

    #[test]
    fn test_engine_follows_pyramid(nx in 8usize..64, ny in 8usize..64, levels in 1usize..4) {
        let log = shared_log();
        let costs = CostList::new().with(MockCost::new(1.0, Some([nx, ny]), &log));
        let factory = MockFactory { dof: 1, refine_to: None, log: log.clone() };
        let mut reg = engine(costs, factory, MockMinimizer::new("primary", &log), levels);
        reg.run().unwrap();
        let log = log.lock().unwrap();
        prop_assert_eq!(&log.set_sizes, &pyramid_sizes(GridSize::new([nx, ny]), levels));
        prop_assert_eq!(log.upscales.len(), levels - 1);
    }

    #[test]
    fn test_adapter_consistency(
        params in proptest::collection::vec(-5.0f64..5.0, 1..8),
        w1 in 0.0f64..4.0,
        w2 in 0.0f64..4.0,
    ) {
        let log = shared_log();
        let costs = CostList::new()
            .with(MockCost::new(w1, None, &log))
            .with(MockCost::new(w2, None, &log));
        let mut t = MockTransform {
            size: GridSize::new([4, 4]),
            params: vec![0.0; params.len()],
            refine_to: None,
            log: log.clone(),
        };
        let mut problem = RegistrationProblem::new(&costs, &mut t);
        prop_assert_eq!(problem.size(), params.len());

        let value = problem.f(&params).unwrap();
        let mut g_df = vec![123.0; params.len()];
        problem.df(&params, &mut g_df).unwrap();
        let mut g_fdf = vec![-7.0; params.len()];
        let value_fdf = problem.fdf(&params, &mut g_fdf).unwrap();

        prop_assert_eq!(value, value_fdf);
        prop_assert_eq!(g_df, g_fdf);
        prop_assert_eq!(problem.func_evals(), 2);
        prop_assert_eq!(problem.grad_evals(), 2);
    }
}
