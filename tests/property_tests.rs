//! Property-based tests for mosaic-evo
//!
//! Uses proptest to verify invariants of the bounded memories, the adaptive
//! controller and the domain-preserving operators.

use approx::assert_relative_eq;
use mosaic_evo::algorithms::TabuList;
use mosaic_evo::genome::bounds::MultiBounds;
use mosaic_evo::genome::solution::Solution;
use mosaic_evo::hyperparameter::adaptive::{
    AdaptiveParameterController, ParameterSetting, ProblemType, Trend, TrendMethod,
};
use mosaic_evo::hyperparameter::ring_buffer::CircularBuffer;
use mosaic_evo::operators::crossover::SbxCrossover;
use mosaic_evo::operators::mutation::PolynomialMutation;
use mosaic_evo::operators::traits::{CrossoverOperator, MutationOperator};
use mosaic_evo::population::population::CostSummary;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn controller(capacity: usize, problem: ProblemType) -> AdaptiveParameterController {
    AdaptiveParameterController::new(
        capacity,
        vec![
            ParameterSetting::new("mutpb", 0.4, 0.01, 0.7),
            ParameterSetting::new("cxpb", 0.4, 0.01, 0.7),
        ],
        0.5,
        problem,
        TrendMethod::Ols,
    )
    .unwrap()
}

proptest! {
    // ==================== CircularBuffer Properties ====================

    #[test]
    fn buffer_sum_matches_recomputation(
        capacity in 1usize..16,
        values in prop::collection::vec(-1e3..1e3f64, 0..64)
    ) {
        let mut buffer = CircularBuffer::new(capacity).unwrap();
        for v in &values {
            buffer.push(*v);
        }
        let kept = buffer.values();
        prop_assert_eq!(kept.len(), values.len().min(capacity));
        prop_assert_eq!(&kept[..], &values[values.len() - kept.len()..]);
        match buffer.sum() {
            None => prop_assert!(values.is_empty()),
            Some(sum) => assert_relative_eq!(sum, kept.iter().sum::<f64>(), epsilon = 1e-6),
        }
    }

    #[test]
    fn buffer_evicts_only_when_full(
        capacity in 1usize..8,
        values in prop::collection::vec(0.0..1.0f64, 1..32)
    ) {
        let mut buffer = CircularBuffer::new(capacity).unwrap();
        for (i, v) in values.iter().enumerate() {
            let evicted = buffer.push(*v);
            if i < capacity {
                prop_assert!(evicted.is_none());
            } else {
                prop_assert_eq!(evicted, Some(values[i - capacity]));
            }
        }
    }

    // ==================== TabuList Properties ====================

    #[test]
    fn tabu_list_is_bounded_fifo(
        capacity in 1usize..8,
        genes in prop::collection::vec(0.0..1.0f64, 0..32)
    ) {
        let mut tabu = TabuList::new(capacity).unwrap();
        for g in &genes {
            tabu.admit(Solution::new(vec![*g]));
            prop_assert!(tabu.len() <= capacity);
        }
        let kept: Vec<f64> = tabu.iter().map(|s| s[0]).collect();
        let expected = &genes[genes.len() - kept.len()..];
        prop_assert_eq!(&kept[..], expected);
    }

    // ==================== Controller Properties ====================

    #[test]
    fn controller_values_stay_in_bounds(
        capacity in 2usize..12,
        observations in prop::collection::vec(-100.0..100.0f64, 0..80),
        maximize in any::<bool>()
    ) {
        let problem = if maximize { ProblemType::Maximize } else { ProblemType::Minimize };
        let mut controller = controller(capacity, problem);
        for obs in observations {
            controller.register(obs);
            for value in controller.parameters() {
                prop_assert!((0.01..=0.7).contains(value));
            }
        }
    }

    #[test]
    fn flat_window_is_stalled(capacity in 2usize..20, level in -50.0..50.0f64) {
        let mut controller = controller(capacity, ProblemType::Minimize);
        let mut last = None;
        for _ in 0..capacity {
            last = Some(controller.register(level));
        }
        let registration = last.unwrap();
        prop_assert!(registration.slope.unwrap().abs() < 1e-9);
        prop_assert_eq!(registration.trend, Some(Trend::Stalled));

        let setting = &controller.settings()[0];
        let expected = setting.saturate(0.4 + setting.velocity() / setting.adjustment_factor);
        assert_relative_eq!(controller.value("mutpb").unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn paused_controller_ignores_observations(
        observations in prop::collection::vec(-10.0..10.0f64, 1..20)
    ) {
        let mut controller = controller(2, ProblemType::Minimize);
        controller.set_enabled(false);
        for obs in observations {
            let registration = controller.register(obs);
            prop_assert!(registration.slope.is_none());
        }
        prop_assert!(controller.is_empty());
        prop_assert_eq!(controller.parameters(), &[0.4, 0.4][..]);
    }

    // ==================== Operator Properties ====================

    #[test]
    fn perturbation_stays_in_domain(
        genes in prop::collection::vec(0.0..=1.0f64, 1..12),
        factor in 0.0..2.0f64,
        seed in any::<u64>()
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let bounds = MultiBounds::unit(genes.len());
        let perturbed = Solution::new(genes).perturbed(factor, &bounds, &mut rng);
        prop_assert!(bounds.contains_vec(perturbed.genes()));
    }

    #[test]
    fn variation_operators_stay_in_domain(
        p1 in prop::collection::vec(0.0..=1.0f64, 6),
        p2 in prop::collection::vec(0.0..=1.0f64, 6),
        eta in 0.0..30.0f64,
        seed in any::<u64>()
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let bounds = MultiBounds::unit(6);
        let sbx = SbxCrossover::new(eta).unwrap().with_gene_probability(0.5);
        let (mut c1, c2) = sbx
            .crossover(&Solution::new(p1), &Solution::new(p2), &bounds, &mut rng)
            .unwrap();
        prop_assert!(bounds.contains_vec(c1.genes()));
        prop_assert!(bounds.contains_vec(c2.genes()));

        PolynomialMutation::new(eta).unwrap().mutate(&mut c1, &bounds, &mut rng);
        prop_assert!(bounds.contains_vec(c1.genes()));
    }

    // ==================== Statistics Properties ====================

    #[test]
    fn cost_summary_is_ordered(costs in prop::collection::vec(0.0..1e6f64, 1..50)) {
        let summary = CostSummary::from_costs(costs.iter().copied()).unwrap();
        prop_assert!(summary.best <= summary.mean + 1e-6);
        prop_assert!(summary.mean <= summary.worst + 1e-6);
        prop_assert!(summary.std >= 0.0);
    }
}
