//! Iterated local search
//!
//! Each generation perturbs the incumbent, hill-climbs from the perturbed
//! point with a handful of random gene resets, and accepts the result when
//! it is no worse than the incumbent. Accepting ties lets the search drift
//! across plateaus.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::algorithms::{SearchStrategy, StepOutcome};
use crate::error::{SearchError, SearchResult};
use crate::fitness::traits::{evaluate, ObjectiveOracle};
use crate::genome::bounds::MultiBounds;
use crate::genome::solution::Solution;

/// Configuration for iterated local search
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IteratedLocalSearchConfig {
    /// Noise amplitude as a fraction of each gene's range
    pub perturbation_factor: f64,
    /// Local trials per generation
    pub neighbor_size: usize,
    /// Genes reset by each local trial
    pub hamming_distance: usize,
}

impl Default for IteratedLocalSearchConfig {
    fn default() -> Self {
        Self {
            perturbation_factor: 0.1,
            neighbor_size: 10,
            hamming_distance: 1,
        }
    }
}

impl IteratedLocalSearchConfig {
    pub fn validate(&self) -> SearchResult<()> {
        if !(self.perturbation_factor.is_finite() && self.perturbation_factor >= 0.0) {
            return Err(SearchError::Configuration(format!(
                "perturbation_factor must be non-negative, got {}",
                self.perturbation_factor
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct IteratedLocalSearch {
    config: IteratedLocalSearchConfig,
    bounds: MultiBounds,
    best: Option<(Solution, f64)>,
}

impl IteratedLocalSearch {
    pub fn new(config: IteratedLocalSearchConfig, bounds: MultiBounds) -> SearchResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            bounds,
            best: None,
        })
    }

    pub fn config(&self) -> &IteratedLocalSearchConfig {
        &self.config
    }

    /// Best of the perturbed point and its local trials
    fn local_search<O, R>(
        &self,
        start: Solution,
        oracle: &O,
        rng: &mut R,
    ) -> SearchResult<(Solution, f64)>
    where
        O: ObjectiveOracle + ?Sized,
        R: Rng + ?Sized,
    {
        let start_cost = evaluate(oracle, &start)?;
        let mut incumbent = (start, start_cost);
        for _ in 0..self.config.neighbor_size {
            let mut trial = incumbent.0.clone();
            trial.reset_random_genes(self.config.hamming_distance, &self.bounds, rng);
            let cost = evaluate(oracle, &trial)?;
            if cost < incumbent.1 {
                incumbent = (trial, cost);
            }
        }
        Ok(incumbent)
    }
}

impl SearchStrategy for IteratedLocalSearch {
    fn name(&self) -> &'static str {
        "iterated_local_search"
    }

    fn initialize<O, R>(&mut self, oracle: &O, rng: &mut R) -> SearchResult<StepOutcome>
    where
        O: ObjectiveOracle + ?Sized,
        R: Rng + ?Sized,
    {
        let solution = Solution::random(&self.bounds, rng);
        let cost = evaluate(oracle, &solution)?;
        self.best = Some((solution, cost));
        Ok(StepOutcome::single(cost, true))
    }

    fn step<O, R>(&mut self, oracle: &O, rng: &mut R) -> SearchResult<StepOutcome>
    where
        O: ObjectiveOracle + ?Sized,
        R: Rng + ?Sized,
    {
        let (best, best_cost) = self.best.as_ref().ok_or(SearchError::EmptyPopulation)?;
        let best_cost = *best_cost;
        let perturbed = best.perturbed(self.config.perturbation_factor, &self.bounds, rng);

        let (candidate, cost) = self.local_search(perturbed, oracle, rng)?;
        let improved = cost < best_cost;
        if cost <= best_cost {
            self.best = Some((candidate, cost));
        }
        Ok(StepOutcome::single(cost.min(best_cost), improved))
    }

    fn current_best(&self) -> Option<&Solution> {
        self.best.as_ref().map(|(s, _)| s)
    }

    fn best_cost(&self) -> Option<f64> {
        self.best.as_ref().map(|(_, c)| *c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::traits::{FnObjective, SquaredDeviation};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_step_before_initialize_fails() {
        let mut rng = StdRng::seed_from_u64(0);
        let oracle = SquaredDeviation::new(vec![0.5]);
        let config = IteratedLocalSearchConfig::default();
        let mut ils = IteratedLocalSearch::new(config, MultiBounds::unit(1)).unwrap();
        assert!(matches!(ils.step(&oracle, &mut rng), Err(SearchError::EmptyPopulation)));
    }

    #[test]
    fn test_negative_factor_rejected() {
        let config = IteratedLocalSearchConfig {
            perturbation_factor: -0.1,
            ..Default::default()
        };
        assert!(IteratedLocalSearch::new(config, MultiBounds::unit(1)).is_err());
    }

    #[test]
    fn test_cost_never_increases() {
        let mut rng = StdRng::seed_from_u64(5);
        let oracle = SquaredDeviation::new(vec![0.2, 0.4, 0.6, 0.8]);
        let config = IteratedLocalSearchConfig::default();
        let mut ils = IteratedLocalSearch::new(config, MultiBounds::unit(4)).unwrap();
        let first = ils.initialize(&oracle, &mut rng).unwrap().best_cost;
        let mut last = first;
        for _ in 0..100 {
            let outcome = ils.step(&oracle, &mut rng).unwrap();
            assert!(outcome.best_cost <= last);
            last = outcome.best_cost;
        }
        assert!(last < first);
        assert_eq!(ils.best_cost(), Some(last));
    }

    #[test]
    fn test_ties_are_accepted() {
        let mut rng = StdRng::seed_from_u64(6);
        let oracle = FnObjective::new(|_: &[f64]| 0.0);
        let config = IteratedLocalSearchConfig {
            perturbation_factor: 0.5,
            neighbor_size: 0,
            hamming_distance: 1,
        };
        let mut ils = IteratedLocalSearch::new(config, MultiBounds::unit(3)).unwrap();
        ils.initialize(&oracle, &mut rng).unwrap();
        let before = ils.current_best().unwrap().clone();
        let outcome = ils.step(&oracle, &mut rng).unwrap();
        assert!(!outcome.improved);
        assert_ne!(ils.current_best().unwrap(), &before);
    }

    #[test]
    fn test_perturbation_stays_in_domain() {
        let mut rng = StdRng::seed_from_u64(7);
        let bounds = MultiBounds::unit(5);
        let oracle = FnObjective::new(|x: &[f64]| -x.iter().sum::<f64>());
        let config = IteratedLocalSearchConfig {
            perturbation_factor: 0.9,
            ..Default::default()
        };
        let mut ils = IteratedLocalSearch::new(config, bounds.clone()).unwrap();
        ils.initialize(&oracle, &mut rng).unwrap();
        for _ in 0..20 {
            ils.step(&oracle, &mut rng).unwrap();
            assert!(bounds.contains_vec(ils.current_best().unwrap().genes()));
        }
    }
}
