//! Tabu search
//!
//! Walks from a current solution by random perturbation. Improving moves
//! are always taken. A non-improving candidate that was recently visited
//! triggers a fresh perturbation of the current solution instead; any
//! other non-improving candidate is remembered in a bounded FIFO list.

use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::algorithms::{SearchStrategy, StepOutcome};
use crate::error::{SearchError, SearchResult};
use crate::fitness::traits::{evaluate, ObjectiveOracle};
use crate::genome::bounds::MultiBounds;
use crate::genome::solution::Solution;

/// Bounded memory of visited solutions, oldest first
///
/// Admission evicts from the front, so the length never exceeds the
/// capacity.
#[derive(Clone, Debug, PartialEq)]
pub struct TabuList {
    entries: VecDeque<Solution>,
    capacity: usize,
}

impl TabuList {
    pub fn new(capacity: usize) -> SearchResult<Self> {
        if capacity == 0 {
            return Err(SearchError::Configuration(
                "tabu list capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact value equality
    pub fn contains(&self, solution: &Solution) -> bool {
        self.entries.iter().any(|s| s == solution)
    }

    /// Append, evicting the oldest entries beyond capacity
    ///
    /// Returns the most recently evicted entry.
    pub fn admit(&mut self, solution: Solution) -> Option<Solution> {
        self.entries.push_back(solution);
        let mut evicted = None;
        while self.entries.len() > self.capacity {
            evicted = self.entries.pop_front();
        }
        evicted
    }

    pub fn newest(&self) -> Option<&Solution> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Solution> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Configuration for tabu search
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TabuSearchConfig {
    /// Noise amplitude as a fraction of each gene's range
    pub perturbation_factor: f64,
    pub tabu_list_size: usize,
}

impl Default for TabuSearchConfig {
    fn default() -> Self {
        Self {
            perturbation_factor: 0.1,
            tabu_list_size: 10,
        }
    }
}

impl TabuSearchConfig {
    pub fn validate(&self) -> SearchResult<()> {
        if !(self.perturbation_factor.is_finite() && self.perturbation_factor >= 0.0) {
            return Err(SearchError::Configuration(format!(
                "perturbation_factor must be non-negative, got {}",
                self.perturbation_factor
            )));
        }
        if self.tabu_list_size == 0 {
            return Err(SearchError::Configuration(
                "tabu_list_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct TabuSearch {
    config: TabuSearchConfig,
    bounds: MultiBounds,
    current: Option<(Solution, f64)>,
    best: Option<(Solution, f64)>,
    tabu: TabuList,
}

impl TabuSearch {
    pub fn new(config: TabuSearchConfig, bounds: MultiBounds) -> SearchResult<Self> {
        config.validate()?;
        let tabu = TabuList::new(config.tabu_list_size)?;
        Ok(Self {
            config,
            bounds,
            current: None,
            best: None,
            tabu,
        })
    }

    pub fn config(&self) -> &TabuSearchConfig {
        &self.config
    }

    pub fn tabu_list(&self) -> &TabuList {
        &self.tabu
    }

    /// The solution the walk currently stands on
    pub fn current(&self) -> Option<&Solution> {
        self.current.as_ref().map(|(s, _)| s)
    }

    pub fn current_cost(&self) -> Option<f64> {
        self.current.as_ref().map(|(_, c)| *c)
    }

    /// Promote the current solution if it beats the best; returns whether it did
    fn record_best(&mut self) -> bool {
        let Some((solution, cost)) = &self.current else {
            return false;
        };
        let improves = self.best.as_ref().map_or(true, |(_, best)| cost < best);
        if improves {
            self.best = Some((solution.clone(), *cost));
        }
        improves
    }
}

impl SearchStrategy for TabuSearch {
    fn name(&self) -> &'static str {
        "tabu_search"
    }

    fn initialize<O, R>(&mut self, oracle: &O, rng: &mut R) -> SearchResult<StepOutcome>
    where
        O: ObjectiveOracle + ?Sized,
        R: Rng + ?Sized,
    {
        let solution = Solution::random(&self.bounds, rng);
        let cost = evaluate(oracle, &solution)?;
        self.current = Some((solution, cost));
        self.best = None;
        self.tabu.clear();
        self.record_best();
        Ok(StepOutcome::single(cost, true))
    }

    fn step<O, R>(&mut self, oracle: &O, rng: &mut R) -> SearchResult<StepOutcome>
    where
        O: ObjectiveOracle + ?Sized,
        R: Rng + ?Sized,
    {
        let mut improved = self.record_best();

        let (current, current_cost) = self.current.take().ok_or(SearchError::EmptyPopulation)?;
        // an entry pushed out by the current solution stays tabu until the step ends
        let evicted = if self.tabu.contains(&current) {
            None
        } else {
            self.tabu.admit(current.clone())
        };

        let candidate = current.perturbed(self.config.perturbation_factor, &self.bounds, rng);
        let candidate_cost = evaluate(oracle, &candidate)?;

        self.current = Some(if candidate_cost < current_cost {
            trace!(cost = candidate_cost, "improving move");
            (candidate, candidate_cost)
        } else if self.tabu.contains(&candidate) || evicted.as_ref() == Some(&candidate) {
            let rerolled = current.perturbed(self.config.perturbation_factor, &self.bounds, rng);
            let rerolled_cost = evaluate(oracle, &rerolled)?;
            trace!(cost = rerolled_cost, "tabu hit, rerolled");
            (rerolled, rerolled_cost)
        } else {
            self.tabu.admit(candidate);
            (current, current_cost)
        });

        improved |= self.record_best();
        let best_cost = self.best_cost().ok_or(SearchError::EmptyPopulation)?;
        Ok(StepOutcome::single(best_cost, improved))
    }

    fn current_best(&self) -> Option<&Solution> {
        self.best.as_ref().map(|(s, _)| s)
    }

    fn best_cost(&self) -> Option<f64> {
        self.best.as_ref().map(|(_, c)| *c)
    }
}
