//! Population type
//!
//! A fixed-size collection of individuals plus the cost statistics that
//! strategies report each generation.

use rand::Rng;

use crate::error::SearchResult;
use crate::fitness::traits::ObjectiveOracle;
use crate::genome::bounds::MultiBounds;
use crate::genome::solution::Solution;
use crate::population::individual::Individual;

/// Best/worst/mean/std of a set of costs
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CostSummary {
    pub best: f64,
    pub worst: f64,
    pub mean: f64,
    /// Population standard deviation (ddof 0)
    pub std: f64,
}

impl CostSummary {
    /// Summarize a sequence of costs; `None` when empty
    pub fn from_costs<I>(costs: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let costs: Vec<f64> = costs.into_iter().collect();
        if costs.is_empty() {
            return None;
        }
        let n = costs.len() as f64;
        let best = costs.iter().copied().fold(f64::INFINITY, f64::min);
        let worst = costs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = costs.iter().sum::<f64>() / n;
        let variance = costs.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            best,
            worst,
            mean,
            std: variance.sqrt(),
        })
    }
}

/// A population of individuals
#[derive(Clone, Debug, Default)]
pub struct Population {
    individuals: Vec<Individual>,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_individuals(individuals: Vec<Individual>) -> Self {
        Self { individuals }
    }

    /// Create `size` unevaluated individuals drawn uniformly from the domain
    pub fn random<R: Rng + ?Sized>(size: usize, bounds: &MultiBounds, rng: &mut R) -> Self {
        let individuals = (0..size)
            .map(|_| Individual::new(Solution::random(bounds, rng)))
            .collect();
        Self { individuals }
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn push(&mut self, individual: Individual) {
        self.individuals.push(individual);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Individual> {
        self.individuals.iter()
    }

    /// Evaluate every individual that lacks a cost
    ///
    /// Returns the number of oracle calls made.
    pub fn evaluate<O: ObjectiveOracle + ?Sized>(&mut self, oracle: &O) -> SearchResult<usize> {
        let mut calls = 0;
        for individual in &mut self.individuals {
            if !individual.is_evaluated() {
                individual.ensure_evaluated(oracle)?;
                calls += 1;
            }
        }
        Ok(calls)
    }

    /// Lowest-cost evaluated individual
    pub fn best(&self) -> Option<&Individual> {
        self.individuals
            .iter()
            .filter(|i| i.is_evaluated())
            .min_by(|a, b| Individual::by_cost(a, b))
    }

    /// Cost statistics over evaluated individuals
    pub fn summary(&self) -> Option<CostSummary> {
        CostSummary::from_costs(self.individuals.iter().filter_map(|i| i.cost))
    }
}

impl std::ops::Index<usize> for Population {
    type Output = Individual;

    fn index(&self, index: usize) -> &Self::Output {
        &self.individuals[index]
    }
}

impl IntoIterator for Population {
    type Item = Individual;
    type IntoIter = std::vec::IntoIter<Individual>;

    fn into_iter(self) -> Self::IntoIter {
        self.individuals.into_iter()
    }
}

impl FromIterator<Individual> for Population {
    fn from_iter<I: IntoIterator<Item = Individual>>(iter: I) -> Self {
        Self::from_individuals(iter.into_iter().collect())
    }
}
