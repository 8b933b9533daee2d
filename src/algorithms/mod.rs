//! Search strategies
//!
//! Every strategy exposes the same three-call lifecycle: `initialize`
//! builds and evaluates the starting state, `step` advances one
//! generation, `current_best` reports the incumbent. The closed
//! [`Strategy`] enum lets the driver stay agnostic of which one runs.

use std::time::Duration;

use rand::Rng;

use crate::error::SearchResult;
use crate::fitness::traits::ObjectiveOracle;
use crate::genome::solution::Solution;
use crate::population::population::CostSummary;

pub mod clonal_selection;
pub mod driver;
pub mod generational_ga;
pub mod iterated_local_search;
pub mod tabu_search;

pub use clonal_selection::{Antibody, ClonalSelection, ClonalSelectionConfig};
pub use driver::Driver;
pub use generational_ga::{GenerationalGa, GeneticConfig, RateSource};
pub use iterated_local_search::{IteratedLocalSearch, IteratedLocalSearchConfig};
pub use tabu_search::{TabuList, TabuSearch, TabuSearchConfig};

/// What one generation produced
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepOutcome {
    /// Cost to report for this generation
    pub best_cost: f64,
    pub worst: Option<f64>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    /// The incumbent strictly improved during this step
    pub improved: bool,
    /// Time spent on side effects that must not count as processing
    pub side_effect_cost: Duration,
}

impl StepOutcome {
    /// Outcome of a single-point search
    pub fn single(best_cost: f64, improved: bool) -> Self {
        Self {
            best_cost,
            worst: None,
            mean: None,
            std: None,
            improved,
            side_effect_cost: Duration::ZERO,
        }
    }

    /// Outcome carrying population statistics
    pub fn with_summary(best_cost: f64, summary: &CostSummary, improved: bool) -> Self {
        Self {
            best_cost,
            worst: Some(summary.worst),
            mean: Some(summary.mean),
            std: Some(summary.std),
            improved,
            side_effect_cost: Duration::ZERO,
        }
    }

    pub fn with_side_effect_cost(mut self, cost: Duration) -> Self {
        self.side_effect_cost = cost;
        self
    }
}

/// Shared lifecycle of every search strategy
pub trait SearchStrategy {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Build and evaluate the starting state
    fn initialize<O, R>(&mut self, oracle: &O, rng: &mut R) -> SearchResult<StepOutcome>
    where
        O: ObjectiveOracle + ?Sized,
        R: Rng + ?Sized;

    /// Advance one generation
    fn step<O, R>(&mut self, oracle: &O, rng: &mut R) -> SearchResult<StepOutcome>
    where
        O: ObjectiveOracle + ?Sized,
        R: Rng + ?Sized;

    /// Incumbent solution, once initialized
    fn current_best(&self) -> Option<&Solution>;

    /// Cost of the incumbent
    fn best_cost(&self) -> Option<f64>;
}

/// The closed set of available strategies
#[derive(Debug)]
pub enum Strategy {
    ClonalSelection(ClonalSelection),
    IteratedLocalSearch(IteratedLocalSearch),
    TabuSearch(TabuSearch),
    Genetic(GenerationalGa),
}

impl SearchStrategy for Strategy {
    fn name(&self) -> &'static str {
        match self {
            Strategy::ClonalSelection(s) => s.name(),
            Strategy::IteratedLocalSearch(s) => s.name(),
            Strategy::TabuSearch(s) => s.name(),
            Strategy::Genetic(s) => s.name(),
        }
    }

    fn initialize<O, R>(&mut self, oracle: &O, rng: &mut R) -> SearchResult<StepOutcome>
    where
        O: ObjectiveOracle + ?Sized,
        R: Rng + ?Sized,
    {
        match self {
            Strategy::ClonalSelection(s) => s.initialize(oracle, rng),
            Strategy::IteratedLocalSearch(s) => s.initialize(oracle, rng),
            Strategy::TabuSearch(s) => s.initialize(oracle, rng),
            Strategy::Genetic(s) => s.initialize(oracle, rng),
        }
    }

    fn step<O, R>(&mut self, oracle: &O, rng: &mut R) -> SearchResult<StepOutcome>
    where
        O: ObjectiveOracle + ?Sized,
        R: Rng + ?Sized,
    {
        match self {
            Strategy::ClonalSelection(s) => s.step(oracle, rng),
            Strategy::IteratedLocalSearch(s) => s.step(oracle, rng),
            Strategy::TabuSearch(s) => s.step(oracle, rng),
            Strategy::Genetic(s) => s.step(oracle, rng),
        }
    }

    fn current_best(&self) -> Option<&Solution> {
        match self {
            Strategy::ClonalSelection(s) => s.current_best(),
            Strategy::IteratedLocalSearch(s) => s.current_best(),
            Strategy::TabuSearch(s) => s.current_best(),
            Strategy::Genetic(s) => s.current_best(),
        }
    }

    fn best_cost(&self) -> Option<f64> {
        match self {
            Strategy::ClonalSelection(s) => s.best_cost(),
            Strategy::IteratedLocalSearch(s) => s.best_cost(),
            Strategy::TabuSearch(s) => s.best_cost(),
            Strategy::Genetic(s) => s.best_cost(),
        }
    }
}

impl From<ClonalSelection> for Strategy {
    fn from(s: ClonalSelection) -> Self {
        Strategy::ClonalSelection(s)
    }
}

impl From<IteratedLocalSearch> for Strategy {
    fn from(s: IteratedLocalSearch) -> Self {
        Strategy::IteratedLocalSearch(s)
    }
}

impl From<TabuSearch> for Strategy {
    fn from(s: TabuSearch) -> Self {
        Strategy::TabuSearch(s)
    }
}

impl From<GenerationalGa> for Strategy {
    fn from(s: GenerationalGa) -> Self {
        Strategy::Genetic(s)
    }
}

pub mod prelude {
    pub use super::clonal_selection::*;
    pub use super::driver::*;
    pub use super::generational_ga::*;
    pub use super::iterated_local_search::*;
    pub use super::tabu_search::*;
    pub use super::{SearchStrategy, StepOutcome, Strategy};
}
