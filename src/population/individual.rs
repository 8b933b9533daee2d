//! Individual wrapper type
//!
//! An individual pairs a solution with its cost. Costs are minimized, and
//! an individual whose cost is unset ranks behind every evaluated one.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::SearchResult;
use crate::fitness::traits::{evaluate, ObjectiveOracle};
use crate::genome::solution::Solution;

/// A member of a population-based search
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    /// The candidate solution
    pub solution: Solution,
    /// Cost under the objective (None if not yet evaluated or invalidated)
    pub cost: Option<f64>,
}

impl Individual {
    /// Create a new unevaluated individual
    pub fn new(solution: Solution) -> Self {
        Self {
            solution,
            cost: None,
        }
    }

    /// Create an individual with a known cost
    pub fn with_cost(solution: Solution, cost: f64) -> Self {
        Self {
            solution,
            cost: Some(cost),
        }
    }

    pub fn is_evaluated(&self) -> bool {
        self.cost.is_some()
    }

    /// Cost used for ranking; unevaluated individuals sort last
    pub fn rank_cost(&self) -> f64 {
        self.cost.unwrap_or(f64::INFINITY)
    }

    /// Forget the cost after the solution has been modified
    pub fn invalidate(&mut self) {
        self.cost = None;
    }

    /// Evaluate through the oracle unless a cost is already known
    pub fn ensure_evaluated<O: ObjectiveOracle + ?Sized>(
        &mut self,
        oracle: &O,
    ) -> SearchResult<f64> {
        match self.cost {
            Some(cost) => Ok(cost),
            None => {
                let cost = evaluate(oracle, &self.solution)?;
                self.cost = Some(cost);
                Ok(cost)
            }
        }
    }

    /// Ordering with the best (lowest cost) first
    pub fn by_cost(a: &Self, b: &Self) -> Ordering {
        a.rank_cost()
            .partial_cmp(&b.rank_cost())
            .unwrap_or(Ordering::Equal)
    }
}
