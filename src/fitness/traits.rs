//! Objective oracle traits
//!
//! The oracle is the scalar cost function every strategy minimizes. It is
//! treated as an expensive, deterministic black box.

use crate::error::{SearchError, SearchResult};
use crate::genome::solution::Solution;

/// Scalar cost function over a solution vector (lower is better)
pub trait ObjectiveOracle {
    /// Evaluate the cost of a solution
    fn cost(&self, solution: &Solution) -> SearchResult<f64>;

    /// Short name used in logs
    fn name(&self) -> &str {
        "objective"
    }
}

impl<O: ObjectiveOracle + ?Sized> ObjectiveOracle for &O {
    fn cost(&self, solution: &Solution) -> SearchResult<f64> {
        (**self).cost(solution)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<O: ObjectiveOracle + ?Sized> ObjectiveOracle for Box<O> {
    fn cost(&self, solution: &Solution) -> SearchResult<f64> {
        (**self).cost(solution)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Evaluate through the oracle and reject NaN costs
///
/// A NaN would silently poison every comparison downstream, so it is
/// reported as an objective failure instead.
pub fn evaluate<O: ObjectiveOracle + ?Sized>(oracle: &O, solution: &Solution) -> SearchResult<f64> {
    let cost = oracle.cost(solution)?;
    if cost.is_nan() {
        return Err(SearchError::Objective(format!(
            "{} returned NaN",
            oracle.name()
        )));
    }
    Ok(cost)
}

/// A closure-backed oracle
pub struct FnObjective<F>
where
    F: Fn(&[f64]) -> f64,
{
    f: F,
}

impl<F> FnObjective<F>
where
    F: Fn(&[f64]) -> f64,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ObjectiveOracle for FnObjective<F>
where
    F: Fn(&[f64]) -> f64,
{
    fn cost(&self, solution: &Solution) -> SearchResult<f64> {
        Ok((self.f)(solution.genes()))
    }

    fn name(&self) -> &str {
        "fn-objective"
    }
}

/// Sum of squared deviations from a hidden target vector
///
/// Useful as a cheap stand-in oracle with a known optimum.
#[derive(Clone, Debug)]
pub struct SquaredDeviation {
    target: Vec<f64>,
}

impl SquaredDeviation {
    pub fn new(target: Vec<f64>) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &[f64] {
        &self.target
    }
}

impl ObjectiveOracle for SquaredDeviation {
    fn cost(&self, solution: &Solution) -> SearchResult<f64> {
        if solution.len() != self.target.len() {
            return Err(SearchError::Objective(format!(
                "expected {} genes, got {}",
                self.target.len(),
                solution.len()
            )));
        }
        Ok(solution
            .genes()
            .iter()
            .zip(&self.target)
            .map(|(x, t)| (x - t).powi(2))
            .sum())
    }

    fn name(&self) -> &str {
        "squared-deviation"
    }
}
