//! Termination criteria
//!
//! Exactly one criterion governs a run. When several budgets are
//! configured the target cost wins over the wall-clock budget, which wins
//! over the generation budget.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::execution::ExecutionState;

/// Termination criterion trait
///
/// Criteria answer whether the loop may run another step.
pub trait TerminationCriterion {
    fn should_continue(&self, state: &ExecutionState) -> bool;

    /// Why the run stopped once `should_continue` turns false
    fn reason(&self) -> &'static str;
}

/// Continue while the current cost is strictly above a target
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetFitness(pub f64);

impl TerminationCriterion for TargetFitness {
    fn should_continue(&self, state: &ExecutionState) -> bool {
        state.current_fitness.map_or(true, |f| f > self.0)
    }

    fn reason(&self) -> &'static str {
        "Target fitness reached"
    }
}

/// Continue while cumulative processing time stays within budget
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeBudget(pub Duration);

impl TerminationCriterion for TimeBudget {
    fn should_continue(&self, state: &ExecutionState) -> bool {
        state.total_time <= self.0
    }

    fn reason(&self) -> &'static str {
        "Time budget exhausted"
    }
}

/// Continue while the next record index is within the generation budget
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxGenerations(pub u64);

impl TerminationCriterion for MaxGenerations {
    fn should_continue(&self, state: &ExecutionState) -> bool {
        state.generation <= self.0
    }

    fn reason(&self) -> &'static str {
        "Maximum generations reached"
    }
}

/// The single active criterion of a run
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TerminationPolicy {
    TargetFitness(TargetFitness),
    TimeBudget(TimeBudget),
    MaxGenerations(MaxGenerations),
}

impl TerminationPolicy {
    /// Pick the active criterion by priority
    ///
    /// Negative targets and budgets count as unset.
    pub fn from_budgets(
        target_fitness: Option<f64>,
        max_time: Option<Duration>,
        max_generation: u64,
    ) -> Self {
        match (target_fitness, max_time) {
            (Some(target), _) if target >= 0.0 => Self::TargetFitness(TargetFitness(target)),
            (_, Some(budget)) => Self::TimeBudget(TimeBudget(budget)),
            _ => Self::MaxGenerations(MaxGenerations(max_generation)),
        }
    }

    pub fn generations(max: u64) -> Self {
        Self::MaxGenerations(MaxGenerations(max))
    }

    fn criterion(&self) -> &dyn TerminationCriterion {
        match self {
            Self::TargetFitness(c) => c,
            Self::TimeBudget(c) => c,
            Self::MaxGenerations(c) => c,
        }
    }

    pub fn is_executable(&self, state: &ExecutionState) -> bool {
        self.criterion().should_continue(state)
    }

    pub fn reason(&self) -> &'static str {
        self.criterion().reason()
    }
}

pub mod prelude {
    pub use super::*;
}
