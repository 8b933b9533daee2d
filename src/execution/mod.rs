//! Shared run lifecycle
//!
//! Every strategy runs under the same contract: begin the run, test the
//! termination criterion before each step, report each generation, end the
//! run. Per-generation time excludes side-effect cost such as snapshots.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::diagnostics::{GenerationRecord, StatisticsSink};
use crate::error::SearchResult;
use crate::termination::TerminationPolicy;

/// Progress of the current run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutionState {
    /// Index of the next record; equals the number of reports so far
    pub generation: u64,
    /// Cost carried by the latest report
    pub current_fitness: Option<f64>,
    /// Lowest reported cost
    pub best_fitness: Option<f64>,
    /// Cumulative processing time
    pub total_time: Duration,
}

pub struct ExecutionContract {
    policy: TerminationPolicy,
    state: ExecutionState,
    statistics: Box<dyn StatisticsSink>,
    records: Vec<GenerationRecord>,
    last_report: Instant,
    verbose: bool,
}

impl ExecutionContract {
    pub fn new<S: StatisticsSink + 'static>(policy: TerminationPolicy, statistics: S) -> Self {
        Self {
            policy,
            state: ExecutionState::default(),
            statistics: Box::new(statistics),
            records: Vec::new(),
            last_report: Instant::now(),
            verbose: false,
        }
    }

    /// Emit each generation at `info` rather than `debug`
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn policy(&self) -> &TerminationPolicy {
        &self.policy
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    pub fn records(&self) -> &[GenerationRecord] {
        &self.records
    }

    pub fn take_records(&mut self) -> Vec<GenerationRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn begin_run(&mut self) {
        self.state = ExecutionState::default();
        self.records.clear();
        self.last_report = Instant::now();
        info!(policy = ?self.policy, "run started");
    }

    pub fn is_executable(&self) -> bool {
        self.policy.is_executable(&self.state)
    }

    /// Record one generation; a statistics failure is fatal
    pub fn report(
        &mut self,
        fitness: f64,
        worst: Option<f64>,
        mean: Option<f64>,
        std: Option<f64>,
        side_effect_cost: Duration,
    ) -> SearchResult<GenerationRecord> {
        let elapsed = if self.state.generation == 0 {
            Duration::ZERO
        } else {
            self.last_report
                .elapsed()
                .saturating_sub(side_effect_cost)
        };
        self.state.total_time += elapsed;

        let record = GenerationRecord {
            generation: self.state.generation,
            fitness,
            elapsed,
            total_time: self.state.total_time,
            worst,
            mean,
            std,
        };
        self.statistics.record(&record)?;

        if self.verbose {
            info!(
                generation = record.generation,
                fitness,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                "generation"
            );
        } else {
            debug!(
                generation = record.generation,
                fitness,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                "generation"
            );
        }

        self.state.generation += 1;
        self.state.current_fitness = Some(fitness);
        self.state.best_fitness = Some(
            self.state
                .best_fitness
                .map_or(fitness, |best| best.min(fitness)),
        );
        self.records.push(record.clone());
        self.last_report = Instant::now();
        Ok(record)
    }

    pub fn end_run(&mut self) -> SearchResult<()> {
        self.statistics.finish()?;
        info!(
            generations = self.state.generation,
            best = ?self.state.best_fitness,
            total_ms = self.state.total_time.as_secs_f64() * 1000.0,
            reason = self.policy.reason(),
            "run finished"
        );
        Ok(())
    }
}

pub mod prelude {
    pub use super::{ExecutionContract, ExecutionState};
}
