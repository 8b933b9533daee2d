//! Run driver
//!
//! Binds an objective, an execution contract and an optional snapshot sink,
//! then runs any [`SearchStrategy`] to termination.

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{info, warn};

use crate::algorithms::{SearchStrategy, StepOutcome};
use crate::diagnostics::RunResult;
use crate::error::{SearchError, SearchResult};
use crate::execution::ExecutionContract;
use crate::fitness::traits::ObjectiveOracle;
use crate::snapshot::{SnapshotPolicy, SnapshotSink, FINAL_LABEL};

pub struct Driver {
    oracle: Box<dyn ObjectiveOracle>,
    contract: ExecutionContract,
    snapshots: Option<Box<dyn SnapshotSink>>,
    policy: SnapshotPolicy,
}

impl Driver {
    pub fn new<O: ObjectiveOracle + 'static>(oracle: O, contract: ExecutionContract) -> Self {
        Self {
            oracle: Box::new(oracle),
            contract,
            snapshots: None,
            policy: SnapshotPolicy::Disabled,
        }
    }

    /// Persist the best solution according to `policy`
    ///
    /// The final best is always saved once a sink is installed, whatever
    /// the policy.
    pub fn with_snapshots<S: SnapshotSink + 'static>(
        mut self,
        sink: S,
        policy: SnapshotPolicy,
    ) -> Self {
        self.snapshots = Some(Box::new(sink));
        self.policy = policy;
        self
    }

    pub fn contract(&self) -> &ExecutionContract {
        &self.contract
    }

    pub fn oracle(&self) -> &dyn ObjectiveOracle {
        self.oracle.as_ref()
    }

    /// Run `strategy` until the termination policy stops it
    pub fn run<S, R>(&mut self, strategy: &mut S, rng: &mut R) -> SearchResult<RunResult>
    where
        S: SearchStrategy,
        R: Rng + ?Sized,
    {
        info!(
            strategy = strategy.name(),
            objective = self.oracle.name(),
            "starting search"
        );
        self.contract.begin_run();

        let outcome = strategy.initialize(self.oracle.as_ref(), rng)?;
        self.record(strategy, outcome)?;

        while self.contract.is_executable() {
            let outcome = strategy.step(self.oracle.as_ref(), rng)?;
            self.record(strategy, outcome)?;
        }

        self.contract.end_run()?;

        let best = strategy
            .current_best()
            .cloned()
            .ok_or(SearchError::EmptyPopulation)?;
        let best_cost = strategy.best_cost().ok_or(SearchError::EmptyPopulation)?;
        if self.snapshots.is_some() {
            let annotation = format!("{best_cost}");
            self.save_snapshot(FINAL_LABEL, strategy, Some(&annotation));
        }

        let generations = self.contract.state().generation;
        let elapsed = self.contract.state().total_time;
        Ok(RunResult {
            best,
            best_cost,
            generations,
            elapsed,
            termination_reason: self.contract.policy().reason(),
            records: self.contract.take_records(),
        })
    }

    /// Snapshot per policy, then report the generation
    fn record<S: SearchStrategy>(
        &mut self,
        strategy: &S,
        outcome: StepOutcome,
    ) -> SearchResult<()> {
        let generation = self.contract.state().generation;
        let mut side_effect_cost = outcome.side_effect_cost;
        if self.snapshots.is_some() && self.policy.should_snapshot(generation, outcome.improved) {
            let label = format!("generation_{generation:06}");
            let annotation = format!("{}", outcome.best_cost);
            side_effect_cost += self.save_snapshot(&label, strategy, Some(&annotation));
        }
        self.contract.report(
            outcome.best_cost,
            outcome.worst,
            outcome.mean,
            outcome.std,
            side_effect_cost,
        )?;
        Ok(())
    }

    /// Time spent saving; a failed save costs nothing
    fn save_snapshot<S: SearchStrategy>(
        &mut self,
        label: &str,
        strategy: &S,
        annotation: Option<&str>,
    ) -> Duration {
        let (Some(sink), Some(best)) = (self.snapshots.as_mut(), strategy.current_best()) else {
            return Duration::ZERO;
        };
        let started = Instant::now();
        match sink.save(label, best, annotation) {
            Ok(()) => started.elapsed(),
            Err(e) => {
                warn!(label, error = %e, "snapshot failed");
                Duration::ZERO
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{TabuSearch, TabuSearchConfig};
    use crate::diagnostics::{GenerationRecord, MemoryStatistics, StatisticsSink};
    use crate::error::SnapshotError;
    use crate::fitness::traits::SquaredDeviation;
    use crate::genome::bounds::MultiBounds;
    use crate::genome::solution::Solution;
    use crate::termination::TerminationPolicy;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct SharedSnapshots(Rc<RefCell<Vec<String>>>);

    impl SnapshotSink for SharedSnapshots {
        fn save(
            &mut self,
            label: &str,
            _solution: &Solution,
            _annotation: Option<&str>,
        ) -> Result<(), SnapshotError> {
            self.0.borrow_mut().push(label.to_string());
            Ok(())
        }
    }

    struct BrokenSnapshots;

    impl SnapshotSink for BrokenSnapshots {
        fn save(
            &mut self,
            _label: &str,
            _solution: &Solution,
            _annotation: Option<&str>,
        ) -> Result<(), SnapshotError> {
            Err(SnapshotError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "denied")))
        }
    }

    struct BrokenStatistics;

    impl StatisticsSink for BrokenStatistics {
        fn record(&mut self, _record: &GenerationRecord) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
    }

    fn tabu() -> TabuSearch {
        TabuSearch::new(TabuSearchConfig::default(), MultiBounds::unit(3)).unwrap()
    }

    fn oracle() -> SquaredDeviation {
        SquaredDeviation::new(vec![0.25, 0.5, 0.75])
    }

    #[test]
    fn test_generation_budget_yields_budget_plus_one_records() {
        let mut rng = StdRng::seed_from_u64(41);
        let contract =
            ExecutionContract::new(TerminationPolicy::generations(5), MemoryStatistics::new());
        let mut driver = Driver::new(oracle(), contract);
        let result = driver.run(&mut tabu(), &mut rng).unwrap();

        assert_eq!(result.generations, 6);
        let generations: Vec<u64> = result.records.iter().map(|r| r.generation).collect();
        assert_eq!(generations, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(result.termination_reason, "Maximum generations reached");
        assert_eq!(Some(result.best_cost), result.fitness_history().last().copied());
    }

    #[test]
    fn test_periodic_snapshots_and_final_label() {
        let mut rng = StdRng::seed_from_u64(42);
        let sink = SharedSnapshots::default();
        let contract =
            ExecutionContract::new(TerminationPolicy::generations(4), MemoryStatistics::new());
        let mut driver =
            Driver::new(oracle(), contract).with_snapshots(sink.clone(), SnapshotPolicy::Every(2));
        driver.run(&mut tabu(), &mut rng).unwrap();

        let labels = sink.0.borrow().clone();
        assert_eq!(
            labels,
            vec!["generation_000000", "generation_000002", "generation_000004", FINAL_LABEL]
        );
    }

    #[test]
    fn test_snapshot_failure_does_not_abort() {
        let mut rng = StdRng::seed_from_u64(43);
        let contract =
            ExecutionContract::new(TerminationPolicy::generations(3), MemoryStatistics::new());
        let mut driver = Driver::new(oracle(), contract)
            .with_snapshots(BrokenSnapshots, SnapshotPolicy::Every(1));
        let result = driver.run(&mut tabu(), &mut rng).unwrap();
        assert_eq!(result.generations, 4);
    }

    #[test]
    fn test_statistics_failure_is_fatal() {
        let mut rng = StdRng::seed_from_u64(44);
        let contract = ExecutionContract::new(TerminationPolicy::generations(3), BrokenStatistics);
        let mut driver = Driver::new(oracle(), contract);
        assert!(matches!(
            driver.run(&mut tabu(), &mut rng),
            Err(SearchError::Statistics(_))
        ));
    }
}
