//! Clonal selection
//!
//! An immune-inspired search. Antibodies are cloned in proportion to their
//! normalized affinity, clones are hypermutated at a rate that shrinks as
//! affinity grows, and the best survivors form a memory set. A few of the
//! worst survivors are replaced by random antibodies every generation.
//!
//! Affinity is the negated cost, so larger is better.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algorithms::{SearchStrategy, StepOutcome};
use crate::error::{SearchError, SearchResult};
use crate::fitness::traits::{evaluate, ObjectiveOracle};
use crate::genome::bounds::MultiBounds;
use crate::genome::solution::Solution;
use crate::population::population::CostSummary;

/// Configuration for clonal selection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClonalSelectionConfig {
    /// Initial number of antibodies
    pub number_of_antibodies: usize,
    /// Clones per antibody scale with this rate
    pub clone_rate: f64,
    /// Per-gene mutation probability is `exp(-normalized_affinity * mutation_exp)`
    pub mutation_exp: f64,
    /// Antibodies kept after selection
    pub max_antibodies: usize,
    /// Worst survivors replaced by random antibodies each generation
    pub num_remove: usize,
    /// Size of the memory set
    pub mem_size: usize,
}

impl Default for ClonalSelectionConfig {
    fn default() -> Self {
        Self {
            number_of_antibodies: 100,
            clone_rate: 0.1,
            mutation_exp: 0.4,
            max_antibodies: 100,
            num_remove: 2,
            mem_size: 20,
        }
    }
}

impl ClonalSelectionConfig {
    pub fn validate(&self) -> SearchResult<()> {
        if self.number_of_antibodies < 2 {
            return Err(SearchError::Configuration(
                "clonal selection needs at least 2 antibodies".to_string(),
            ));
        }
        if self.max_antibodies == 0 || self.mem_size == 0 {
            return Err(SearchError::Configuration(
                "max_antibodies and mem_size must be at least 1".to_string(),
            ));
        }
        if !(self.clone_rate.is_finite() && self.clone_rate >= 0.0) {
            return Err(SearchError::Configuration(format!(
                "clone_rate must be non-negative, got {}",
                self.clone_rate
            )));
        }
        if !self.mutation_exp.is_finite() {
            return Err(SearchError::Configuration(
                "mutation_exp must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// A candidate solution and its affinity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Antibody {
    pub paratopes: Solution,
    /// Negated cost; unset until evaluated
    pub affinity: Option<f64>,
}

impl Antibody {
    pub fn new(paratopes: Solution) -> Self {
        Self {
            paratopes,
            affinity: None,
        }
    }

    pub fn random<R: Rng + ?Sized>(bounds: &MultiBounds, rng: &mut R) -> Self {
        Self::new(Solution::random(bounds, rng))
    }

    /// Evaluate unless an affinity is already known
    pub fn evaluate<O: ObjectiveOracle + ?Sized>(&mut self, oracle: &O) -> SearchResult<f64> {
        if let Some(affinity) = self.affinity {
            return Ok(affinity);
        }
        let affinity = -evaluate(oracle, &self.paratopes)?;
        self.affinity = Some(affinity);
        Ok(affinity)
    }

    fn rank(&self) -> f64 {
        self.affinity.unwrap_or(f64::NEG_INFINITY)
    }
}

/// Affinity spread of a population, validated non-degenerate
#[derive(Clone, Copy, Debug)]
struct AffinityRange {
    min: f64,
    max: f64,
}

impl AffinityRange {
    fn of(antibodies: &[Antibody]) -> SearchResult<Self> {
        let (min, max) = antibodies
            .iter()
            .map(Antibody::rank)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), a| {
                (lo.min(a), hi.max(a))
            });
        if antibodies.is_empty() {
            return Err(SearchError::EmptyPopulation);
        }
        if max == min || !(max - min).is_finite() {
            return Err(SearchError::DegeneratePopulation { affinity: max });
        }
        Ok(Self { min, max })
    }

    fn normalize(&self, affinity: f64) -> f64 {
        (affinity - self.min) / (self.max - self.min)
    }
}

/// Clonal selection search
#[derive(Clone, Debug)]
pub struct ClonalSelection {
    config: ClonalSelectionConfig,
    bounds: MultiBounds,
    antibodies: Vec<Antibody>,
    memory: Vec<Antibody>,
    best: Option<Antibody>,
}

impl ClonalSelection {
    pub fn new(config: ClonalSelectionConfig, bounds: MultiBounds) -> SearchResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            bounds,
            antibodies: Vec::new(),
            memory: Vec::new(),
            best: None,
        })
    }

    pub fn config(&self) -> &ClonalSelectionConfig {
        &self.config
    }

    pub fn antibodies(&self) -> &[Antibody] {
        &self.antibodies
    }

    /// Top antibodies of the latest generation, best first
    pub fn memory(&self) -> &[Antibody] {
        &self.memory
    }

    pub fn best_antibody(&self) -> Option<&Antibody> {
        self.best.as_ref()
    }

    fn evaluate_all<O: ObjectiveOracle + ?Sized>(
        antibodies: &mut [Antibody],
        oracle: &O,
    ) -> SearchResult<()> {
        for antibody in antibodies.iter_mut() {
            antibody.evaluate(oracle)?;
        }
        Ok(())
    }

    /// Proportional cloning: `ceil(n * normalized * clone_rate)` copies each
    fn clone_antibodies(&self, range: AffinityRange) -> Vec<Antibody> {
        let n = self.antibodies.len() as f64;
        let mut clones = Vec::new();
        for antibody in &self.antibodies {
            let count = (n * range.normalize(antibody.rank()) * self.config.clone_rate).ceil();
            for _ in 0..count as usize {
                clones.push(antibody.clone());
            }
        }
        clones
    }

    /// Per-gene reset probability of a clone within the clones' own spread
    fn mutation_rate(&self, range: AffinityRange, affinity: f64) -> f64 {
        (-range.normalize(affinity) * self.config.mutation_exp).exp()
    }

    /// Reset genes at random with probability `exp(-normalized * mutation_exp)`,
    /// normalized against the clones' affinity range
    fn hypermutate<R: Rng + ?Sized>(
        &self,
        clones: &mut [Antibody],
        rng: &mut R,
    ) -> SearchResult<()> {
        if clones.is_empty() {
            return Ok(());
        }
        let range = AffinityRange::of(clones)?;
        for clone in clones.iter_mut() {
            let rate = self.mutation_rate(range, clone.rank());
            let mut changed = false;
            for (gene, bound) in clone
                .paratopes
                .genes_mut()
                .iter_mut()
                .zip(&self.bounds.bounds)
            {
                if rng.gen::<f64>() < rate {
                    *gene = bound.sample(rng);
                    changed = true;
                }
            }
            if changed {
                clone.affinity = None;
            }
        }
        Ok(())
    }

    fn sort_by_affinity(antibodies: &mut [Antibody]) {
        antibodies.sort_by(|a, b| {
            b.rank()
                .partial_cmp(&a.rank())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    fn survivor_summary(&self) -> Option<CostSummary> {
        CostSummary::from_costs(self.antibodies.iter().filter_map(|a| a.affinity).map(|a| -a))
    }

    /// Replace the incumbent only on strict improvement
    fn update_best(&mut self) -> bool {
        let Some(top) = self.memory.first() else {
            return false;
        };
        let improves = match &self.best {
            None => true,
            Some(best) => top.rank() > best.rank(),
        };
        if improves {
            self.best = Some(top.clone());
        }
        improves
    }

    fn outcome(&self, improved: bool) -> SearchResult<StepOutcome> {
        let best_cost = self
            .best
            .as_ref()
            .and_then(|b| b.affinity)
            .map(|a| -a)
            .ok_or(SearchError::EmptyPopulation)?;
        Ok(match self.survivor_summary() {
            Some(summary) => StepOutcome::with_summary(best_cost, &summary, improved),
            None => StepOutcome::single(best_cost, improved),
        })
    }
}

impl SearchStrategy for ClonalSelection {
    fn name(&self) -> &'static str {
        "clonal_selection"
    }

    fn initialize<O, R>(&mut self, oracle: &O, rng: &mut R) -> SearchResult<StepOutcome>
    where
        O: ObjectiveOracle + ?Sized,
        R: Rng + ?Sized,
    {
        self.antibodies = (0..self.config.number_of_antibodies)
            .map(|_| Antibody::random(&self.bounds, rng))
            .collect();
        Self::evaluate_all(&mut self.antibodies, oracle)?;
        Self::sort_by_affinity(&mut self.antibodies);
        self.memory = self
            .antibodies
            .iter()
            .take(self.config.mem_size)
            .cloned()
            .collect();
        self.best = None;
        let improved = self.update_best();
        self.outcome(improved)
    }

    fn step<O, R>(&mut self, oracle: &O, rng: &mut R) -> SearchResult<StepOutcome>
    where
        O: ObjectiveOracle + ?Sized,
        R: Rng + ?Sized,
    {
        Self::evaluate_all(&mut self.antibodies, oracle)?;
        let range = AffinityRange::of(&self.antibodies)?;

        let mut clones = self.clone_antibodies(range);
        self.hypermutate(&mut clones, rng)?;
        Self::evaluate_all(&mut clones, oracle)?;
        let clone_count = clones.len();

        self.antibodies.extend(clones);
        Self::sort_by_affinity(&mut self.antibodies);
        self.antibodies.truncate(self.config.max_antibodies);

        self.memory = self
            .antibodies
            .iter()
            .take(self.config.mem_size)
            .cloned()
            .collect();
        let outcome_summary = self.survivor_summary();

        let len = self.antibodies.len();
        if len > self.config.num_remove {
            for slot in &mut self.antibodies[len - self.config.num_remove..] {
                *slot = Antibody::random(&self.bounds, rng);
            }
        }

        let improved = self.update_best();
        debug!(
            clones = clone_count,
            survivors = len,
            best_affinity = ?self.best.as_ref().and_then(|b| b.affinity),
            "clonal selection step"
        );

        let best_cost = self
            .best
            .as_ref()
            .and_then(|b| b.affinity)
            .map(|a| -a)
            .ok_or(SearchError::EmptyPopulation)?;
        Ok(match outcome_summary {
            Some(summary) => StepOutcome::with_summary(best_cost, &summary, improved),
            None => StepOutcome::single(best_cost, improved),
        })
    }

    fn current_best(&self) -> Option<&Solution> {
        self.best.as_ref().map(|b| &b.paratopes)
    }

    fn best_cost(&self) -> Option<f64> {
        self.best.as_ref().and_then(|b| b.affinity).map(|a| -a)
    }
}
