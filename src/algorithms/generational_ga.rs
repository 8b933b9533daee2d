//! Generational genetic algorithm with an elite archive
//!
//! Each generation selects `len - elite` parents by binary tournament,
//! varies them with SBX crossover and polynomial mutation, evaluates the
//! changed offspring and appends the hall of fame unchanged. Crossover and
//! mutation probabilities come either from fixed values or from an
//! [`AdaptiveParameterController`] fed with the population mean cost.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algorithms::{SearchStrategy, StepOutcome};
use crate::error::{SearchError, SearchResult};
use crate::fitness::traits::ObjectiveOracle;
use crate::genome::bounds::MultiBounds;
use crate::genome::solution::Solution;
use crate::hyperparameter::adaptive::AdaptiveParameterController;
use crate::operators::crossover::SbxCrossover;
use crate::operators::mutation::PolynomialMutation;
use crate::operators::selection::TournamentSelection;
use crate::operators::traits::SelectionOperator;
use crate::operators::variation::vary_and;
use crate::population::hall_of_fame::HallOfFame;
use crate::population::individual::Individual;
use crate::population::population::{CostSummary, Population};

/// Name under which the controller exposes the crossover probability
pub const CROSSOVER_PARAMETER: &str = "cxpb";
/// Name under which the controller exposes the mutation probability
pub const MUTATION_PARAMETER: &str = "mutpb";

/// Configuration for the generational GA
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneticConfig {
    pub population_size: usize,
    /// Pairwise crossover probability (ignored under adaptive rates)
    pub prob_crossover: f64,
    /// Per-individual mutation probability (ignored under adaptive rates)
    pub prob_mutation: f64,
    pub hall_of_fame_size: usize,
    /// Distribution index shared by SBX and polynomial mutation
    pub crowding_factor: f64,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: 200,
            prob_crossover: 0.9,
            prob_mutation: 0.5,
            hall_of_fame_size: 20,
            crowding_factor: 10.0,
        }
    }
}

impl GeneticConfig {
    pub fn validate(&self) -> SearchResult<()> {
        if self.population_size == 0 {
            return Err(SearchError::Configuration(
                "population_size must be at least 1".to_string(),
            ));
        }
        if self.hall_of_fame_size == 0 || self.hall_of_fame_size > self.population_size {
            return Err(SearchError::Configuration(format!(
                "hall_of_fame_size must be in 1..={}, got {}",
                self.population_size, self.hall_of_fame_size
            )));
        }
        for (name, p) in [
            ("prob_crossover", self.prob_crossover),
            ("prob_mutation", self.prob_mutation),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(SearchError::Configuration(format!(
                    "{name} must be within [0, 1], got {p}"
                )));
            }
        }
        Ok(())
    }
}

/// Where the operator probabilities come from
#[derive(Debug)]
pub enum RateSource {
    Static { cxpb: f64, mutpb: f64 },
    Adaptive(AdaptiveParameterController),
}

impl RateSource {
    /// Current (crossover, mutation) probabilities
    pub fn rates(&self) -> SearchResult<(f64, f64)> {
        match self {
            RateSource::Static { cxpb, mutpb } => Ok((*cxpb, *mutpb)),
            RateSource::Adaptive(controller) => Ok((
                controller.value(CROSSOVER_PARAMETER)?,
                controller.value(MUTATION_PARAMETER)?,
            )),
        }
    }

    /// Feed the generation's mean cost; returns the time spent logging
    fn observe(&mut self, mean: f64) -> Duration {
        match self {
            RateSource::Static { .. } => Duration::ZERO,
            RateSource::Adaptive(controller) => controller.register(mean).log_cost,
        }
    }
}

#[derive(Debug)]
pub struct GenerationalGa {
    config: GeneticConfig,
    bounds: MultiBounds,
    rates: RateSource,
    selection: TournamentSelection,
    crossover: SbxCrossover,
    mutation: PolynomialMutation,
    population: Population,
    hall_of_fame: HallOfFame,
    elite_size: usize,
    generation: usize,
}

impl GenerationalGa {
    /// GA with the fixed probabilities from `config`
    pub fn new(config: GeneticConfig, bounds: MultiBounds) -> SearchResult<Self> {
        let rates = RateSource::Static {
            cxpb: config.prob_crossover,
            mutpb: config.prob_mutation,
        };
        Self::with_rates(config, bounds, rates)
    }

    /// GA whose probabilities are steered by `controller`
    ///
    /// The controller must declare the `cxpb` and `mutpb` parameters.
    pub fn adaptive(
        config: GeneticConfig,
        bounds: MultiBounds,
        controller: AdaptiveParameterController,
    ) -> SearchResult<Self> {
        Self::with_rates(config, bounds, RateSource::Adaptive(controller))
    }

    fn with_rates(
        config: GeneticConfig,
        bounds: MultiBounds,
        rates: RateSource,
    ) -> SearchResult<Self> {
        config.validate()?;
        rates.rates()?;
        Ok(Self {
            selection: TournamentSelection::binary(),
            crossover: SbxCrossover::new(config.crowding_factor)?.with_gene_probability(0.5),
            mutation: PolynomialMutation::new(config.crowding_factor)?,
            hall_of_fame: HallOfFame::new(config.hall_of_fame_size)?,
            population: Population::new(),
            elite_size: 0,
            generation: 0,
            config,
            bounds,
            rates,
        })
    }

    pub fn config(&self) -> &GeneticConfig {
        &self.config
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn hall_of_fame(&self) -> &HallOfFame {
        &self.hall_of_fame
    }

    pub fn rate_source(&self) -> &RateSource {
        &self.rates
    }

    /// The adaptive controller, when rates are adaptive
    pub fn controller(&self) -> Option<&AdaptiveParameterController> {
        match &self.rates {
            RateSource::Adaptive(controller) => Some(controller),
            RateSource::Static { .. } => None,
        }
    }

    fn summary(&self) -> SearchResult<CostSummary> {
        self.population.summary().ok_or(SearchError::EmptyPopulation)
    }
}

impl SearchStrategy for GenerationalGa {
    fn name(&self) -> &'static str {
        match self.rates {
            RateSource::Static { .. } => "genetic",
            RateSource::Adaptive(_) => "adaptive_genetic",
        }
    }

    fn initialize<O, R>(&mut self, oracle: &O, rng: &mut R) -> SearchResult<StepOutcome>
    where
        O: ObjectiveOracle + ?Sized,
        R: Rng + ?Sized,
    {
        self.generation = 0;
        self.population = Population::random(self.config.population_size, &self.bounds, rng);
        self.population.evaluate(oracle)?;
        self.hall_of_fame.clear();
        self.hall_of_fame.update(&self.population);
        self.elite_size = self.hall_of_fame.len();

        let summary = self.summary()?;
        Ok(StepOutcome::with_summary(summary.best, &summary, true))
    }

    fn step<O, R>(&mut self, oracle: &O, rng: &mut R) -> SearchResult<StepOutcome>
    where
        O: ObjectiveOracle + ?Sized,
        R: Rng + ?Sized,
    {
        if self.population.is_empty() {
            return Err(SearchError::EmptyPopulation);
        }
        self.generation += 1;
        let previous_best = self.best_cost();
        let (cxpb, mutpb) = self.rates.rates()?;

        let costs: Vec<f64> = self.population.iter().map(Individual::rank_cost).collect();
        let parents = self.selection.select_many(
            &costs,
            self.population.len().saturating_sub(self.elite_size),
            rng,
        )?;
        let mut offspring: Vec<Individual> = parents
            .into_iter()
            .map(|i| self.population[i].clone())
            .collect();

        vary_and(
            &mut offspring,
            &self.crossover,
            &self.mutation,
            cxpb,
            mutpb,
            &self.bounds,
            rng,
        )?;

        let mut next = Population::from_individuals(offspring);
        let evaluations = next.evaluate(oracle)?;
        for elite in self.hall_of_fame.entries() {
            next.push(elite.clone());
        }
        self.hall_of_fame.update(&next);
        self.population = next;

        let summary = self.summary()?;
        let log_cost = self.rates.observe(summary.mean);
        debug!(
            generation = self.generation,
            evaluations,
            cxpb,
            mutpb,
            best = summary.best,
            mean = summary.mean,
            "generation complete"
        );

        let improved = match (previous_best, self.best_cost()) {
            (Some(before), Some(after)) => after < before,
            (None, Some(_)) => true,
            _ => false,
        };
        Ok(StepOutcome::with_summary(summary.best, &summary, improved)
            .with_side_effect_cost(log_cost))
    }

    fn current_best(&self) -> Option<&Solution> {
        self.hall_of_fame.best().map(|i| &i.solution)
    }

    fn best_cost(&self) -> Option<f64> {
        self.hall_of_fame.best().and_then(|i| i.cost)
    }
}
