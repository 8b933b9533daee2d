//! Run configuration
//!
//! A run is described by a TOML document with a `[run]` section (problem
//! shape, budgets, persistence) and an `[algorithm]` section tagged by
//! `kind`. Unknown keys are rejected everywhere.
//!
//! ```toml
//! [run]
//! polygons = 50
//! metric = "SSIM"
//! max_generation = 500
//! snapshot = { every = 100 }
//!
//! [algorithm]
//! kind = "tabu_search"
//! tabu_list_size = 20
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::algorithms::generational_ga::{CROSSOVER_PARAMETER, MUTATION_PARAMETER};
use crate::algorithms::{
    ClonalSelection, ClonalSelectionConfig, GenerationalGa, GeneticConfig, IteratedLocalSearch,
    IteratedLocalSearchConfig, Strategy, TabuSearch, TabuSearchConfig,
};
use crate::diagnostics::{NullStatistics, StatisticsSink, TsvStatistics};
use crate::error::{SearchError, SearchResult};
use crate::execution::ExecutionContract;
use crate::fitness::raster::{ObjectiveMetric, PolygonLayout, RasterImage, RasterObjective};
use crate::genome::bounds::MultiBounds;
use crate::hyperparameter::adaptive::{
    AdaptiveParameterController, ParameterSetting, ProblemType, TrendMethod,
};
use crate::snapshot::SnapshotPolicy;
use crate::termination::TerminationPolicy;

/// Complete description of a run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub run: RunSection,
    pub algorithm: AlgorithmConfig,
}

/// Problem shape, budgets and persistence
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    pub polygons: usize,
    /// Vertices per polygon
    pub vertices: usize,
    /// Objective metric name, e.g. "MSE" or "SSIM"
    pub metric: String,
    pub max_generation: u64,
    /// Processing-time budget; takes priority over the generation budget.
    /// A negative value is unset
    pub max_time_secs: Option<f64>,
    /// Stop once the best cost reaches this value; a negative value is unset
    pub target_fitness: Option<f64>,
    pub snapshot: SnapshotPolicy,
    /// Log every generation at info level
    pub verbose: bool,
    pub seed: Option<u64>,
    /// Tab-separated per-generation statistics file
    pub statistics: Option<PathBuf>,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            polygons: 100,
            vertices: 3,
            metric: "MSE".to_string(),
            max_generation: 1000,
            max_time_secs: None,
            target_fitness: None,
            snapshot: SnapshotPolicy::Every(1000),
            verbose: false,
            seed: None,
            statistics: None,
        }
    }
}

/// Strategy selection and its parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlgorithmConfig {
    ClonalSelection(ClonalSelectionConfig),
    IteratedLocalSearch(IteratedLocalSearchConfig),
    TabuSearch(TabuSearchConfig),
    Genetic(GeneticConfig),
    AdaptiveGenetic(AdaptiveGeneticConfig),
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        AlgorithmConfig::Genetic(GeneticConfig::default())
    }
}

/// Range and step schedule of one adaptive probability
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateSetting {
    pub enabled: bool,
    pub initial: f64,
    pub lower: f64,
    pub upper: f64,
    pub adjustment_factor: f64,
    pub levels: u32,
}

impl Default for RateSetting {
    fn default() -> Self {
        Self {
            enabled: true,
            initial: 0.4,
            lower: 0.01,
            upper: 0.7,
            adjustment_factor: 0.2,
            levels: 40,
        }
    }
}

impl RateSetting {
    pub fn to_parameter(&self, name: &str) -> ParameterSetting {
        ParameterSetting::new(name, self.initial, self.lower, self.upper)
            .with_levels(self.levels)
            .with_adjustment_factor(self.adjustment_factor)
            .with_enabled(self.enabled)
    }
}

/// Generational GA whose probabilities follow the mean-cost trend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdaptiveGeneticConfig {
    pub population_size: usize,
    pub hall_of_fame_size: usize,
    pub crowding_factor: f64,
    pub mutation: RateSetting,
    pub crossover: RateSetting,
    /// Observations fitted per trend estimate
    pub buffer: usize,
    /// Slopes within ±threshold count as stalled
    pub threshold: f64,
    pub trend_method: String,
    pub observation_log: Option<PathBuf>,
}

impl Default for AdaptiveGeneticConfig {
    fn default() -> Self {
        Self {
            population_size: 200,
            hall_of_fame_size: 20,
            crowding_factor: 10.0,
            mutation: RateSetting::default(),
            crossover: RateSetting::default(),
            buffer: 100,
            threshold: 0.5,
            trend_method: "ols".to_string(),
            observation_log: None,
        }
    }
}

impl AdaptiveGeneticConfig {
    fn genetic(&self) -> GeneticConfig {
        GeneticConfig {
            population_size: self.population_size,
            prob_crossover: self.crossover.initial,
            prob_mutation: self.mutation.initial,
            hall_of_fame_size: self.hall_of_fame_size,
            crowding_factor: self.crowding_factor,
        }
    }

    /// Controller over `mutpb` and `cxpb`, opening the observation log if set
    pub fn controller(&self) -> SearchResult<AdaptiveParameterController> {
        let method: TrendMethod = self.trend_method.parse()?;
        let controller = AdaptiveParameterController::new(
            self.buffer,
            vec![
                self.mutation.to_parameter(MUTATION_PARAMETER),
                self.crossover.to_parameter(CROSSOVER_PARAMETER),
            ],
            self.threshold,
            ProblemType::Minimize,
            method,
        )?;
        match &self.observation_log {
            Some(path) => controller.with_observation_log(path),
            None => Ok(controller),
        }
    }

    pub fn validate(&self) -> SearchResult<()> {
        self.genetic().validate()?;
        self.trend_method.parse::<TrendMethod>()?;
        for (name, rate) in [
            (MUTATION_PARAMETER, &self.mutation),
            (CROSSOVER_PARAMETER, &self.crossover),
        ] {
            if rate.lower < 0.0 || rate.upper > 1.0 {
                return Err(SearchError::Configuration(format!(
                    "{name} range must lie within [0, 1]"
                )));
            }
            rate.to_parameter(name).validate()?;
        }
        if self.buffer < 2 {
            return Err(SearchError::Configuration(format!(
                "buffer must hold at least 2 observations, got {}",
                self.buffer
            )));
        }
        Ok(())
    }
}

impl RunConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> SearchResult<Self> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> SearchResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SearchError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> SearchResult<()> {
        self.layout()?;
        self.metric()?;
        self.max_time()?;
        if let SnapshotPolicy::Every(0) = self.run.snapshot {
            return Err(SearchError::Configuration(
                "snapshot cadence must be at least 1".to_string(),
            ));
        }
        match &self.algorithm {
            AlgorithmConfig::ClonalSelection(c) => c.validate(),
            AlgorithmConfig::IteratedLocalSearch(c) => c.validate(),
            AlgorithmConfig::TabuSearch(c) => c.validate(),
            AlgorithmConfig::Genetic(c) => c.validate(),
            AlgorithmConfig::AdaptiveGenetic(c) => c.validate(),
        }
    }

    pub fn layout(&self) -> SearchResult<PolygonLayout> {
        PolygonLayout::new(self.run.polygons, self.run.vertices)
    }

    pub fn metric(&self) -> SearchResult<ObjectiveMetric> {
        self.run.metric.parse()
    }

    /// Time budget, `None` when unset or negative
    pub fn max_time(&self) -> SearchResult<Option<Duration>> {
        match self.run.max_time_secs {
            Some(secs) if secs < 0.0 => Ok(None),
            Some(secs) => Duration::try_from_secs_f64(secs).map(Some).map_err(|e| {
                SearchError::Configuration(format!("invalid max_time_secs {secs}: {e}"))
            }),
            None => Ok(None),
        }
    }

    pub fn termination_policy(&self) -> SearchResult<TerminationPolicy> {
        Ok(TerminationPolicy::from_budgets(
            self.run.target_fitness,
            self.max_time()?,
            self.run.max_generation,
        ))
    }

    /// Seeded generator, or one seeded from entropy when no seed is set
    pub fn rng(&self) -> StdRng {
        match self.run.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Oracle comparing rendered polygons against `reference`
    pub fn build_objective(&self, reference: RasterImage) -> SearchResult<RasterObjective> {
        Ok(RasterObjective::new(self.layout()?, reference, self.metric()?))
    }

    /// Statistics file named by `run.statistics`, or a sink that discards
    pub fn statistics_sink(&self) -> SearchResult<Box<dyn StatisticsSink>> {
        let sink: Box<dyn StatisticsSink> = match &self.run.statistics {
            Some(path) => Box::new(TsvStatistics::create(path)?),
            None => Box::new(NullStatistics),
        };
        Ok(sink)
    }

    pub fn execution_contract<S: StatisticsSink + 'static>(
        &self,
        statistics: S,
    ) -> SearchResult<ExecutionContract> {
        Ok(ExecutionContract::new(self.termination_policy()?, statistics)
            .with_verbose(self.run.verbose))
    }

    /// Strategy over the given domain
    pub fn build_strategy(&self, bounds: MultiBounds) -> SearchResult<Strategy> {
        Ok(match &self.algorithm {
            AlgorithmConfig::ClonalSelection(c) => ClonalSelection::new(c.clone(), bounds)?.into(),
            AlgorithmConfig::IteratedLocalSearch(c) => {
                IteratedLocalSearch::new(c.clone(), bounds)?.into()
            }
            AlgorithmConfig::TabuSearch(c) => TabuSearch::new(c.clone(), bounds)?.into(),
            AlgorithmConfig::Genetic(c) => GenerationalGa::new(c.clone(), bounds)?.into(),
            AlgorithmConfig::AdaptiveGenetic(c) => {
                GenerationalGa::adaptive(c.genetic(), bounds, c.controller()?)?.into()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::SearchStrategy;
    use crate::diagnostics::{GenerationRecord, STATISTICS_HEADER};

    #[test]
    fn test_defaults_validate() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.layout().unwrap().param_count(), 1000);
        assert_eq!(config.termination_policy().unwrap(), TerminationPolicy::generations(1000));
    }

    #[test]
    fn test_parse_tabu_search() {
        let config = RunConfig::from_toml_str(
            r#"
            [run]
            polygons = 2
            vertices = 4
            metric = "ssim"
            max_generation = 50
            snapshot = "on_improvement"

            [algorithm]
            kind = "tabu_search"
            tabu_list_size = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.run.snapshot, SnapshotPolicy::OnImprovement);
        assert_eq!(config.metric().unwrap(), ObjectiveMetric::Ssim);
        let AlgorithmConfig::TabuSearch(tabu) = &config.algorithm else {
            panic!("expected tabu search");
        };
        assert_eq!(tabu.tabu_list_size, 5);
        assert_eq!(tabu.perturbation_factor, 0.1);

        let strategy = config.build_strategy(config.layout().unwrap().bounds()).unwrap();
        assert_eq!(strategy.name(), "tabu_search");
    }

    #[test]
    fn test_parse_adaptive_genetic() {
        let config = RunConfig::from_toml_str(
            r#"
            [run]
            snapshot = { every = 25 }
            max_time_secs = 2.5

            [algorithm]
            kind = "adaptive_genetic"
            population_size = 40
            buffer = 10

            [algorithm.mutation]
            initial = 0.3
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.run.snapshot, SnapshotPolicy::Every(25));
        assert!(matches!(
            config.termination_policy().unwrap(),
            TerminationPolicy::TimeBudget(_)
        ));

        let Strategy::Genetic(ga) = config.build_strategy(MultiBounds::unit(4)).unwrap() else {
            panic!("expected a genetic strategy");
        };
        let controller = ga.controller().unwrap();
        assert_eq!(controller.capacity(), 10);
        let mutation = controller.view(MUTATION_PARAMETER).unwrap();
        assert_eq!(mutation.value, 0.3);
        assert!(!mutation.is_adaptive);
        assert!(controller.view(CROSSOVER_PARAMETER).unwrap().is_adaptive);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result = RunConfig::from_toml_str(
            r#"
            [run]
            polygon_count = 3
            "#,
        );
        assert!(matches!(result, Err(SearchError::Config(_))));

        let result = RunConfig::from_toml_str(
            r#"
            [algorithm]
            kind = "iterated_local_search"
            neighbours = 3
            "#,
        );
        assert!(matches!(result, Err(SearchError::Config(_))));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_metric = r#"
            [run]
            metric = "HAMMING"
        "#;
        assert!(matches!(
            RunConfig::from_toml_str(bad_metric),
            Err(SearchError::UnsupportedMethod { .. })
        ));

        let bad_method = r#"
            [algorithm]
            kind = "adaptive_genetic"
            trend_method = "theil_sen"
        "#;
        assert!(matches!(
            RunConfig::from_toml_str(bad_method),
            Err(SearchError::UnsupportedMethod { .. })
        ));

        let bad_probability = r#"
            [algorithm]
            kind = "genetic"
            prob_mutation = 1.2
        "#;
        assert!(matches!(
            RunConfig::from_toml_str(bad_probability),
            Err(SearchError::Configuration(_))
        ));

        let overflowing_budget = r#"
            [run]
            max_time_secs = 1e30
        "#;
        assert!(matches!(
            RunConfig::from_toml_str(overflowing_budget),
            Err(SearchError::Configuration(_))
        ));

        let nan_budget = r#"
            [run]
            max_time_secs = nan
        "#;
        assert!(matches!(
            RunConfig::from_toml_str(nan_budget),
            Err(SearchError::Configuration(_))
        ));
    }

    #[test]
    fn test_negative_target_is_unset() {
        let config = RunConfig::from_toml_str(
            r#"
            [run]
            target_fitness = -1.0
            max_generation = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.termination_policy().unwrap(), TerminationPolicy::generations(7));
    }

    #[test]
    fn test_negative_time_budget_is_unset() {
        let config = RunConfig::from_toml_str(
            r#"
            [run]
            max_time_secs = -1.0
            max_generation = 9
            "#,
        )
        .unwrap();
        assert_eq!(config.max_time().unwrap(), None);
        assert_eq!(config.termination_policy().unwrap(), TerminationPolicy::generations(9));
    }

    #[test]
    fn test_statistics_sink_follows_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.tsv");
        let config = RunConfig {
            run: RunSection {
                statistics: Some(path.clone()),
                ..Default::default()
            },
            ..Default::default()
        };

        let mut sink = config.statistics_sink().unwrap();
        let record = GenerationRecord {
            generation: 0,
            fitness: 0.5,
            elapsed: Duration::ZERO,
            total_time: Duration::ZERO,
            worst: None,
            mean: None,
            std: None,
        };
        sink.record(&record).unwrap();
        sink.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(STATISTICS_HEADER));
        assert!(lines.next().unwrap().starts_with("0\t0.5\t"));

        let unset = RunConfig::default();
        assert!(unset.statistics_sink().unwrap().record(&record).is_ok());
    }

    #[test]
    fn test_unwritable_statistics_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            run: RunSection {
                statistics: Some(dir.path().join("missing").join("stats.tsv")),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.statistics_sink(), Err(SearchError::Statistics(_))));
    }
}
