//! Trend-driven parameter control
//!
//! The controller watches a stream of scalar observations (typically the
//! population's mean cost), fits a least-squares slope over the most recent
//! window and nudges each tracked parameter up or down by a fixed step.
//! Every value is saturated into its bounds after each step.

use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{SearchError, SearchResult};
use crate::hyperparameter::ring_buffer::CircularBuffer;

/// Direction in which the objective is optimized
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    Minimize,
    Maximize,
}

impl ProblemType {
    /// Sign applied to the raw slope class
    pub fn sign(&self) -> i8 {
        match self {
            ProblemType::Minimize => -1,
            ProblemType::Maximize => 1,
        }
    }
}

/// Slope estimator used to classify progress
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMethod {
    /// Ordinary least squares against observation ordinal
    Ols,
}

impl FromStr for TrendMethod {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ols" => Ok(TrendMethod::Ols),
            _ => Err(SearchError::UnsupportedMethod {
                kind: "trend estimation",
                name: s.to_string(),
            }),
        }
    }
}

/// Progress classification, already oriented by problem type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trend {
    /// Objective moving the wrong way; parameters step up
    Regressing,
    /// Slope inside the threshold band; parameters get a small bump up
    Stalled,
    /// Objective improving; parameters step down
    Progressing,
}

impl Trend {
    /// Oriented code: -1, 0 or +1
    pub fn code(&self) -> i8 {
        match self {
            Trend::Regressing => -1,
            Trend::Stalled => 0,
            Trend::Progressing => 1,
        }
    }

    fn from_code(code: i8) -> Self {
        match code {
            c if c <= -1 => Trend::Regressing,
            c if c >= 1 => Trend::Progressing,
            _ => Trend::Stalled,
        }
    }

    /// Classify a raw slope with a symmetric threshold, then orient it
    pub fn classify(slope: f64, threshold: f64, problem: ProblemType) -> Self {
        let raw: i8 = if slope >= threshold {
            1
        } else if slope <= -threshold {
            -1
        } else {
            0
        };
        Self::from_code(raw * problem.sign())
    }
}

/// Static description of one controlled parameter
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterSetting {
    pub name: String,
    pub initial: f64,
    pub lower: f64,
    pub upper: f64,
    /// Number of steps spanning the range
    pub levels: u32,
    /// Divisor of the step applied when progress stalls
    pub adjustment_factor: f64,
    pub enabled: bool,
}

impl ParameterSetting {
    pub fn new(name: impl Into<String>, initial: f64, lower: f64, upper: f64) -> Self {
        Self {
            name: name.into(),
            initial,
            lower,
            upper,
            levels: 40,
            adjustment_factor: 0.2,
            enabled: true,
        }
    }

    pub fn with_levels(mut self, levels: u32) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_adjustment_factor(mut self, factor: f64) -> Self {
        self.adjustment_factor = factor;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Size of one full step: range divided by levels
    pub fn velocity(&self) -> f64 {
        (self.upper - self.lower) / self.levels as f64
    }

    pub fn saturate(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.upper)
    }

    pub fn validate(&self) -> SearchResult<()> {
        let invalid = |reason: &str| {
            Err(SearchError::Configuration(format!(
                "parameter '{}': {reason}",
                self.name
            )))
        };
        if !(self.lower.is_finite() && self.upper.is_finite() && self.initial.is_finite()) {
            return invalid("bounds and initial value must be finite");
        }
        if self.lower > self.upper {
            return invalid("lower bound exceeds upper bound");
        }
        if self.initial < self.lower || self.initial > self.upper {
            return invalid("initial value outside bounds");
        }
        if self.levels == 0 {
            return invalid("levels must be at least 1");
        }
        if self.adjustment_factor == 0.0 || !self.adjustment_factor.is_finite() {
            return invalid("adjustment factor must be finite and non-zero");
        }
        Ok(())
    }
}

/// On-demand view of a parameter's current value
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParameterView {
    pub value: f64,
    /// False for disabled parameters, whose value never moves
    pub is_adaptive: bool,
}

/// What a single `register` call did
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Registration {
    /// Fitted slope, once the buffer has filled
    pub slope: Option<f64>,
    pub trend: Option<Trend>,
    /// Time spent writing the observation log
    pub log_cost: Duration,
}

impl Registration {
    fn skipped() -> Self {
        Self {
            slope: None,
            trend: None,
            log_cost: Duration::ZERO,
        }
    }
}

/// Feedback controller for operator probabilities
pub struct AdaptiveParameterController {
    settings: Vec<ParameterSetting>,
    values: Vec<f64>,
    buffer: CircularBuffer,
    ordinals: VecDeque<usize>,
    threshold: f64,
    problem: ProblemType,
    method: TrendMethod,
    enabled: bool,
    log: Option<Box<dyn Write + Send>>,
}

impl fmt::Debug for AdaptiveParameterController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptiveParameterController")
            .field("settings", &self.settings)
            .field("values", &self.values)
            .field("buffer", &self.buffer)
            .field("threshold", &self.threshold)
            .field("problem", &self.problem)
            .field("method", &self.method)
            .field("enabled", &self.enabled)
            .field("logging", &self.log.is_some())
            .finish()
    }
}

impl AdaptiveParameterController {
    pub fn new(
        buffer_capacity: usize,
        settings: Vec<ParameterSetting>,
        threshold: f64,
        problem: ProblemType,
        method: TrendMethod,
    ) -> SearchResult<Self> {
        if buffer_capacity < 2 {
            return Err(SearchError::Configuration(format!(
                "trend buffer needs at least 2 slots, got {buffer_capacity}"
            )));
        }
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(SearchError::Configuration(format!(
                "trend threshold must be finite and non-negative, got {threshold}"
            )));
        }
        for (i, setting) in settings.iter().enumerate() {
            setting.validate()?;
            if settings[..i].iter().any(|s| s.name == setting.name) {
                return Err(SearchError::Configuration(format!(
                    "parameter '{}' declared twice",
                    setting.name
                )));
            }
        }
        Ok(Self {
            values: settings.iter().map(|s| s.initial).collect(),
            settings,
            buffer: CircularBuffer::new(buffer_capacity)?,
            ordinals: (0..buffer_capacity).collect(),
            threshold,
            problem,
            method,
            enabled: true,
            log: None,
        })
    }

    /// Build with the trend method given by name
    pub fn with_method_name(
        buffer_capacity: usize,
        settings: Vec<ParameterSetting>,
        threshold: f64,
        problem: ProblemType,
        method: &str,
    ) -> SearchResult<Self> {
        Self::new(buffer_capacity, settings, threshold, problem, method.parse()?)
    }

    /// Append one line per observation to a file
    pub fn with_observation_log(self, path: impl AsRef<Path>) -> SearchResult<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            SearchError::Configuration(format!(
                "cannot open observation log {}: {e}",
                path.display()
            ))
        })?;
        Ok(self.with_log_writer(BufWriter::new(file)))
    }

    /// Append observation lines to an arbitrary writer
    pub fn with_log_writer<W: Write + Send + 'static>(mut self, writer: W) -> Self {
        self.log = Some(Box::new(writer));
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Pause or resume; while paused `register` is a no-op
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn sum(&self) -> Option<f64> {
        self.buffer.sum()
    }

    pub fn mean(&self) -> Option<f64> {
        self.buffer.mean()
    }

    /// Buffered observations, oldest first
    pub fn observations(&self) -> Vec<f64> {
        self.buffer.values()
    }

    pub fn buffer(&self) -> &CircularBuffer {
        &self.buffer
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn problem_type(&self) -> ProblemType {
        self.problem
    }

    pub fn method(&self) -> TrendMethod {
        self.method
    }

    pub fn settings(&self) -> &[ParameterSetting] {
        &self.settings
    }

    /// Live values in declaration order
    pub fn parameters(&self) -> &[f64] {
        &self.values
    }

    fn index_of(&self, name: &str) -> SearchResult<usize> {
        self.settings
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| SearchError::UnknownParameter(name.to_string()))
    }

    /// Current value of a parameter; disabled parameters keep their initial value
    pub fn view(&self, name: &str) -> SearchResult<ParameterView> {
        let idx = self.index_of(name)?;
        let setting = &self.settings[idx];
        Ok(if setting.enabled {
            ParameterView {
                value: self.values[idx],
                is_adaptive: true,
            }
        } else {
            ParameterView {
                value: setting.initial,
                is_adaptive: false,
            }
        })
    }

    pub fn value(&self, name: &str) -> SearchResult<f64> {
        self.view(name).map(|v| v.value)
    }

    /// Record an observation and adapt every enabled parameter
    pub fn register(&mut self, value: f64) -> Registration {
        if !self.enabled {
            return Registration::skipped();
        }

        self.buffer.push(value);

        let (slope, trend) = if self.buffer.is_full() {
            let slope = self.slope();
            let trend = Trend::classify(slope, self.threshold, self.problem);
            self.apply(trend);
            self.ordinals.rotate_right(1);
            (Some(slope), Some(trend))
        } else {
            (None, None)
        };

        debug!(
            observation = value,
            ?slope,
            ?trend,
            parameters = ?self.values,
            "registered observation"
        );

        let log_cost = self.write_log(value, slope);
        Registration {
            slope,
            trend,
            log_cost,
        }
    }

    /// Least-squares slope of slot contents against their ordinals
    fn slope(&self) -> f64 {
        match self.method {
            TrendMethod::Ols => {
                let ys = self.buffer.slots();
                let n = ys.len() as f64;
                let xm = self.ordinals.iter().sum::<usize>() as f64 / n;
                let ym = ys.iter().sum::<f64>() / n;
                let (num, den) = self
                    .ordinals
                    .iter()
                    .zip(ys)
                    .fold((0.0, 0.0), |(num, den), (&x, &y)| {
                        let dx = x as f64 - xm;
                        (num + dx * (y - ym), den + dx * dx)
                    });
                num / den
            }
        }
    }

    fn apply(&mut self, trend: Trend) {
        for (setting, value) in self.settings.iter().zip(self.values.iter_mut()) {
            if !setting.enabled {
                continue;
            }
            let velocity = setting.velocity();
            let step = match trend {
                Trend::Regressing => velocity,
                Trend::Progressing => -velocity,
                Trend::Stalled => velocity / setting.adjustment_factor,
            };
            *value = setting.saturate(*value + step);
        }
    }

    fn write_log(&mut self, value: f64, slope: Option<f64>) -> Duration {
        let Some(writer) = self.log.as_mut() else {
            return Duration::ZERO;
        };
        let started = Instant::now();
        let mut line = value.to_string();
        for v in &self.values {
            line.push('\t');
            line.push_str(&v.to_string());
        }
        line.push('\t');
        match slope {
            Some(s) => line.push_str(&s.to_string()),
            None => line.push_str("NA"),
        }
        line.push('\n');

        if let Err(e) = writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.flush())
        {
            warn!(error = %e, "observation log write failed; logging disabled");
            self.log = None;
        }
        started.elapsed()
    }

    /// Forget every observation; parameter values are kept
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.ordinals = (0..self.buffer.capacity()).collect();
    }

    /// Flush and close the observation log
    pub fn close_log(&mut self) {
        if let Some(mut writer) = self.log.take() {
            if let Err(e) = writer.flush() {
                warn!(error = %e, "observation log flush failed");
            }
        }
    }
}

impl Drop for AdaptiveParameterController {
    fn drop(&mut self) {
        self.close_log();
    }
}
