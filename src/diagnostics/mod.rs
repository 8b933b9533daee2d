//! Diagnostics and statistics
//!
//! One record is written per generation. Sinks are append-only; the
//! tab-separated sink writes its header before the generation-0 record.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::genome::solution::Solution;

/// Column names of the tab-separated statistics file
pub const STATISTICS_HEADER: &str =
    "iteration\tfitness\ttime\ttotal_time\tfitness_worse\tfitness_mean\tfitness_std";

/// Statistics for a single generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Generation index, starting at 0
    pub generation: u64,
    /// Cost reported for this generation
    pub fitness: f64,
    /// Processing time of this generation, excluding side effects
    pub elapsed: Duration,
    /// Sum of `elapsed` over the run so far
    pub total_time: Duration,
    pub worst: Option<f64>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

fn column(value: Option<f64>) -> String {
    value.map_or_else(|| "nan".to_string(), |v| v.to_string())
}

impl GenerationRecord {
    /// Tab-separated line without the trailing newline
    pub fn to_tsv(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.generation,
            self.fitness,
            self.elapsed.as_secs_f64(),
            self.total_time.as_secs_f64(),
            column(self.worst),
            column(self.mean),
            column(self.std)
        )
    }
}

/// Append-only consumer of generation records
pub trait StatisticsSink {
    fn record(&mut self, record: &GenerationRecord) -> io::Result<()>;

    /// Flush and release resources at the end of a run
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Tab-separated statistics writer
pub struct TsvStatistics<W: Write> {
    writer: W,
}

impl TsvStatistics<BufWriter<File>> {
    /// Create (truncate) a statistics file
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> TsvStatistics<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> StatisticsSink for TsvStatistics<W> {
    fn record(&mut self, record: &GenerationRecord) -> io::Result<()> {
        if record.generation == 0 {
            writeln!(self.writer, "{STATISTICS_HEADER}")?;
        }
        writeln!(self.writer, "{}", record.to_tsv())?;
        self.writer.flush()
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Keeps every record in memory
#[derive(Clone, Debug, Default)]
pub struct MemoryStatistics {
    pub records: Vec<GenerationRecord>,
}

impl MemoryStatistics {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatisticsSink for MemoryStatistics {
    fn record(&mut self, record: &GenerationRecord) -> io::Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Discards every record
#[derive(Clone, Copy, Debug, Default)]
pub struct NullStatistics;

impl StatisticsSink for NullStatistics {
    fn record(&mut self, _record: &GenerationRecord) -> io::Result<()> {
        Ok(())
    }
}

impl<S: StatisticsSink + ?Sized> StatisticsSink for Box<S> {
    fn record(&mut self, record: &GenerationRecord) -> io::Result<()> {
        (**self).record(record)
    }

    fn finish(&mut self) -> io::Result<()> {
        (**self).finish()
    }
}

/// Result of a search run
#[derive(Clone, Debug)]
pub struct RunResult {
    /// Best solution found
    pub best: Solution,
    pub best_cost: f64,
    /// Number of records written, including generation 0
    pub generations: u64,
    /// Cumulative processing time
    pub elapsed: Duration,
    pub termination_reason: &'static str,
    /// Every generation record of the run
    pub records: Vec<GenerationRecord>,
}

impl RunResult {
    /// Best cost per generation
    pub fn fitness_history(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.fitness).collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "Run Summary:\n  Generations: {}\n  Best cost: {:.6}\n  Processing time: {:.3}s\n  Termination: {}",
            self.generations,
            self.best_cost,
            self.elapsed.as_secs_f64(),
            self.termination_reason
        )
    }
}

pub mod prelude {
    pub use super::{
        GenerationRecord, MemoryStatistics, NullStatistics, RunResult, StatisticsSink,
        TsvStatistics, STATISTICS_HEADER,
    };
}
