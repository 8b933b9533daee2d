//! Best-solution snapshots
//!
//! Snapshots are optional side effects of a run. Their failures are
//! reported to the caller, which logs them and carries on.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::fitness::raster::RasterObjective;
use crate::genome::solution::Solution;

/// Label used for the snapshot taken after the run ends
pub const FINAL_LABEL: &str = "final_result";

/// When to persist the current best solution
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotPolicy {
    #[default]
    Disabled,
    /// Whenever a step strictly improves the best cost
    OnImprovement,
    /// Every `n` generations
    Every(u64),
}

impl SnapshotPolicy {
    pub fn should_snapshot(&self, generation: u64, improved: bool) -> bool {
        match *self {
            SnapshotPolicy::Disabled => false,
            SnapshotPolicy::OnImprovement => improved,
            SnapshotPolicy::Every(n) => n > 0 && generation % n == 0,
        }
    }
}

/// Consumer of labelled best-solution snapshots
pub trait SnapshotSink {
    fn save(
        &mut self,
        label: &str,
        solution: &Solution,
        annotation: Option<&str>,
    ) -> Result<(), SnapshotError>;
}

#[derive(Serialize)]
struct SnapshotDocument<'a> {
    label: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    annotation: Option<&'a str>,
    genes: &'a [f64],
}

/// Writes `<label>_solution.json` files into a directory
#[derive(Clone, Debug)]
pub struct JsonSnapshotWriter {
    dir: PathBuf,
}

impl JsonSnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{label}_solution.json"))
    }

    /// Read back the genes of a saved snapshot
    pub fn load(&self, label: &str) -> Result<Solution, SnapshotError> {
        let text = fs::read_to_string(self.path_for(label))?;
        let doc: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;
        let genes: Vec<f64> = serde_json::from_value(doc["genes"].clone())
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;
        Ok(Solution::new(genes))
    }
}

impl SnapshotSink for JsonSnapshotWriter {
    fn save(
        &mut self,
        label: &str,
        solution: &Solution,
        annotation: Option<&str>,
    ) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.dir)?;
        let doc = SnapshotDocument {
            label,
            annotation,
            genes: solution.genes(),
        };
        let json = serde_json::to_string_pretty(&doc)
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;
        fs::write(self.path_for(label), json)?;
        Ok(())
    }
}

/// Renders the solution and writes `<label>_generated.png` plus
/// `<label>_compare.png` (reference on the left, rendering on the right)
#[derive(Clone, Debug)]
pub struct ImageSnapshotWriter {
    dir: PathBuf,
    objective: RasterObjective,
}

impl ImageSnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>, objective: RasterObjective) -> Self {
        Self {
            dir: dir.into(),
            objective,
        }
    }

    pub fn generated_path(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{label}_generated.png"))
    }

    pub fn compare_path(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{label}_compare.png"))
    }
}

impl SnapshotSink for ImageSnapshotWriter {
    fn save(
        &mut self,
        label: &str,
        solution: &Solution,
        _annotation: Option<&str>,
    ) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.dir)?;
        let generated = self.objective.render(solution);
        generated.save_png(self.generated_path(label))?;
        self.objective
            .reference()
            .side_by_side(&generated)
            .save_png(self.compare_path(label))?;
        Ok(())
    }
}

/// Both sinks receive every snapshot; the first failure is returned
impl<A: SnapshotSink, B: SnapshotSink> SnapshotSink for (A, B) {
    fn save(
        &mut self,
        label: &str,
        solution: &Solution,
        annotation: Option<&str>,
    ) -> Result<(), SnapshotError> {
        let first = self.0.save(label, solution, annotation);
        let second = self.1.save(label, solution, annotation);
        first.and(second)
    }
}

impl<S: SnapshotSink + ?Sized> SnapshotSink for Box<S> {
    fn save(
        &mut self,
        label: &str,
        solution: &Solution,
        annotation: Option<&str>,
    ) -> Result<(), SnapshotError> {
        (**self).save(label, solution, annotation)
    }
}

pub mod prelude {
    pub use super::{
        ImageSnapshotWriter, JsonSnapshotWriter, SnapshotPolicy, SnapshotSink, FINAL_LABEL,
    };
}
