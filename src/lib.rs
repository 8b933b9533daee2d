//! # mosaic-evo
//!
//! Metaheuristic search for approximating a raster image with a fixed
//! number of translucent polygons.
//!
//! A candidate is a real vector in `[0, 1]^n` encoding polygon vertices and
//! colours. Four strategies search that space under one lifecycle:
//!
//! - **Clonal selection**: affinity-proportional cloning with
//!   affinity-inverse hypermutation and diversity injection
//! - **Iterated local search**: perturb, hill-climb, accept ties
//! - **Tabu search**: perturbation walk with a bounded FIFO tabu memory
//! - **Generational GA**: SBX, polynomial mutation and a hall of fame, with
//!   fixed or trend-adapted operator probabilities
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mosaic_evo::prelude::*;
//!
//! let config = RunConfig::from_toml_str(r#"
//!     [run]
//!     polygons = 50
//!     max_generation = 200
//!
//!     [algorithm]
//!     kind = "clonal_selection"
//! "#)?;
//!
//! let objective = config.build_objective(reference_image)?;
//! let mut strategy = config.build_strategy(objective.layout().bounds())?;
//! let mut rng = config.rng();
//!
//! let contract = config.execution_contract(config.statistics_sink()?)?;
//! let mut driver = Driver::new(objective, contract)
//!     .with_snapshots(JsonSnapshotWriter::new("out"), config.run.snapshot);
//! let result = driver.run(&mut strategy, &mut rng)?;
//! println!("{}", result.summary());
//! ```

pub mod algorithms;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod execution;
pub mod fitness;
pub mod genome;
pub mod hyperparameter;
pub mod operators;
pub mod population;
pub mod snapshot;
pub mod termination;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::algorithms::prelude::*;
    pub use crate::config::*;
    pub use crate::diagnostics::prelude::*;
    pub use crate::error::*;
    pub use crate::execution::prelude::*;
    pub use crate::fitness::prelude::*;
    pub use crate::genome::prelude::*;
    pub use crate::hyperparameter::prelude::*;
    pub use crate::operators::prelude::*;
    pub use crate::population::prelude::*;
    pub use crate::snapshot::prelude::*;
    pub use crate::termination::prelude::*;
}
