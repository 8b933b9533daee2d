//! Error types for mosaic-evo
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Error type for the search engine
///
/// Every variant except the snapshot family is fatal to an active run:
/// the search loop has no retry policy of its own.
#[derive(Debug, Error)]
pub enum SearchError {
    /// All antibodies share the same affinity, so normalized affinity is undefined
    #[error("Degenerate population: every antibody has affinity {affinity}")]
    DegeneratePopulation { affinity: f64 },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A named method (trend estimator, objective metric) is not implemented
    #[error("Unsupported {kind} method: {name}")]
    UnsupportedMethod { kind: &'static str, name: String },

    /// The objective oracle failed or produced an unusable value
    #[error("Objective evaluation failed: {0}")]
    Objective(String),

    /// A strategy was asked for results before it had any candidates
    #[error("Empty population")]
    EmptyPopulation,

    /// A controller parameter was looked up by a name it does not track
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// The statistics sink could not record a generation
    #[error("Statistics error: {0}")]
    Statistics(#[from] std::io::Error),

    /// Configuration text could not be parsed
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// A reference image could not be decoded
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Error type for optional best-solution persistence
///
/// These never abort a run; the driver logs them and moves on.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// IO error while writing a snapshot
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A rendered image could not be encoded
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type alias for search operations
pub type SearchResult<T> = Result<T, SearchError>;
