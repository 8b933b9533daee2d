//! Objective evaluation
//!
//! This module provides the oracle abstraction and the polygon rendering
//! objective.

pub mod raster;
pub mod traits;

pub mod prelude {
    pub use super::raster::*;
    pub use super::traits::*;
}
