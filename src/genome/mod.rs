//! Solution representation
//!
//! This module provides the solution vector and the bounds of its domain.

pub mod bounds;
pub mod solution;

pub mod prelude {
    pub use super::bounds::*;
    pub use super::solution::*;
}
