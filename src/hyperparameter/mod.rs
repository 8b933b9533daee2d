//! Hyperparameter adaptation
//!
//! Operator probabilities of a population search can be driven online by
//! the observed trend of its mean cost. The controller keeps a fixed window
//! of recent observations and steps each parameter within its bounds.

pub mod adaptive;
pub mod ring_buffer;

pub mod prelude {
    pub use super::adaptive::*;
    pub use super::ring_buffer::*;
}
