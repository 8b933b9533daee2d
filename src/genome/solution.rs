//! Real-valued solution vector
//!
//! A `Solution` is the fixed-length parameter vector that encodes a set of
//! coloured polygons. It carries no identity beyond its values and compares
//! by value.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::genome::bounds::MultiBounds;

/// Fixed-length real-valued parameter vector
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    genes: Vec<f64>,
}

impl Solution {
    pub fn new(genes: Vec<f64>) -> Self {
        Self { genes }
    }

    /// Draw every gene uniformly from its bounds
    pub fn random<R: Rng + ?Sized>(bounds: &MultiBounds, rng: &mut R) -> Self {
        Self {
            genes: bounds.bounds.iter().map(|b| b.sample(rng)).collect(),
        }
    }

    /// Number of genes
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn genes(&self) -> &[f64] {
        &self.genes
    }

    pub fn genes_mut(&mut self) -> &mut [f64] {
        &mut self.genes
    }

    /// Add independent uniform noise in `[-factor * range, +factor * range]`
    /// to every gene, then saturate into the domain.
    ///
    /// A zero factor returns an identical copy.
    pub fn perturbed<R: Rng + ?Sized>(
        &self,
        factor: f64,
        bounds: &MultiBounds,
        rng: &mut R,
    ) -> Self {
        let mut genes = self.genes.clone();
        for (gene, bound) in genes.iter_mut().zip(&bounds.bounds) {
            let amplitude = bound.range() * factor;
            if amplitude > 0.0 {
                *gene = bound.clamp(*gene + rng.gen_range(-amplitude..=amplitude));
            }
        }
        Self { genes }
    }

    /// Replace `count` randomly chosen genes (with repetition) by fresh
    /// uniform values from their bounds.
    pub fn reset_random_genes<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        bounds: &MultiBounds,
        rng: &mut R,
    ) {
        if self.genes.is_empty() {
            return;
        }
        for _ in 0..count {
            let idx = rng.gen_range(0..self.genes.len());
            if let Some(bound) = bounds.get(idx) {
                self.genes[idx] = bound.sample(rng);
            }
        }
    }
}

impl std::ops::Index<usize> for Solution {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.genes[index]
    }
}

impl From<Vec<f64>> for Solution {
    fn from(genes: Vec<f64>) -> Self {
        Self { genes }
    }
}

impl From<Solution> for Vec<f64> {
    fn from(solution: Solution) -> Self {
        solution.genes
    }
}
