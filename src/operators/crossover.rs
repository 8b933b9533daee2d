//! Crossover operators

use rand::Rng;

use crate::error::{SearchError, SearchResult};
use crate::genome::bounds::MultiBounds;
use crate::genome::solution::Solution;
use crate::operators::traits::CrossoverOperator;

/// Simulated binary crossover, saturated into the domain
///
/// Children are spread around the parents by a factor drawn from a
/// polynomial distribution; a larger `eta` keeps them closer.
#[derive(Clone, Debug)]
pub struct SbxCrossover {
    /// Distribution index
    pub eta: f64,
    /// Per-gene crossover probability
    pub gene_probability: f64,
}

impl SbxCrossover {
    pub fn new(eta: f64) -> SearchResult<Self> {
        if eta.is_nan() || eta < 0.0 {
            return Err(SearchError::Configuration(format!(
                "distribution index must be non-negative, got {eta}"
            )));
        }
        Ok(Self {
            eta,
            gene_probability: 0.5,
        })
    }

    pub fn with_gene_probability(mut self, probability: f64) -> Self {
        self.gene_probability = probability.clamp(0.0, 1.0);
        self
    }

    /// Spread factor for a uniform draw `u`
    fn spread_factor(&self, u: f64) -> f64 {
        if u <= 0.5 {
            (2.0 * u).powf(1.0 / (self.eta + 1.0))
        } else {
            (1.0 / (2.0 * (1.0 - u))).powf(1.0 / (self.eta + 1.0))
        }
    }
}

impl CrossoverOperator for SbxCrossover {
    fn crossover<R: Rng + ?Sized>(
        &self,
        parent1: &Solution,
        parent2: &Solution,
        bounds: &MultiBounds,
        rng: &mut R,
    ) -> SearchResult<(Solution, Solution)> {
        if parent1.len() != parent2.len() {
            return Err(SearchError::Configuration(format!(
                "parent lengths differ: {} vs {}",
                parent1.len(),
                parent2.len()
            )));
        }
        let mut child1 = parent1.clone();
        let mut child2 = parent2.clone();
        for i in 0..parent1.len() {
            if rng.gen::<f64>() >= self.gene_probability {
                continue;
            }
            let (x1, x2) = (parent1[i], parent2[i]);
            if (x1 - x2).abs() <= 1e-14 {
                continue;
            }
            let beta = self.spread_factor(rng.gen::<f64>());
            let mut c1 = 0.5 * ((1.0 + beta) * x1 + (1.0 - beta) * x2);
            let mut c2 = 0.5 * ((1.0 - beta) * x1 + (1.0 + beta) * x2);
            if let Some(bound) = bounds.get(i) {
                c1 = bound.clamp(c1);
                c2 = bound.clamp(c2);
            }
            child1.genes_mut()[i] = c1;
            child2.genes_mut()[i] = c2;
        }
        Ok((child1, child2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sbx_children_stay_in_domain() {
        let mut rng = StdRng::seed_from_u64(42);
        let sbx = SbxCrossover::new(10.0).unwrap().with_gene_probability(1.0);
        let bounds = MultiBounds::unit(8);
        let p1 = Solution::new(vec![0.0; 8]);
        let p2 = Solution::new(vec![1.0; 8]);
        for _ in 0..100 {
            let (c1, c2) = sbx.crossover(&p1, &p2, &bounds, &mut rng).unwrap();
            assert!(bounds.contains_vec(c1.genes()));
            assert!(bounds.contains_vec(c2.genes()));
        }
    }

    #[test]
    fn test_sbx_spread_factor_midpoint() {
        let sbx = SbxCrossover::new(2.0).unwrap();
        assert_relative_eq!(sbx.spread_factor(0.5), 1.0);
    }

    #[test]
    fn test_sbx_identical_parents_unchanged() {
        let mut rng = StdRng::seed_from_u64(1);
        let sbx = SbxCrossover::new(10.0).unwrap().with_gene_probability(1.0);
        let p = Solution::new(vec![0.3, 0.6]);
        let (c1, c2) = sbx.crossover(&p, &p, &MultiBounds::unit(2), &mut rng).unwrap();
        assert_eq!(c1, p);
        assert_eq!(c2, p);
    }

    #[test]
    fn test_sbx_length_mismatch() {
        let mut rng = StdRng::seed_from_u64(1);
        let sbx = SbxCrossover::new(10.0).unwrap();
        let result = sbx.crossover(
            &Solution::new(vec![0.1]),
            &Solution::new(vec![0.1, 0.2]),
            &MultiBounds::unit(2),
            &mut rng,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_eta_rejected() {
        assert!(SbxCrossover::new(-1.0).is_err());
    }
}
