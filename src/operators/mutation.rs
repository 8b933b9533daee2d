//! Mutation operators

use rand::Rng;

use crate::error::{SearchError, SearchResult};
use crate::genome::bounds::MultiBounds;
use crate::genome::solution::Solution;
use crate::operators::traits::MutationOperator;

/// Bounded polynomial mutation
///
/// Each gene mutates with probability `1/n` unless a fixed probability is
/// set. Steps shrink near the bounds so mutants never leave the domain.
#[derive(Clone, Debug)]
pub struct PolynomialMutation {
    /// Distribution index; larger values give smaller steps
    pub eta_m: f64,
    /// Per-gene mutation probability (default: 1/n)
    pub gene_probability: Option<f64>,
}

impl PolynomialMutation {
    pub fn new(eta_m: f64) -> SearchResult<Self> {
        if eta_m.is_nan() || eta_m < 0.0 {
            return Err(SearchError::Configuration(format!(
                "distribution index must be non-negative, got {eta_m}"
            )));
        }
        Ok(Self {
            eta_m,
            gene_probability: None,
        })
    }

    pub fn with_gene_probability(mut self, probability: f64) -> Self {
        self.gene_probability = Some(probability.clamp(0.0, 1.0));
        self
    }

    fn mutate_gene<R: Rng + ?Sized>(&self, gene: f64, min: f64, max: f64, rng: &mut R) -> f64 {
        let range = max - min;
        if range <= 0.0 {
            return gene;
        }
        let delta1 = (gene - min) / range;
        let delta2 = (max - gene) / range;
        let power = 1.0 / (self.eta_m + 1.0);

        let u = rng.gen::<f64>();
        let delta_q = if u < 0.5 {
            let val = 2.0 * u + (1.0 - 2.0 * u) * (1.0 - delta1).powf(self.eta_m + 1.0);
            val.powf(power) - 1.0
        } else {
            let val = 2.0 * (1.0 - u) + 2.0 * (u - 0.5) * (1.0 - delta2).powf(self.eta_m + 1.0);
            1.0 - val.powf(power)
        };

        (gene + delta_q * range).clamp(min, max)
    }
}

impl MutationOperator for PolynomialMutation {
    fn mutate<R: Rng + ?Sized>(&self, solution: &mut Solution, bounds: &MultiBounds, rng: &mut R) {
        let n = solution.len();
        if n == 0 {
            return;
        }
        let probability = self.gene_probability.unwrap_or(1.0 / n as f64);
        for i in 0..n {
            if rng.gen::<f64>() < probability {
                if let Some(bound) = bounds.get(i) {
                    let mutated = self.mutate_gene(solution[i], bound.min, bound.max, rng);
                    solution.genes_mut()[i] = mutated;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_polynomial_mutation_stays_in_domain() {
        let mut rng = StdRng::seed_from_u64(9);
        let mutation = PolynomialMutation::new(10.0).unwrap().with_gene_probability(1.0);
        let bounds = MultiBounds::unit(16);
        let mut s = Solution::new(vec![0.0; 16]);
        for _ in 0..200 {
            mutation.mutate(&mut s, &bounds, &mut rng);
            assert!(bounds.contains_vec(s.genes()));
        }
    }

    #[test]
    fn test_zero_probability_is_identity() {
        let mut rng = StdRng::seed_from_u64(9);
        let mutation = PolynomialMutation::new(10.0).unwrap().with_gene_probability(0.0);
        let mut s = Solution::new(vec![0.4; 5]);
        mutation.mutate(&mut s, &MultiBounds::unit(5), &mut rng);
        assert_eq!(s.genes(), &[0.4; 5]);
    }

    #[test]
    fn test_default_probability_changes_some_genes() {
        let mut rng = StdRng::seed_from_u64(10);
        let mutation = PolynomialMutation::new(1.0).unwrap();
        let original = Solution::new(vec![0.5; 100]);
        let mut changed = 0;
        for _ in 0..20 {
            let mut s = original.clone();
            mutation.mutate(&mut s, &MultiBounds::unit(100), &mut rng);
            changed += s
                .genes()
                .iter()
                .zip(original.genes())
                .filter(|(a, b)| a != b)
                .count();
        }
        assert!(changed > 0);
    }
}
