//! Operator traits
//!
//! Selection, crossover and mutation over real-valued solutions. Costs are
//! minimized throughout.

use rand::Rng;

use crate::error::SearchResult;
use crate::genome::bounds::MultiBounds;
use crate::genome::solution::Solution;

/// Selection operator trait
///
/// Picks parents from a pool described by its costs.
pub trait SelectionOperator {
    /// Select a single index from the pool
    fn select<R: Rng + ?Sized>(&self, costs: &[f64], rng: &mut R) -> SearchResult<usize>;

    /// Select `count` indices, with replacement
    fn select_many<R: Rng + ?Sized>(
        &self,
        costs: &[f64],
        count: usize,
        rng: &mut R,
    ) -> SearchResult<Vec<usize>> {
        (0..count).map(|_| self.select(costs, rng)).collect()
    }
}

/// Crossover operator trait
///
/// Recombines two parents into two children that stay inside the domain.
pub trait CrossoverOperator {
    fn crossover<R: Rng + ?Sized>(
        &self,
        parent1: &Solution,
        parent2: &Solution,
        bounds: &MultiBounds,
        rng: &mut R,
    ) -> SearchResult<(Solution, Solution)>;
}

/// Mutation operator trait
///
/// Applies random in-domain changes to a solution in place.
pub trait MutationOperator {
    fn mutate<R: Rng + ?Sized>(&self, solution: &mut Solution, bounds: &MultiBounds, rng: &mut R);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct FirstSelection;

    impl SelectionOperator for FirstSelection {
        fn select<R: Rng + ?Sized>(&self, _costs: &[f64], _rng: &mut R) -> SearchResult<usize> {
            Ok(0)
        }
    }

    struct ResetMutation;

    impl MutationOperator for ResetMutation {
        fn mutate<R: Rng + ?Sized>(
            &self,
            solution: &mut Solution,
            bounds: &MultiBounds,
            _rng: &mut R,
        ) {
            for (gene, bound) in solution.genes_mut().iter_mut().zip(&bounds.bounds) {
                *gene = bound.min;
            }
        }
    }

    #[test]
    fn test_default_select_many() {
        let mut rng = StdRng::seed_from_u64(0);
        let picks = FirstSelection.select_many(&[3.0, 1.0], 4, &mut rng).unwrap();
        assert_eq!(picks, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_mutation_trait_object_free_dispatch() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut s = Solution::new(vec![0.7, 0.2]);
        ResetMutation.mutate(&mut s, &MultiBounds::unit(2), &mut rng);
        assert_eq!(s.genes(), &[0.0, 0.0]);
    }
}
