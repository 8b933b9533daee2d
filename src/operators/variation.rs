//! Variation step of a generational search
//!
//! Offspring are paired up for crossover, then each is mutated
//! independently. Any individual whose solution changes loses its cost.

use rand::Rng;

use crate::error::SearchResult;
use crate::genome::bounds::MultiBounds;
use crate::operators::traits::{CrossoverOperator, MutationOperator};
use crate::population::individual::Individual;

/// Apply crossover with probability `cxpb` to consecutive pairs, then
/// mutation with probability `mutpb` to every offspring.
pub fn vary_and<C, M, R>(
    offspring: &mut [Individual],
    crossover: &C,
    mutation: &M,
    cxpb: f64,
    mutpb: f64,
    bounds: &MultiBounds,
    rng: &mut R,
) -> SearchResult<()>
where
    C: CrossoverOperator,
    M: MutationOperator,
    R: Rng + ?Sized,
{
    for pair in offspring.chunks_exact_mut(2) {
        if rng.gen::<f64>() < cxpb {
            let (child1, child2) =
                crossover.crossover(&pair[0].solution, &pair[1].solution, bounds, rng)?;
            pair[0].solution = child1;
            pair[1].solution = child2;
            pair[0].invalidate();
            pair[1].invalidate();
        }
    }
    for individual in offspring.iter_mut() {
        if rng.gen::<f64>() < mutpb {
            mutation.mutate(&mut individual.solution, bounds, rng);
            individual.invalidate();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::solution::Solution;
    use crate::operators::crossover::SbxCrossover;
    use crate::operators::mutation::PolynomialMutation;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn evaluated(n: usize) -> Vec<Individual> {
        (0..n)
            .map(|i| Individual::with_cost(Solution::new(vec![i as f64 / n as f64; 4]), 1.0))
            .collect()
    }

    #[test]
    fn test_zero_probabilities_keep_costs() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut offspring = evaluated(6);
        let before = offspring.clone();
        vary_and(
            &mut offspring,
            &SbxCrossover::new(10.0).unwrap(),
            &PolynomialMutation::new(10.0).unwrap(),
            0.0,
            0.0,
            &MultiBounds::unit(4),
            &mut rng,
        )
        .unwrap();
        assert_eq!(offspring, before);
    }

    #[test]
    fn test_certain_variation_invalidates_everyone() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut offspring = evaluated(6);
        vary_and(
            &mut offspring,
            &SbxCrossover::new(10.0).unwrap(),
            &PolynomialMutation::new(10.0).unwrap(),
            1.0,
            1.0,
            &MultiBounds::unit(4),
            &mut rng,
        )
        .unwrap();
        assert!(offspring.iter().all(|i| !i.is_evaluated()));
    }
}
