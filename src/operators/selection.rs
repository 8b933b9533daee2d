//! Selection operators

use rand::Rng;

use crate::error::{SearchError, SearchResult};
use crate::operators::traits::SelectionOperator;

/// Tournament selection
///
/// Draws `tournament_size` contestants uniformly with replacement and
/// returns the one with the lowest cost. The first drawn wins ties.
#[derive(Clone, Debug)]
pub struct TournamentSelection {
    /// Number of individuals competing in each tournament
    pub tournament_size: usize,
}

impl TournamentSelection {
    pub fn new(tournament_size: usize) -> SearchResult<Self> {
        if tournament_size == 0 {
            return Err(SearchError::Configuration(
                "tournament size must be at least 1".to_string(),
            ));
        }
        Ok(Self { tournament_size })
    }

    /// Binary tournament
    pub fn binary() -> Self {
        Self { tournament_size: 2 }
    }
}

impl Default for TournamentSelection {
    fn default() -> Self {
        Self::binary()
    }
}

impl SelectionOperator for TournamentSelection {
    fn select<R: Rng + ?Sized>(&self, costs: &[f64], rng: &mut R) -> SearchResult<usize> {
        if costs.is_empty() {
            return Err(SearchError::EmptyPopulation);
        }
        let mut winner = rng.gen_range(0..costs.len());
        for _ in 1..self.tournament_size {
            let contestant = rng.gen_range(0..costs.len());
            if costs[contestant] < costs[winner] {
                winner = contestant;
            }
        }
        Ok(winner)
    }
}
