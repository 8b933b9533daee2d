//! Elite archive
//!
//! Holds the best distinct individuals ever seen, best first. Entries are
//! carried unmodified into each new generation.

use crate::error::{SearchError, SearchResult};
use crate::population::individual::Individual;
use crate::population::population::Population;

#[derive(Clone, Debug)]
pub struct HallOfFame {
    entries: Vec<Individual>,
    capacity: usize,
}

impl HallOfFame {
    /// Create an empty archive; a zero capacity is rejected
    pub fn new(capacity: usize) -> SearchResult<Self> {
        if capacity == 0 {
            return Err(SearchError::Configuration(
                "hall of fame capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Individual] {
        &self.entries
    }

    pub fn best(&self) -> Option<&Individual> {
        self.entries.first()
    }

    /// Offer a single evaluated individual; returns whether it was admitted
    pub fn try_add(&mut self, candidate: &Individual) -> bool {
        let Some(cost) = candidate.cost else {
            return false;
        };
        if self.entries.len() == self.capacity {
            match self.entries.last() {
                Some(worst) if cost < worst.rank_cost() => {}
                _ => return false,
            }
        }
        if self.entries.iter().any(|e| e.solution == candidate.solution) {
            return false;
        }
        let position = self.entries.partition_point(|e| e.rank_cost() <= cost);
        self.entries.insert(position, candidate.clone());
        self.entries.truncate(self.capacity);
        true
    }

    /// Offer every evaluated member of a population
    pub fn update(&mut self, population: &Population) -> usize {
        population.iter().filter(|i| self.try_add(i)).count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
