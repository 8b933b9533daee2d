//! Solution-domain bounds
//!
//! Every gene of a polygon encoding lives in a closed interval. The default
//! domain is `[0, 1]` for all genes: vertex coordinates are fractions of the
//! canvas and colour channels are fractions of full intensity.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{SearchError, SearchResult};

/// Lower bound of the default gene domain
pub const DOMAIN_LOW: f64 = 0.0;
/// Upper bound of the default gene domain
pub const DOMAIN_HIGH: f64 = 1.0;

/// Closed interval for a single gene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lower bound (inclusive)
    pub min: f64,
    /// Upper bound (inclusive)
    pub max: f64,
}

impl Bounds {
    /// Create new bounds, rejecting inverted or non-finite intervals
    pub fn new(min: f64, max: f64) -> SearchResult<Self> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(SearchError::Configuration(format!(
                "invalid bounds [{min}, {max}]"
            )));
        }
        Ok(Self { min, max })
    }

    /// The default `[0, 1]` gene domain
    pub const fn unit() -> Self {
        Self {
            min: DOMAIN_LOW,
            max: DOMAIN_HIGH,
        }
    }

    /// Width of the interval
    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Saturate a value into the interval
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Draw a uniformly distributed value from the interval
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.min == self.max {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::unit()
    }
}

/// Per-gene bounds for a whole solution vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiBounds {
    /// Bounds for each gene
    pub bounds: Vec<Bounds>,
}

impl MultiBounds {
    pub fn new(bounds: Vec<Bounds>) -> Self {
        Self { bounds }
    }

    /// Same interval for every gene
    pub fn uniform(bound: Bounds, dimension: usize) -> Self {
        Self {
            bounds: vec![bound; dimension],
        }
    }

    /// `[0, 1]` for every gene
    pub fn unit(dimension: usize) -> Self {
        Self::uniform(Bounds::unit(), dimension)
    }

    /// Number of genes covered
    pub fn dimension(&self) -> usize {
        self.bounds.len()
    }

    pub fn get(&self, index: usize) -> Option<&Bounds> {
        self.bounds.get(index)
    }

    /// Check that every value lies inside its gene's interval
    pub fn contains_vec(&self, values: &[f64]) -> bool {
        values.len() == self.bounds.len()
            && values
                .iter()
                .zip(&self.bounds)
                .all(|(&v, b)| b.contains(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_bounds_rejects_inverted_interval() {
        assert!(Bounds::new(1.0, 0.0).is_err());
        assert!(Bounds::new(f64::NAN, 1.0).is_err());
        assert!(Bounds::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn test_bounds_clamp_and_contains() {
        let b = Bounds::unit();
        assert_eq!(b.clamp(-0.2), 0.0);
        assert_eq!(b.clamp(1.7), 1.0);
        assert_eq!(b.clamp(0.3), 0.3);
        assert!(b.contains(1.0));
        assert!(!b.contains(1.0001));
    }

    #[test]
    fn test_bounds_sample_stays_inside() {
        let mut rng = StdRng::seed_from_u64(7);
        let b = Bounds::new(-2.0, 3.0).unwrap();
        for _ in 0..1000 {
            assert!(b.contains(b.sample(&mut rng)));
        }
    }

    #[test]
    fn test_degenerate_interval_samples_its_point() {
        let mut rng = StdRng::seed_from_u64(7);
        let b = Bounds::new(0.25, 0.25).unwrap();
        assert_eq!(b.sample(&mut rng), 0.25);
    }

    #[test]
    fn test_multi_bounds_contains_vec_checks_length() {
        let mb = MultiBounds::unit(3);
        assert!(!mb.contains_vec(&[0.5, 0.5]));
    }
}
