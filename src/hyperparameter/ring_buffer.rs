//! Fixed-capacity observation ring
//!
//! Keeps the most recent samples and a running sum that is updated
//! incrementally on every push.

use serde::{Deserialize, Serialize};

use crate::error::{SearchError, SearchResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CircularBuffer {
    slots: Vec<f64>,
    pointer: usize,
    sum: f64,
    filled: bool,
}

impl CircularBuffer {
    /// Create an empty ring; capacity must be non-zero
    pub fn new(capacity: usize) -> SearchResult<Self> {
        if capacity == 0 {
            return Err(SearchError::Configuration(
                "buffer capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            slots: vec![0.0; capacity],
            pointer: 0,
            sum: 0.0,
            filled: false,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        if self.filled {
            self.slots.len()
        } else {
            self.pointer
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the ring has wrapped at least once
    pub fn is_full(&self) -> bool {
        self.filled
    }

    /// Overwrite the oldest slot; returns the evicted sample once full
    pub fn push(&mut self, value: f64) -> Option<f64> {
        let old = self.slots[self.pointer];
        let evicted = self.filled.then_some(old);
        self.slots[self.pointer] = value;
        self.sum = self.sum - old + value;
        self.pointer = (self.pointer + 1) % self.slots.len();
        if self.pointer == 0 {
            self.filled = true;
        }
        evicted
    }

    /// Running sum; `None` while empty
    pub fn sum(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.sum)
    }

    pub fn mean(&self) -> Option<f64> {
        self.sum().map(|s| s / self.len() as f64)
    }

    /// Samples in slot order (not chronological once wrapped)
    pub fn slots(&self) -> &[f64] {
        &self.slots
    }

    /// Samples oldest first
    pub fn values(&self) -> Vec<f64> {
        if self.filled {
            let (newer, older) = self.slots.split_at(self.pointer);
            older.iter().chain(newer).copied().collect()
        } else {
            self.slots[..self.pointer].to_vec()
        }
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = 0.0);
        self.pointer = 0;
        self.sum = 0.0;
        self.filled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(CircularBuffer::new(0).is_err());
    }

    #[test]
    fn test_fills_then_wraps() {
        let mut buffer = CircularBuffer::new(3).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.sum(), None);

        assert_eq!(buffer.push(1.0), None);
        assert_eq!(buffer.push(2.0), None);
        assert!(!buffer.is_full());
        assert_eq!(buffer.push(3.0), None);
        assert!(buffer.is_full());
        assert_eq!(buffer.sum(), Some(6.0));

        assert_eq!(buffer.push(4.0), Some(1.0));
        assert_eq!(buffer.values(), vec![2.0, 3.0, 4.0]);
        assert_eq!(buffer.sum(), Some(9.0));
        assert_eq!(buffer.mean(), Some(3.0));
    }

    #[test]
    fn test_partial_values_and_mean() {
        let mut buffer = CircularBuffer::new(4).unwrap();
        buffer.push(2.0);
        buffer.push(4.0);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.values(), vec![2.0, 4.0]);
        assert_eq!(buffer.mean(), Some(3.0));
    }

    #[test]
    fn test_clear_resets_state() {
        let mut buffer = CircularBuffer::new(2).unwrap();
        buffer.push(5.0);
        buffer.push(6.0);
        buffer.push(7.0);
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
        assert_eq!(buffer.sum(), None);
        assert_eq!(buffer.slots(), &[0.0, 0.0]);
    }
}
