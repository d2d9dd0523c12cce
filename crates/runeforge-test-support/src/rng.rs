//! Scripted `DeterministicRng` implementations for tests.

use runeforge_core::rng::DeterministicRng;

/// Always returns `min` from `next_u32_range` and `0.0` from `next_f64`.
/// On a d10 every die shows 1, which makes every non-empty pool a fumble.
#[derive(Debug)]
pub struct MockRng;

impl DeterministicRng for MockRng {
    fn next_u32_range(&mut self, min: u32, _max: u32) -> u32 {
        min
    }

    fn next_f64(&mut self) -> f64 {
        0.0
    }
}

/// Returns values from a predetermined sequence, ignoring the requested
/// range. Panics once the sequence is exhausted, which flags a test that
/// rolled more dice than it scripted.
#[derive(Debug)]
pub struct SequenceRng {
    values: Vec<u32>,
    index: usize,
}

impl SequenceRng {
    /// Create a new `SequenceRng` with the given values.
    #[must_use]
    pub fn new(values: Vec<u32>) -> Self {
        Self { values, index: 0 }
    }

    /// Number of values handed out so far.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.index
    }
}

impl DeterministicRng for SequenceRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        let Some(&val) = self.values.get(self.index) else {
            panic!(
                "SequenceRng exhausted after {} values (requested {min}..={max})",
                self.index
            );
        };
        self.index += 1;
        val
    }

    fn next_f64(&mut self) -> f64 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_rng_returns_values_in_order() {
        let mut rng = SequenceRng::new(vec![8, 1, 10]);
        assert_eq!(rng.next_u32_range(1, 10), 8);
        assert_eq!(rng.next_u32_range(1, 10), 1);
        assert_eq!(rng.next_u32_range(1, 10), 10);
        assert_eq!(rng.consumed(), 3);
    }

    #[test]
    #[should_panic(expected = "SequenceRng exhausted")]
    fn test_sequence_rng_panics_when_exhausted() {
        let mut rng = SequenceRng::new(vec![5]);
        rng.next_u32_range(1, 10);
        rng.next_u32_range(1, 10);
    }

    #[test]
    fn test_mock_rng_returns_min() {
        let mut rng = MockRng;
        assert_eq!(rng.next_u32_range(1, 10), 1);
    }
}
