//! Weighted random choice
//!
//! Selection probability of option `i` is `weight_i / total_weight`.

use rand::Rng;

use crate::{Error, Result};

/// An option paired with its relative weight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Weighted<T> {
    /// The selectable payload
    pub option: T,
    /// Relative weight, always at least 1
    pub weight: u32,
}

/// Validated, non-empty table of weighted options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedTable<T> {
    options: Vec<Weighted<T>>,
    total: u64,
}

impl<T> WeightedTable<T> {
    /// Build a table from `(option, weight)` pairs
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if there are no options or any
    /// weight is zero
    pub fn new(options: impl IntoIterator<Item = (T, u32)>) -> Result<Self> {
        let options: Vec<Weighted<T>> = options
            .into_iter()
            .map(|(option, weight)| Weighted { option, weight })
            .collect();

        if options.is_empty() {
            return Err(Error::Configuration(
                "weighted table needs at least one option".to_string(),
            ));
        }
        if options.iter().any(|w| w.weight == 0) {
            return Err(Error::Configuration(
                "weights must be positive".to_string(),
            ));
        }

        let total = options.iter().map(|w| u64::from(w.weight)).sum();
        Ok(Self { options, total })
    }

    /// Pick one option with probability proportional to its weight
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
        let draw = rng.random_range(0..self.total);
        let mut running = 0u64;
        self.options
            .iter()
            .find(|entry| {
                running += u64::from(entry.weight);
                draw < running
            })
            .map_or_else(
                || unreachable!("draw {draw} is below total weight {}", self.total),
                |entry| &entry.option,
            )
    }

    /// Sum of all weights
    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.total
    }

    /// Number of options
    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Whether the table has no options; never true once constructed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Iterate over the options in table order
    pub fn iter(&self) -> impl Iterator<Item = &Weighted<T>> {
        self.options.iter()
    }

    /// Expected selection probability of the option at `index`
    #[must_use]
    pub fn probability(&self, index: usize) -> Option<f64> {
        self.options
            .get(index)
            .map(|w| f64::from(w.weight) / self.total as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_empty_table_rejected() {
        let result = WeightedTable::<u8>::new(Vec::new());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_zero_weight_rejected() {
        let result = WeightedTable::new(vec![('a', 1), ('b', 0)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_single_option_always_chosen() {
        let table = WeightedTable::new(vec![("only", 7)]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(*table.choose(&mut rng), "only");
        }
    }

    #[test]
    fn test_total_and_probability() {
        let table = WeightedTable::new(vec![(1, 100), (2, 50), (3, 25), (4, 10), (5, 5)]).unwrap();
        assert_eq!(table.total_weight(), 190);
        assert_eq!(table.len(), 5);
        assert!(!table.is_empty());
        let p = table.probability(0).unwrap();
        assert!((p - 100.0 / 190.0).abs() < 1e-12);
        assert!(table.probability(5).is_none());
    }

    #[test]
    fn test_weight_fidelity() {
        let weights = [('a', 1u32), ('b', 10), ('c', 100), ('d', 40)];
        let table = WeightedTable::new(weights).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let n: u32 = 100_000;

        let mut counts = [0usize; 4];
        for _ in 0..n {
            let chosen = *table.choose(&mut rng);
            let idx = weights.iter().position(|(c, _)| *c == chosen).unwrap();
            counts[idx] += 1;
        }

        for (i, count) in counts.iter().enumerate() {
            let expected = table.probability(i).unwrap();
            let observed = *count as f64 / f64::from(n);
            assert!(
                (observed - expected).abs() < 0.02,
                "option {i}: observed {observed:.4}, expected {expected:.4}"
            );
        }
    }

    #[test]
    fn test_every_option_reachable() {
        let table = WeightedTable::new(vec![(0, 1), (1, 1000)]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let seen_rare = (0..100_000).any(|_| *table.choose(&mut rng) == 0);
        assert!(seen_rare, "weight-1 option should eventually be drawn");
    }

    #[test]
    fn test_iter_preserves_order() {
        let table = WeightedTable::new(vec![("x", 3), ("y", 4)]).unwrap();
        let order: Vec<_> = table.iter().map(|w| (w.option, w.weight)).collect();
        assert_eq!(order, vec![("x", 3), ("y", 4)]);
    }
}
