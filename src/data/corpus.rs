//! Set of accepted expression texts

use std::collections::HashSet;

/// Distinct expression texts accepted so far
///
/// Grows for the lifetime of a run; entries are never removed.
#[derive(Debug, Clone, Default)]
pub struct CorpusSet {
    entries: HashSet<String>,
}

impl CorpusSet {
    /// Create an empty corpus
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `code`, returning `true` if it was not already present
    pub fn insert(&mut self, code: &str) -> bool {
        if self.entries.contains(code) {
            return false;
        }
        self.entries.insert(code.to_string())
    }

    /// Check whether `code` has been accepted
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains(code)
    }

    /// Number of distinct entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been accepted yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl<'a> Extend<&'a str> for CorpusSet {
    fn extend<T: IntoIterator<Item = &'a str>>(&mut self, iter: T) {
        for code in iter {
            self.insert(code);
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_len_counts_distinct(texts in prop::collection::vec("[a-c]{1,3}", 0..50)) {
            let mut corpus = CorpusSet::new();
            let mut fresh = 0;
            for text in &texts {
                if corpus.insert(text) {
                    fresh += 1;
                }
            }
            let distinct: HashSet<&String> = texts.iter().collect();
            prop_assert_eq!(corpus.len(), distinct.len());
            prop_assert_eq!(fresh, distinct.len());
        }
    }
}
