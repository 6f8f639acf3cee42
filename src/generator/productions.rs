//! Grammar production tables
//!
//! Two tables drive tree building. The leaf table is used once the depth
//! budget is exhausted and only holds constructs that never recurse. The
//! recursive table holds every construct the generator can emit.

use crate::config::{GeneratorConfig, LeafWeights, RecursiveWeights};
use crate::Result;

use super::weighted::WeightedTable;

/// A grammar construct the tree builder can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum Production {
    Nil,
    Float,
    Integer,
    Str,
    Bool,
    Identifier,
    Array,
    Map,
    Member,
    Unary,
    Binary,
    Call,
    Builtin,
    Predicate,
    Pointer,
    Slice,
    Conditional,
}

impl Production {
    /// Whether the construct is generated without building child subtrees
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Nil
                | Self::Float
                | Self::Integer
                | Self::Str
                | Self::Bool
                | Self::Identifier
                | Self::Pointer
        )
    }
}

/// The leaf and recursive production tables
#[derive(Debug, Clone)]
pub struct ProductionTables {
    leaf: WeightedTable<Production>,
    recursive: WeightedTable<Production>,
}

/// Drop entries a configuration disabled with a zero weight
fn enabled(entries: Vec<(Production, u32)>) -> impl Iterator<Item = (Production, u32)> {
    entries.into_iter().filter(|&(_, weight)| weight > 0)
}

fn leaf_entries(w: &LeafWeights) -> Vec<(Production, u32)> {
    vec![
        (Production::Nil, w.nil),
        (Production::Float, w.float),
        (Production::Integer, w.integer),
        (Production::Str, w.string),
        (Production::Bool, w.boolean),
        (Production::Identifier, w.identifier),
    ]
}

fn recursive_entries(w: &RecursiveWeights) -> Vec<(Production, u32)> {
    vec![
        (Production::Array, w.array),
        (Production::Map, w.map),
        (Production::Identifier, w.identifier),
        (Production::Member, w.member),
        (Production::Unary, w.unary),
        (Production::Binary, w.binary),
        (Production::Call, w.call),
        (Production::Builtin, w.builtin),
        (Production::Predicate, w.predicate),
        (Production::Pointer, w.pointer),
        (Production::Slice, w.slice),
        (Production::Conditional, w.conditional),
    ]
}

impl Default for ProductionTables {
    fn default() -> Self {
        Self::from_config(&GeneratorConfig::default())
            .unwrap_or_else(|e| unreachable!("default production weights are valid: {e}"))
    }
}

impl ProductionTables {
    /// Build both tables from configured weights
    ///
    /// # Errors
    ///
    /// Returns an error if every weight of a table is zero
    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        Ok(Self {
            leaf: WeightedTable::new(enabled(leaf_entries(&config.leaf_weights)))?,
            recursive: WeightedTable::new(enabled(recursive_entries(
                &config.recursive_weights,
            )))?,
        })
    }

    /// Table for a given remaining depth budget
    #[must_use]
    pub fn for_depth(&self, depth: usize) -> &WeightedTable<Production> {
        if depth == 0 {
            &self.leaf
        } else {
            &self.recursive
        }
    }

    /// Depth-exhausted table
    #[must_use]
    pub fn leaf(&self) -> &WeightedTable<Production> {
        &self.leaf
    }

    /// General table
    #[must_use]
    pub fn recursive(&self) -> &WeightedTable<Production> {
        &self.recursive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_table_is_terminal() {
        let tables = ProductionTables::default();
        assert_eq!(tables.leaf().len(), 6);
        assert!(tables.leaf().iter().all(|w| w.option.is_terminal()));
        assert_eq!(tables.leaf().total_weight(), 15);
    }

    #[test]
    fn test_recursive_table_defaults() {
        let tables = ProductionTables::default();
        assert_eq!(tables.recursive().len(), 12);
        assert_eq!(tables.recursive().total_weight(), 8802);

        let binary = tables
            .recursive()
            .iter()
            .find(|w| w.option == Production::Binary)
            .map(|w| w.weight);
        assert_eq!(binary, Some(2000));
    }

    #[test]
    fn test_for_depth() {
        let tables = ProductionTables::default();
        assert_eq!(tables.for_depth(0), tables.leaf());
        assert_eq!(tables.for_depth(1), tables.recursive());
        assert_eq!(tables.for_depth(10), tables.recursive());
    }

    #[test]
    fn test_zero_weight_disables_construct() {
        let mut config = GeneratorConfig::default();
        config.recursive_weights.slice = 0;
        config.recursive_weights.conditional = 0;
        let tables = ProductionTables::from_config(&config).unwrap();
        assert_eq!(tables.recursive().len(), 10);
        assert!(tables
            .recursive()
            .iter()
            .all(|w| w.option != Production::Slice));
    }

    #[test]
    fn test_all_zero_leaf_weights_rejected() {
        let mut config = GeneratorConfig::default();
        config.leaf_weights = LeafWeights {
            nil: 0,
            float: 0,
            integer: 0,
            string: 0,
            boolean: 0,
            identifier: 0,
        };
        assert!(ProductionTables::from_config(&config).is_err());
    }

    #[test]
    fn test_terminal_productions() {
        assert!(Production::Pointer.is_terminal());
        assert!(Production::Identifier.is_terminal());
        assert!(!Production::Member.is_terminal());
        assert!(!Production::Predicate.is_terminal());
    }
}
