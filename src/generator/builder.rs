//! Recursive tree builder
//!
//! `build(depth)` picks a construct from the production table for `depth`
//! and hands it to that construct's generator. Generators either return a
//! leaf or call `build` with `depth - 1`, and recursive constructs are only
//! selectable while `depth > 0`, so every call terminates.

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::config::GeneratorConfig;
use crate::environment::Environment;
use crate::grammar::{BinaryOp, ExprNode, UnaryOp, BUILTIN_NAMES};
use crate::{Error, Result};

use super::productions::{Production, ProductionTables};
use super::weighted::WeightedTable;

/// Where a member-access property comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PropertySource {
    /// A string literal from the property-name corpus
    Literal,
    /// An arbitrary subtree
    General,
}

/// Shape of a call expression's callee
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CalleeKind {
    /// `base.method`
    Method,
    /// `function`
    Function,
}

/// Builds random, well-formed expression trees
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    tables: ProductionTables,
    lengths: WeightedTable<usize>,
    property_sources: WeightedTable<PropertySource>,
    callees: WeightedTable<CalleeKind>,
    identifiers: Vec<String>,
    floats: Vec<f64>,
    integer_bound: i64,
    strings: Vec<String>,
    property_names: Vec<String>,
    method_names: Vec<String>,
    function_names: Vec<String>,
    predicate_names: Vec<String>,
    unary_operators: Vec<UnaryOp>,
    binary_operators: Vec<BinaryOp>,
    optional_probability: f64,
}

impl TreeBuilder {
    /// Create a builder from a configuration and the environment whose
    /// names identifiers are drawn from
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the configuration is invalid or
    /// the environment exposes no names
    pub fn new(config: &GeneratorConfig, env: &Environment) -> Result<Self> {
        config.validate()?;

        let identifiers = env.names();
        if identifiers.is_empty() {
            return Err(Error::Configuration(
                "environment must expose at least one name".to_string(),
            ));
        }

        let property_sources = WeightedTable::new(
            [
                (PropertySource::Literal, config.member_literal_weight),
                (PropertySource::General, config.member_general_weight),
            ]
            .into_iter()
            .filter(|&(_, w)| w > 0),
        )?;
        let callees = WeightedTable::new(
            [
                (CalleeKind::Method, config.method_callee_weight),
                (CalleeKind::Function, config.function_callee_weight),
            ]
            .into_iter()
            .filter(|&(_, w)| w > 0),
        )?;

        Ok(Self {
            tables: ProductionTables::from_config(config)?,
            lengths: WeightedTable::new(config.length_weights.iter().copied())?,
            property_sources,
            callees,
            identifiers,
            floats: config.floats.clone(),
            integer_bound: config.integer_bound,
            strings: config.strings.clone(),
            property_names: config.property_names.clone(),
            method_names: config.method_names.clone(),
            function_names: config.function_names.clone(),
            predicate_names: config.predicate_names.clone(),
            unary_operators: config.unary_operators.clone(),
            binary_operators: config.binary_operators.clone(),
            optional_probability: config.optional_probability,
        })
    }

    /// Production tables in use
    #[must_use]
    pub fn tables(&self) -> &ProductionTables {
        &self.tables
    }

    /// Argument/item list length distribution in use
    #[must_use]
    pub fn lengths(&self) -> &WeightedTable<usize> {
        &self.lengths
    }

    /// Build a tree with the given remaining depth budget
    pub fn build<R: Rng + ?Sized>(&self, depth: usize, rng: &mut R) -> ExprNode {
        let production = *self.tables.for_depth(depth).choose(rng);
        self.produce(production, depth, rng)
    }

    /// Run the generator of one construct.
    ///
    /// Recursive constructs must only be requested with `depth > 0`.
    fn produce<R: Rng + ?Sized>(
        &self,
        production: Production,
        depth: usize,
        rng: &mut R,
    ) -> ExprNode {
        debug_assert!(production.is_terminal() || depth > 0);
        let child = depth.saturating_sub(1);

        match production {
            Production::Nil => ExprNode::Nil,
            Production::Float => ExprNode::Float(pick(&self.floats, rng)),
            Production::Integer => ExprNode::Integer(rng.random_range(0..self.integer_bound)),
            Production::Str => self.string_literal(rng),
            Production::Bool => ExprNode::Bool(rng.random_bool(0.5)),
            Production::Identifier => ExprNode::Identifier(pick(&self.identifiers, rng)),
            Production::Pointer => ExprNode::Pointer,
            Production::Member => self.member(child, rng),
            Production::Unary => ExprNode::Unary {
                op: pick(&self.unary_operators, rng),
                node: Box::new(self.build(child, rng)),
            },
            Production::Binary => ExprNode::Binary {
                op: pick(&self.binary_operators, rng),
                left: Box::new(self.build(child, rng)),
                right: Box::new(self.build(child, rng)),
            },
            Production::Call => self.call(child, rng),
            Production::Builtin => ExprNode::Builtin {
                name: pick(BUILTIN_NAMES, rng).to_string(),
                arguments: self.node_list(child, rng),
            },
            Production::Predicate => ExprNode::Builtin {
                name: pick(&self.predicate_names, rng),
                arguments: vec![self.build(child, rng), self.build(child, rng)],
            },
            Production::Array => ExprNode::Array(self.node_list(child, rng)),
            Production::Map => {
                let len = *self.lengths.choose(rng);
                ExprNode::Map(
                    (0..len)
                        .map(|_| (self.string_literal(rng), self.build(child, rng)))
                        .collect(),
                )
            }
            Production::Slice => ExprNode::Slice {
                node: Box::new(self.build(child, rng)),
                from: Box::new(self.build(child, rng)),
                to: Box::new(self.build(child, rng)),
            },
            Production::Conditional => ExprNode::Conditional {
                cond: Box::new(self.build(child, rng)),
                then: Box::new(self.build(child, rng)),
                otherwise: Box::new(self.build(child, rng)),
            },
        }
    }

    fn string_literal<R: Rng + ?Sized>(&self, rng: &mut R) -> ExprNode {
        ExprNode::Str(pick(&self.strings, rng))
    }

    fn optional<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.random_bool(self.optional_probability)
    }

    fn member<R: Rng + ?Sized>(&self, depth: usize, rng: &mut R) -> ExprNode {
        let node = Box::new(self.build(depth, rng));
        let property = match self.property_sources.choose(rng) {
            PropertySource::Literal => ExprNode::Str(pick(&self.property_names, rng)),
            PropertySource::General => self.build(depth, rng),
        };
        ExprNode::Member {
            node,
            property: Box::new(property),
            optional: self.optional(rng),
        }
    }

    fn call<R: Rng + ?Sized>(&self, depth: usize, rng: &mut R) -> ExprNode {
        let arguments = self.node_list(depth, rng);
        let callee = match self.callees.choose(rng) {
            CalleeKind::Method => ExprNode::Member {
                node: Box::new(self.build(depth, rng)),
                property: Box::new(ExprNode::Str(pick(&self.method_names, rng))),
                optional: self.optional(rng),
            },
            CalleeKind::Function => ExprNode::Identifier(pick(&self.function_names, rng)),
        };
        ExprNode::Call {
            callee: Box::new(callee),
            arguments,
        }
    }

    /// Independent subtrees, count drawn from the length distribution
    fn node_list<R: Rng + ?Sized>(&self, depth: usize, rng: &mut R) -> Vec<ExprNode> {
        let len = *self.lengths.choose(rng);
        (0..len).map(|_| self.build(depth, rng)).collect()
    }
}

/// Uniform pick from a corpus validated to be non-empty
fn pick<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> T {
    items
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| unreachable!("corpora are validated non-empty"))
}


/// Property-based tests for tree building
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Building terminates and respects the depth budget
        #[test]
        fn prop_build_terminates(seed in any::<u64>(), depth in 0usize..10) {
            let builder = TreeBuilder::new(&GeneratorConfig::default(), &Environment::default()).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            let node = builder.build(depth, &mut rng);
            prop_assert!(node.depth() <= 2 * depth + 1);
        }

        /// Every built tree renders to non-empty text
        #[test]
        fn prop_render_non_empty(seed in any::<u64>(), depth in 0usize..8) {
            let builder = TreeBuilder::new(&GeneratorConfig::default(), &Environment::default()).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            let code = builder.build(depth, &mut rng).to_code();
            prop_assert!(!code.is_empty());
            prop_assert_eq!(code.trim(), code.as_str());
        }

        /// Depth zero never yields a recursive construct
        #[test]
        fn prop_depth_zero_leaf(seed in any::<u64>()) {
            let builder = TreeBuilder::new(&GeneratorConfig::default(), &Environment::default()).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            let node = builder.build(0, &mut rng);
            prop_assert!(node.is_leaf());
            prop_assert_ne!(node.kind(), crate::grammar::NodeKind::Pointer);
        }
    }
}
