//! Generator configuration
//!
//! All weights, literal corpora and operator lists that shape the corpus.
//! Defaults reproduce the tuned distribution; a JSON file can override any
//! subset of fields.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::grammar::{is_builtin, BinaryOp, UnaryOp, PREDICATE_NAMES};
use crate::{Error, Result};

/// Weights of the constructs available once the depth budget is spent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct LeafWeights {
    pub nil: u32,
    pub float: u32,
    pub integer: u32,
    pub string: u32,
    pub boolean: u32,
    pub identifier: u32,
}

impl Default for LeafWeights {
    fn default() -> Self {
        Self {
            nil: 1,
            float: 1,
            integer: 1,
            string: 1,
            boolean: 1,
            identifier: 10,
        }
    }
}

/// Weights of the constructs available while depth budget remains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct RecursiveWeights {
    pub array: u32,
    pub map: u32,
    pub identifier: u32,
    pub member: u32,
    pub unary: u32,
    pub binary: u32,
    pub call: u32,
    pub builtin: u32,
    pub predicate: u32,
    pub pointer: u32,
    pub slice: u32,
    pub conditional: u32,
}

impl Default for RecursiveWeights {
    fn default() -> Self {
        Self {
            array: 1,
            map: 1,
            identifier: 1000,
            member: 1500,
            unary: 100,
            binary: 2000,
            call: 2000,
            builtin: 500,
            predicate: 1000,
            pointer: 500,
            slice: 100,
            conditional: 100,
        }
    }
}

/// Complete generator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Leaf production weights
    pub leaf_weights: LeafWeights,
    /// Recursive production weights
    pub recursive_weights: RecursiveWeights,
    /// Starting depth distribution, `[depth, weight]`
    pub depth_weights: Vec<(usize, u32)>,
    /// Argument/item list length distribution, `[length, weight]`
    pub length_weights: Vec<(usize, u32)>,
    /// Weight of a literal property name in member access
    pub member_literal_weight: u32,
    /// Weight of an arbitrary subtree as member property
    pub member_general_weight: u32,
    /// Weight of `obj.method(...)` callees
    pub method_callee_weight: u32,
    /// Weight of `function(...)` callees
    pub function_callee_weight: u32,
    /// Probability that a member access uses `?.`
    pub optional_probability: f64,
    /// Float literal corpus
    pub floats: Vec<f64>,
    /// Integer literals are drawn from `0..integer_bound`
    pub integer_bound: i64,
    /// String literal corpus
    pub strings: Vec<String>,
    /// Literal property names for member access
    pub property_names: Vec<String>,
    /// Method names reachable through member access
    pub method_names: Vec<String>,
    /// Plain callable names
    pub function_names: Vec<String>,
    /// Built-ins used by predicate calls
    pub predicate_names: Vec<String>,
    /// Unary operator set
    pub unary_operators: Vec<UnaryOp>,
    /// Binary operator set
    pub binary_operators: Vec<BinaryOp>,
    /// Time budget per oracle call in milliseconds
    pub timeout_ms: u64,
    /// Log a progress summary every this many attempts (0 disables)
    pub report_every: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            leaf_weights: LeafWeights::default(),
            recursive_weights: RecursiveWeights::default(),
            depth_weights: vec![
                (3, 100),
                (4, 40),
                (5, 50),
                (6, 30),
                (7, 20),
                (8, 10),
                (9, 5),
                (10, 5),
            ],
            length_weights: vec![(1, 100), (2, 50), (3, 25), (4, 10), (5, 5)],
            member_literal_weight: 5,
            member_general_weight: 1,
            method_callee_weight: 2,
            function_callee_weight: 2,
            optional_probability: 0.5,
            floats: vec![0.0, 0.5],
            integer_bound: 3,
            strings: to_strings(&["a", "b", "c"]),
            property_names: to_strings(&["a", "b", "obj"]),
            method_names: to_strings(&["fn", "head"]),
            function_names: to_strings(&["add", "div"]),
            predicate_names: to_strings(PREDICATE_NAMES),
            unary_operators: UnaryOp::all().to_vec(),
            binary_operators: BinaryOp::all().to_vec(),
            timeout_ms: 5000,
            report_every: 10_000,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

fn require_non_empty<T>(field: &str, items: &[T]) -> Result<()> {
    if items.is_empty() {
        return Err(Error::Configuration(format!("`{field}` must not be empty")));
    }
    Ok(())
}

impl GeneratorConfig {
    /// Load a configuration from a JSON file
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON,
    /// or fails [`GeneratorConfig::validate`]
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Configuration(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values that weighted tables cannot reject themselves
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the offending field
    pub fn validate(&self) -> Result<()> {
        require_non_empty("floats", &self.floats)?;
        require_non_empty("strings", &self.strings)?;
        require_non_empty("property_names", &self.property_names)?;
        require_non_empty("method_names", &self.method_names)?;
        require_non_empty("function_names", &self.function_names)?;
        require_non_empty("predicate_names", &self.predicate_names)?;
        require_non_empty("unary_operators", &self.unary_operators)?;
        require_non_empty("binary_operators", &self.binary_operators)?;

        if let Some(name) = self.predicate_names.iter().find(|name| !is_builtin(name)) {
            return Err(Error::Configuration(format!(
                "`predicate_names` contains unknown built-in `{name}`"
            )));
        }

        if self.integer_bound <= 0 {
            return Err(Error::Configuration(
                "`integer_bound` must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.optional_probability) {
            return Err(Error::Configuration(format!(
                "`optional_probability` must be within [0, 1], got {}",
                self.optional_probability
            )));
        }
        if self.length_weights.iter().any(|&(len, _)| len == 0) {
            return Err(Error::Configuration(
                "`length_weights` lengths must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Pretty JSON rendering of this configuration
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
