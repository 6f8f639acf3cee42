//! Weighted random expression generation
//!
//! The engine is layered bottom-up:
//!
//! - [`WeightedTable`] - proportional random choice over a fixed option set
//! - [`ProductionTables`] - construct weights for the leaf and recursive cases
//! - [`TreeBuilder`] - depth-bounded recursive sampler producing [`ExprNode`] trees
//! - [`Generator`] - picks a starting depth and renders the tree
//!
//! All randomness comes from the caller-supplied rng, so a seeded rng
//! reproduces the same sequence of expressions.

mod builder;
mod productions;
mod stats;
mod weighted;

pub use builder::TreeBuilder;
pub use productions::{Production, ProductionTables};
pub use stats::GenerationStats;
pub use weighted::{Weighted, WeightedTable};

use rand::Rng;

use crate::config::GeneratorConfig;
use crate::environment::Environment;
use crate::grammar::ExprNode;
use crate::Result;

/// A generated expression and its rendered source
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedExpr {
    /// Rendered source text
    pub code: String,
    /// The tree it was rendered from
    pub ast: ExprNode,
    /// Depth budget the tree was built with
    pub budget: usize,
}

/// Expression generator: starting-depth choice plus tree building
#[derive(Debug, Clone)]
pub struct Generator {
    builder: TreeBuilder,
    depths: WeightedTable<usize>,
}

impl Generator {
    /// Create a generator
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn new(config: &GeneratorConfig, env: &Environment) -> Result<Self> {
        Ok(Self {
            builder: TreeBuilder::new(config, env)?,
            depths: WeightedTable::new(config.depth_weights.iter().copied())?,
        })
    }

    /// The underlying tree builder
    #[must_use]
    pub fn builder(&self) -> &TreeBuilder {
        &self.builder
    }

    /// Starting depth distribution
    #[must_use]
    pub fn depths(&self) -> &WeightedTable<usize> {
        &self.depths
    }

    /// Draw a starting depth budget
    pub fn choose_depth<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        *self.depths.choose(rng)
    }

    /// Generate one expression with a weighted starting depth
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> GeneratedExpr {
        let budget = self.choose_depth(rng);
        self.generate_at(budget, rng)
    }

    /// Generate one expression with an explicit depth budget
    pub fn generate_at<R: Rng + ?Sized>(&self, budget: usize, rng: &mut R) -> GeneratedExpr {
        let ast = self.builder.build(budget, rng);
        GeneratedExpr {
            code: ast.to_code(),
            ast,
            budget,
        }
    }

    /// Generate `count` expressions without validation
    pub fn sample<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<GeneratedExpr> {
        (0..count).map(|_| self.generate(rng)).collect()
    }

    /// Collect shape statistics over `count` generated expressions
    pub fn stats<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> GenerationStats {
        let mut stats = GenerationStats::new();
        for _ in 0..count {
            let expr = self.generate(rng);
            stats.record(&expr.ast, &expr.code);
        }
        stats
    }
}
