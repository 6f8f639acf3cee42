//! Exprgen - fuzz corpus generator for an expression language
//!
//! Exprgen samples weighted, depth-bounded random expression trees, renders
//! them to source text, keeps the ones an external compiler and evaluator
//! accept, and emits every distinct survivor exactly once.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         EXPRGEN CORE                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Generator   →   Grammar    →   Oracle      →   Corpus       │
//! │  (weighted       (render)       (compile,       (dedup,      │
//! │   trees)                         run)            emit)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use exprgen::prelude::*;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let config = GeneratorConfig::default();
//! let env = Environment::default();
//! let mut pipeline =
//!     CorpusPipeline::new(&config, env, AcceptAllOracle, StdRng::seed_from_u64(42))?;
//!
//! let stats = pipeline.run(&mut std::io::stdout(), Some(100))?;
//! println!("{:.1}% accepted", stats.acceptance_rate());
//! # Ok::<(), exprgen::Error>(())
//! ```
//!
//! # Modules
//!
//! - [`grammar`] - Expression tree types, operators and rendering
//! - [`generator`] - Weighted choice and the recursive tree builder
//! - [`oracle`] - Compiler/evaluator boundary
//! - [`data`] - Corpus set and the validation loop
//! - [`environment`] - Names and values visible to expressions
//! - [`config`] - Weights, literal corpora and limits

// Note: Lint configuration is in Cargo.toml [lints]
#![forbid(unsafe_code)]

pub mod config;
pub mod data;
pub mod environment;
pub mod error;
pub mod generator;
pub mod grammar;
pub mod oracle;

pub use error::{Error, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::GeneratorConfig;
    pub use crate::data::{CorpusPipeline, CorpusSet, Outcome, PipelineStats};
    pub use crate::environment::{Environment, Value};
    pub use crate::generator::{GeneratedExpr, Generator, TreeBuilder, WeightedTable};
    pub use crate::grammar::{BinaryOp, ExprNode, NodeKind, UnaryOp};
    pub use crate::oracle::{AcceptAllOracle, Artifact, Oracle, ProcessOracle};
    pub use crate::{Error, Result};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_prelude_end_to_end() {
        let mut pipeline = CorpusPipeline::new(
            &GeneratorConfig::default(),
            Environment::default(),
            AcceptAllOracle,
            StdRng::seed_from_u64(42),
        )
        .unwrap();
        let mut out = Vec::new();
        let stats = pipeline.run(&mut out, Some(5)).unwrap();
        assert_eq!(stats.accepted, 5);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 5);
    }

    #[test]
    fn test_error_reexport() {
        let err = Error::Compile("bad".to_string());
        assert!(err.is_rejection());
    }
}
