//! Compiler/evaluator oracle
//!
//! The oracle decides whether a generated expression belongs in the
//! corpus: it must compile against the environment and evaluate without
//! error. The expression language itself lives outside this crate.
//!
//! # Outcomes
//!
//! - `Ok(..)` - the stage succeeded
//! - `Err(e)` with [`Error::is_rejection`] - expected rejection, the
//!   attempt is discarded
//! - any other `Err` - a fault, fatal to the corpus loop
//!
//! [`Error::is_rejection`]: crate::Error::is_rejection

mod process;

pub use process::ProcessOracle;

use crate::environment::Environment;
use crate::Result;

/// Output of a successful compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// The compiled source text
    pub source: String,
    /// Opaque compiler output handed back to [`Oracle::run`]
    pub payload: String,
}

impl Artifact {
    /// Artifact with no compiler payload
    #[must_use]
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            payload: String::new(),
        }
    }
}

/// Compiler and evaluator for the expression language
pub trait Oracle {
    /// Compile `source` against the names and types of `env`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Compile`] when the expression is rejected
    fn compile(&self, source: &str, env: &Environment) -> Result<Artifact>;

    /// Evaluate a compiled artifact with the values of `env`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Run`] when evaluation fails
    fn run(&self, artifact: &Artifact, env: &Environment) -> Result<serde_json::Value>;

    /// Short name for logs
    fn name(&self) -> &str;
}

impl<O: Oracle + ?Sized> Oracle for &O {
    fn compile(&self, source: &str, env: &Environment) -> Result<Artifact> {
        (**self).compile(source, env)
    }

    fn run(&self, artifact: &Artifact, env: &Environment) -> Result<serde_json::Value> {
        (**self).run(artifact, env)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<O: Oracle + ?Sized> Oracle for Box<O> {
    fn compile(&self, source: &str, env: &Environment) -> Result<Artifact> {
        (**self).compile(source, env)
    }

    fn run(&self, artifact: &Artifact, env: &Environment) -> Result<serde_json::Value> {
        (**self).run(artifact, env)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Oracle that accepts every expression
///
/// Useful for emitting raw, deduplicated generator output.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllOracle;

impl Oracle for AcceptAllOracle {
    fn compile(&self, source: &str, _env: &Environment) -> Result<Artifact> {
        Ok(Artifact::from_source(source))
    }

    fn run(&self, _artifact: &Artifact, _env: &Environment) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    fn name(&self) -> &str {
        "accept-all"
    }
}
