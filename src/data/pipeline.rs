//! Validation and deduplication loop
//!
//! Each attempt draws a depth budget, builds and renders a tree, compiles
//! and evaluates it through the oracle and finally checks the corpus.
//! Rejections and duplicates are silent retries. Anything else, including
//! a panic anywhere in the attempt, stops the loop with an
//! [`Error::Fault`] naming the offending source text.

use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, error, info};

use super::CorpusSet;
use crate::config::GeneratorConfig;
use crate::environment::Environment;
use crate::generator::Generator;
use crate::oracle::Oracle;
use crate::{Error, Result};

/// Source text reported for faults raised before rendering finished
pub const UNRENDERED: &str = "<unrendered>";

/// Result of a single loop iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// New expression added to the corpus
    Accepted(String),
    /// The compiler rejected the expression
    CompileRejected,
    /// The evaluator rejected the expression
    RunRejected,
    /// An oracle call ran out of time
    TimedOut,
    /// The expression was already in the corpus
    Duplicate,
}

/// Counters for a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Iterations performed
    pub attempts: u64,
    /// New expressions emitted
    pub accepted: u64,
    /// Compiler rejections
    pub compile_rejected: u64,
    /// Evaluator rejections
    pub run_rejected: u64,
    /// Oracle timeouts
    pub timed_out: u64,
    /// Valid expressions already in the corpus
    pub duplicates: u64,
    /// Wall-clock time spent in [`CorpusPipeline::run`]
    pub elapsed_ms: u64,
}

impl PipelineStats {
    /// Share of attempts that were accepted, in percent
    #[must_use]
    pub fn acceptance_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        (self.accepted as f64 / self.attempts as f64) * 100.0
    }

    /// Attempts per second
    #[must_use]
    pub fn throughput(&self) -> f64 {
        if self.elapsed_ms == 0 {
            return 0.0;
        }
        self.attempts as f64 / (self.elapsed_ms as f64 / 1000.0)
    }

    fn count(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Accepted(_) => self.accepted += 1,
            Outcome::CompileRejected => self.compile_rejected += 1,
            Outcome::RunRejected => self.run_rejected += 1,
            Outcome::TimedOut => self.timed_out += 1,
            Outcome::Duplicate => self.duplicates += 1,
        }
    }
}

/// Generate, validate, deduplicate and emit expressions
pub struct CorpusPipeline<O, R> {
    generator: Generator,
    oracle: O,
    env: Environment,
    corpus: CorpusSet,
    rng: R,
    stats: PipelineStats,
    report_every: u64,
    show_progress: bool,
}

impl<O: Oracle, R: Rng> CorpusPipeline<O, R> {
    /// Create a pipeline with an empty corpus
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn new(config: &GeneratorConfig, env: Environment, oracle: O, rng: R) -> Result<Self> {
        Ok(Self {
            generator: Generator::new(config, &env)?,
            oracle,
            env,
            corpus: CorpusSet::new(),
            rng,
            stats: PipelineStats::default(),
            report_every: config.report_every,
            show_progress: false,
        })
    }

    /// Start from an existing corpus instead of an empty one
    #[must_use]
    pub fn with_corpus(mut self, corpus: CorpusSet) -> Self {
        self.corpus = corpus;
        self
    }

    /// Enable or disable the stderr spinner during [`run`](Self::run)
    #[must_use]
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Counters so far
    #[must_use]
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Expressions accepted so far
    #[must_use]
    pub fn corpus(&self) -> &CorpusSet {
        &self.corpus
    }

    /// The oracle validating expressions
    #[must_use]
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Perform exactly one iteration of the loop
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fault`] carrying the source text when anything other
    /// than an expected rejection goes wrong, including panics.
    pub fn attempt(&mut self) -> Result<Outcome> {
        self.stats.attempts += 1;

        let generator = &self.generator;
        let oracle = &self.oracle;
        let env = &self.env;
        let rng = &mut self.rng;
        let mut rendered: Option<String> = None;

        let result = panic::catch_unwind(AssertUnwindSafe(|| -> Result<String> {
            let expr = generator.generate(rng);
            rendered = Some(expr.code.clone());
            let artifact = oracle.compile(&expr.code, env)?;
            oracle.run(&artifact, env)?;
            Ok(expr.code)
        }));

        let outcome = match result {
            Ok(Ok(code)) => {
                if self.corpus.insert(&code) {
                    Outcome::Accepted(code)
                } else {
                    debug!(source = %code, "duplicate");
                    Outcome::Duplicate
                }
            }
            Ok(Err(e)) => {
                let source_code = rendered.unwrap_or_else(|| UNRENDERED.to_string());
                match e {
                    Error::Compile(message) => {
                        debug!(source = %source_code, %message, "compile rejected");
                        Outcome::CompileRejected
                    }
                    Error::Run(message) => {
                        debug!(source = %source_code, %message, "run rejected");
                        Outcome::RunRejected
                    }
                    Error::Timeout(ms) => {
                        debug!(source = %source_code, timeout_ms = ms, "oracle timed out");
                        Outcome::TimedOut
                    }
                    fault @ Error::Fault { .. } => return Err(self.fatal(fault)),
                    other => {
                        return Err(self.fatal(Error::Fault {
                            source_code,
                            message: other.to_string(),
                        }))
                    }
                }
            }
            Err(payload) => {
                return Err(self.fatal(Error::Fault {
                    source_code: rendered.unwrap_or_else(|| UNRENDERED.to_string()),
                    message: format!("panic: {}", panic_message(payload.as_ref())),
                }))
            }
        };

        self.stats.count(&outcome);
        Ok(outcome)
    }

    /// Loop [`attempt`](Self::attempt), writing each accepted expression
    /// as one line to `writer`
    ///
    /// Runs until `limit` new expressions have been written, or forever
    /// when `limit` is `None`.
    ///
    /// # Errors
    ///
    /// Returns the first fault, or an I/O error from `writer`
    pub fn run<W: Write>(&mut self, writer: &mut W, limit: Option<usize>) -> Result<PipelineStats> {
        info!(
            oracle = self.oracle.name(),
            limit = ?limit,
            corpus = self.corpus.len(),
            "starting corpus generation"
        );

        let progress = self.show_progress.then(spinner);
        let start = Instant::now();
        let base_elapsed = self.stats.elapsed_ms;
        let mut emitted = 0usize;

        let result = loop {
            if limit.is_some_and(|limit| emitted >= limit) {
                break Ok(());
            }

            let outcome = match self.attempt() {
                Ok(outcome) => outcome,
                Err(e) => break Err(e),
            };

            if let Outcome::Accepted(code) = &outcome {
                if let Err(e) = writeln!(writer, "{code}").and_then(|()| writer.flush()) {
                    break Err(Error::Io(e));
                }
                emitted += 1;
            }

            self.stats.elapsed_ms = base_elapsed + millis(start.elapsed());

            if let Some(pb) = &progress {
                pb.set_message(format!(
                    "{} accepted / {} attempts",
                    self.stats.accepted, self.stats.attempts
                ));
                pb.tick();
            }

            if self.report_every > 0 && self.stats.attempts % self.report_every == 0 {
                self.report();
            }
        };

        self.stats.elapsed_ms = base_elapsed + millis(start.elapsed());
        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        result?;
        self.report();
        Ok(self.stats.clone())
    }

    fn report(&self) {
        let stats = &self.stats;
        info!(
            attempts = stats.attempts,
            accepted = stats.accepted,
            compile_rejected = stats.compile_rejected,
            run_rejected = stats.run_rejected,
            timed_out = stats.timed_out,
            duplicates = stats.duplicates,
            rate = %format!("{:.2}%", stats.acceptance_rate()),
            "progress"
        );
    }

    fn fatal(&self, fault: Error) -> Error {
        error!(attempt = self.stats.attempts, error = %fault, "fatal fault");
        fault
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    // Template is hardcoded and known to be valid
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        pb.set_style(style);
    }
    pb
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{AcceptAllOracle, Artifact};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::Cell;

    fn pipeline<O: Oracle>(oracle: O, seed: u64) -> CorpusPipeline<O, StdRng> {
        CorpusPipeline::new(
            &GeneratorConfig::default(),
            Environment::default(),
            oracle,
            StdRng::seed_from_u64(seed),
        )
        .unwrap()
    }

    /// Rejects every other expression at compile time, the rest at run time
    struct Alternating {
        calls: Cell<u64>,
    }

    impl Oracle for Alternating {
        fn compile(&self, source: &str, _env: &Environment) -> Result<Artifact> {
            let n = self.calls.get();
            self.calls.set(n + 1);
            if n % 2 == 0 {
                Err(Error::Compile("unknown name".to_string()))
            } else {
                Ok(Artifact::from_source(source))
            }
        }

        fn run(&self, _artifact: &Artifact, _env: &Environment) -> Result<serde_json::Value> {
            Err(Error::Run("division by zero".to_string()))
        }

        fn name(&self) -> &str {
            "alternating"
        }
    }

    struct Panicking;

    impl Oracle for Panicking {
        fn compile(&self, _source: &str, _env: &Environment) -> Result<Artifact> {
            panic!("compiler invariant violated");
        }

        fn run(&self, _artifact: &Artifact, _env: &Environment) -> Result<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    struct Slow;

    impl Oracle for Slow {
        fn compile(&self, _source: &str, _env: &Environment) -> Result<Artifact> {
            Err(Error::Timeout(5))
        }

        fn run(&self, _artifact: &Artifact, _env: &Environment) -> Result<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[test]
    fn test_rejections_are_counted_not_fatal() {
        let mut pipe = pipeline(
            Alternating {
                calls: Cell::new(0),
            },
            1,
        );
        for _ in 0..10 {
            let outcome = pipe.attempt().unwrap();
            assert!(matches!(
                outcome,
                Outcome::CompileRejected | Outcome::RunRejected
            ));
        }
        let stats = pipe.stats();
        assert_eq!(stats.attempts, 10);
        assert_eq!(stats.compile_rejected, 5);
        assert_eq!(stats.run_rejected, 5);
        assert_eq!(stats.accepted, 0);
        assert!(pipe.corpus().is_empty());
    }

    #[test]
    fn test_timeout_is_rejection() {
        let mut pipe = pipeline(Slow, 2);
        assert_eq!(pipe.attempt().unwrap(), Outcome::TimedOut);
        assert_eq!(pipe.stats().timed_out, 1);
    }

    #[test]
    fn test_panic_becomes_fault_with_source() {
        let mut pipe = pipeline(Panicking, 3);
        match pipe.attempt() {
            Err(Error::Fault {
                source_code,
                message,
            }) => {
                assert_ne!(source_code, UNRENDERED);
                assert!(!source_code.is_empty());
                assert!(message.contains("compiler invariant violated"));
            }
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn test_accepted_are_distinct() {
        let mut pipe = pipeline(AcceptAllOracle, 4);
        let mut accepted = Vec::new();
        for _ in 0..300 {
            if let Outcome::Accepted(code) = pipe.attempt().unwrap() {
                accepted.push(code);
            }
        }
        let stats = pipe.stats();
        assert_eq!(stats.accepted + stats.duplicates, 300);
        assert_eq!(accepted.len() as u64, stats.accepted);
        assert_eq!(pipe.corpus().len(), accepted.len());
        let mut unique = accepted.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), accepted.len());
    }

    #[test]
    fn test_run_writes_lines_in_acceptance_order() {
        let mut pipe = pipeline(AcceptAllOracle, 5);
        let mut out = Vec::new();
        let stats = pipe.run(&mut out, Some(25)).unwrap();
        assert_eq!(stats.accepted, 25);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 25);
        assert!(text.ends_with('\n'));
        for line in &lines {
            assert!(pipe.corpus().contains(line));
        }
    }

    #[test]
    fn test_run_with_existing_corpus_skips_known() {
        let mut first = pipeline(AcceptAllOracle, 6);
        first.run(&mut std::io::sink(), Some(50)).unwrap();
        let known = first.corpus().clone();

        let mut second = pipeline(AcceptAllOracle, 6).with_corpus(known.clone());
        let mut out = Vec::new();
        second.run(&mut out, Some(10)).unwrap();
        let text = String::from_utf8(out).unwrap();
        for line in text.lines() {
            assert!(!known.contains(line));
        }
        assert!(second.stats().duplicates >= 50);
    }

    #[test]
    fn test_run_zero_limit() {
        let mut pipe = pipeline(AcceptAllOracle, 7);
        let mut out = Vec::new();
        let stats = pipe.run(&mut out, Some(0)).unwrap();
        assert_eq!(stats.attempts, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_run_stops_on_fault() {
        let mut pipe = pipeline(Panicking, 8);
        let mut out = Vec::new();
        let result = pipe.run(&mut out, None);
        assert!(matches!(result, Err(Error::Fault { .. })));
        assert!(out.is_empty());
        assert_eq!(pipe.stats().attempts, 1);
    }

    #[test]
    fn test_seeded_runs_reproduce() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        pipeline(AcceptAllOracle, 9).run(&mut a, Some(20)).unwrap();
        pipeline(AcceptAllOracle, 9).run(&mut b, Some(20)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_acceptance_rate() {
        let stats = PipelineStats {
            attempts: 8,
            accepted: 2,
            ..Default::default()
        };
        assert!((stats.acceptance_rate() - 25.0).abs() < 1e-9);
        assert!((PipelineStats::default().acceptance_rate() - 0.0).abs() < f64::EPSILON);
        assert!((PipelineStats::default().throughput() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_panic_message_payloads() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(other.as_ref()), "unknown panic payload");
    }
}
