//! Corpus accumulation
//!
//! [`CorpusSet`] holds every distinct expression accepted so far and
//! [`CorpusPipeline`] drives the generate, validate, dedup and emit loop
//! around it.

mod corpus;
pub mod pipeline;

pub use corpus::CorpusSet;
pub use pipeline::{CorpusPipeline, Outcome, PipelineStats, UNRENDERED};
