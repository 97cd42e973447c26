//! Interpretation runtime: turns a user message into search parameters.
//!
//! `Interpreter` runs the stages in order: relevance gate, semantic cache,
//! extraction (pre-extracted record, model, or rule-based fallback),
//! canonicalization and refinement merge.

pub mod interpreter;
pub mod types;

pub use interpreter::Interpreter;
pub use types::*;
