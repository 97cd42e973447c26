//! RoomSeek Extract: from free text to an `ExtractionRecord`.
//!
//! - `gate`: cheap relevance classification, no I/O
//! - `fallback`: deterministic keyword extraction, always succeeds
//! - `model`: prompt → inference service → JSON (with repair) → record
//!
//! The gate and the fallback extractor share one rule table (`rules`), so
//! they never disagree on whether a message is a room search.

pub mod fallback;
pub mod gate;
pub mod model;
pub mod prompt;
pub mod record;
pub mod repair;
pub mod rules;

pub use fallback::extract_fallback;
pub use gate::{classify, RelevanceDecision, RelevanceRule};
pub use model::{ExtractionOutcome, ExtractionPath, FallbackReason, StructuredExtractor};
pub use prompt::build_extraction_prompt;
pub use record::record_from_value;
pub use repair::{parse_model_output, RepairStrategy};
