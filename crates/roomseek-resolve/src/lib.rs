//! Resolution of extraction records into query-ready search parameters.
//!
//! `canonicalize` turns a record into `SearchParameters` against the amenity
//! catalog; `merge_refinement` folds a follow-up turn into the previous
//! turn's parameters.

pub mod canonical;
pub mod merge;

pub use canonical::{canonicalize, derive_min_price, resolve_amenities};
pub use merge::{merge_refinement, MergeOutcome};
