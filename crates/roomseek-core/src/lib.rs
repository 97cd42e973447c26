//! RoomSeek Core: data model, error taxonomy, configuration.
//!
//! Every stage of the interpretation pipeline exchanges the value types
//! defined here. Nothing in this crate performs I/O beyond reading the
//! optional configuration file.

pub mod config;
pub mod error;
pub mod numeric;
pub mod types;

pub use config::{CacheConfig, InferenceConfig, ReferenceConfig, RoomSeekConfig};
pub use error::{Error, Result};
pub use types::*;
