//! ADN Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging setup, and error handling for the ADN indexing workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`AdnError`] and the crate-wide [`Result`] alias
//! - **Logging**: `tracing` subscriber configuration shared by every binary
//! - **Environment**: typed `ADN_*` variable lookup for the config loaders
//! - **Types**: the field-keyed [`Record`] flowing from parsers to sinks
//!
//! # Example
//!
//! ```no_run
//! use adn_common::logging::{init_logging, LogConfig};
//! use adn_common::types::record_from_pairs;
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_logging(&LogConfig::from_env()?)?;
//!     let record = record_from_pairs([("#CHROM", "chr1"), ("POS", "10177")]);
//!     tracing::info!(fields = record.len(), "Parsed record");
//!     Ok(())
//! }
//! ```

pub mod env;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{AdnError, Result};
pub use types::Record;
