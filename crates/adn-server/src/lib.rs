//! ADN Server
//!
//! HTTP front end for VCF indexing. `POST /api/index` accepts a multipart
//! upload, spools it to disk and runs it through an
//! [`adn_ingest::IndexPipeline`], answering with the column headers and the
//! drain report of the run.

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;

pub use api::{create_router, AppState};
pub use error::{AppError, AppResult};
