//! Ingest configuration
//!
//! Loaded from the environment (and `.env` via dotenvy); CLI flags override
//! individual values afterwards.

use adn_common::env;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::batch::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_NUM_WORKERS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_SECS,
};
use crate::batch::{AssignmentMode, ProcessorConfig};
use crate::error::{IngestError, Result};

// ============================================================================
// Ingest Configuration Constants
// ============================================================================

/// Default search index receiving the records.
pub const DEFAULT_INDEX_NAME: &str = "vcf_index";

/// Default ZincSearch base URL.
pub const DEFAULT_ZINC_BASE_URL: &str = "http://localhost:4080";

/// Default ZincSearch user.
pub const DEFAULT_ZINC_USER: &str = "admin";

/// Default ZincSearch password for local development.
pub const DEFAULT_ZINC_PASSWORD: &str = "admin";

/// Default per-request timeout against ZincSearch in seconds.
pub const DEFAULT_ZINC_REQUEST_TIMEOUT_SECS: u64 = 300;

/// ZincSearch connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZincConfig {
    pub base_url: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub request_timeout_secs: u64,
}

impl ZincConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            base_url: env::string_or("ZINC_BASE_URL", DEFAULT_ZINC_BASE_URL),
            user: env::string_or("ZINC_USER", DEFAULT_ZINC_USER),
            password: env::string_or("ZINC_PASSWORD", DEFAULT_ZINC_PASSWORD),
            request_timeout_secs: env::parse_or(
                "ZINC_REQUEST_TIMEOUT_SECS",
                DEFAULT_ZINC_REQUEST_TIMEOUT_SECS,
            )?,
        })
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ZincConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ZINC_BASE_URL.to_string(),
            user: DEFAULT_ZINC_USER.to_string(),
            password: DEFAULT_ZINC_PASSWORD.to_string(),
            request_timeout_secs: DEFAULT_ZINC_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Settings for one indexing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub batch_size: usize,
    pub num_workers: usize,
    pub timeout_secs: u64,
    pub index_name: String,
    pub poll_interval_ms: u64,
    pub assignment: AssignmentMode,
    pub zinc: ZincConfig,
}

impl IngestConfig {
    /// Load configuration from environment and defaults
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let assignment = match std::env::var("ADN_ASSIGNMENT") {
            Ok(value) => AssignmentMode::from_str(&value).map_err(IngestError::Config)?,
            Err(_) => AssignmentMode::default(),
        };

        let config = Self {
            batch_size: env::parse_or("ADN_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            num_workers: env::parse_or("ADN_NUM_WORKERS", DEFAULT_NUM_WORKERS)?,
            timeout_secs: env::parse_or("ADN_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            index_name: env::string_or("ADN_INDEX_NAME", DEFAULT_INDEX_NAME),
            poll_interval_ms: env::parse_or("ADN_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?,
            assignment,
            zinc: ZincConfig::from_env()?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.processor_config().validate()?;

        if self.zinc.base_url.trim().is_empty() {
            return Err(IngestError::Config(
                "ZincSearch base URL cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Batching engine settings derived from this config
    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig::new(self.index_name.clone())
            .with_batch_size(self.batch_size)
            .with_num_workers(self.num_workers)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_assignment(self.assignment)
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            num_workers: DEFAULT_NUM_WORKERS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            index_name: DEFAULT_INDEX_NAME.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            assignment: AssignmentMode::default(),
            zinc: ZincConfig::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 7] = [
        "ADN_BATCH_SIZE",
        "ADN_NUM_WORKERS",
        "ADN_TIMEOUT_SECS",
        "ADN_INDEX_NAME",
        "ADN_POLL_INTERVAL_MS",
        "ADN_ASSIGNMENT",
        "ZINC_BASE_URL",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = IngestConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.processor_config().collection, DEFAULT_INDEX_NAME);
        assert_eq!(config.processor_config().timeout, Duration::from_secs(7200));
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("ADN_BATCH_SIZE", "250");
        std::env::set_var("ADN_NUM_WORKERS", "4");
        std::env::set_var("ADN_INDEX_NAME", "variants");
        std::env::set_var("ADN_ASSIGNMENT", "one_shot");
        std::env::set_var("ZINC_BASE_URL", "http://zinc:4080/");

        let config = IngestConfig::from_env().unwrap();
        assert_eq!(config.batch_size, 250);
        assert_eq!(config.num_workers, 4);
        assert_eq!(config.index_name, "variants");
        assert_eq!(config.assignment, AssignmentMode::OneShot);
        assert_eq!(config.zinc.base_url(), "http://zinc:4080");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_zero_workers() {
        clear_env();
        std::env::set_var("ADN_NUM_WORKERS", "0");

        assert!(IngestConfig::from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_malformed_number() {
        clear_env();
        std::env::set_var("ADN_BATCH_SIZE", "ten");

        let err = IngestConfig::from_env().unwrap_err();
        assert!(matches!(err, IngestError::Config(ref msg) if msg.contains("ADN_BATCH_SIZE")));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_unknown_assignment() {
        clear_env();
        std::env::set_var("ADN_ASSIGNMENT", "random");

        assert!(matches!(
            IngestConfig::from_env(),
            Err(IngestError::Config(_))
        ));

        clear_env();
    }
}
