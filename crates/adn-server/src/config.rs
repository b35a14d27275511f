//! Configuration management

use adn_common::env;
use adn_ingest::IngestConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Name of the upload spool directory under the system temp dir.
pub const UPLOAD_DIR_NAME: &str = "adn_index_data";

/// Default maximum upload size (1 GiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub ingest: IngestConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
    /// Where uploaded files are spooled while being indexed
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_SERVER_PORT,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            upload_dir: std::env::temp_dir().join(UPLOAD_DIR_NAME),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = ServerConfig::default();
        let config = Config {
            server: ServerConfig {
                host: env::string_or("ADN_HOST", &defaults.host),
                port: env::parse_or("ADN_PORT", defaults.port)?,
                shutdown_timeout_secs: env::parse_or(
                    "ADN_SHUTDOWN_TIMEOUT",
                    defaults.shutdown_timeout_secs,
                )?,
                upload_dir: env::parse_or("ADN_UPLOAD_DIR", defaults.upload_dir)?,
                max_upload_bytes: env::parse_or("ADN_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            },
            ingest: IngestConfig::from_env()?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.server.max_upload_bytes == 0 {
            anyhow::bail!("Maximum upload size must be greater than 0");
        }

        self.ingest.validate()?;

        Ok(())
    }
}
