//! Error types for ADN

use thiserror::Error;

/// Result type alias for ADN operations
pub type Result<T> = std::result::Result<T, AdnError>;

/// Main error type shared across ADN crates
#[derive(Error, Debug)]
pub enum AdnError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AdnError {
    /// Build a configuration error from anything displayable
    pub fn config(message: impl Into<String>) -> Self {
        AdnError::Config(message.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let err = AdnError::config("batch_size must be at least 1");
        assert_eq!(
            err.to_string(),
            "Configuration error: batch_size must be at least 1"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.vcf");
        let err: AdnError = io.into();
        assert!(matches!(err, AdnError::Io(_)));
    }
}
