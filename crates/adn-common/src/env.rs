//! Typed environment variable lookup shared by the configuration loaders

use std::str::FromStr;

use crate::error::{AdnError, Result};

/// Parse `key` if it is set.
///
/// Unset (or non-unicode) variables yield `Ok(None)`; a value that does not
/// parse is a configuration error naming the variable.
pub fn parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AdnError::config(format!("{key}={raw:?} is invalid: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Parse `key`, falling back to `default` when it is unset
pub fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse(key)?.unwrap_or(default))
}

/// String value of `key`, or `default` when unset
pub fn string_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_unset_uses_default() {
        std::env::remove_var("ADN_TEST_UNSET");
        assert_eq!(parse_or("ADN_TEST_UNSET", 42usize).unwrap(), 42);
        assert_eq!(string_or("ADN_TEST_UNSET", "fallback"), "fallback");
    }

    #[test]
    #[serial]
    fn test_value_is_parsed() {
        std::env::set_var("ADN_TEST_NUMBER", " 250 ");
        assert_eq!(parse::<u64>("ADN_TEST_NUMBER").unwrap(), Some(250));
        std::env::remove_var("ADN_TEST_NUMBER");
    }

    #[test]
    #[serial]
    fn test_malformed_value_is_config_error() {
        std::env::set_var("ADN_TEST_BAD", "lots");
        let err = parse::<usize>("ADN_TEST_BAD").unwrap_err();
        assert!(matches!(err, AdnError::Config(_)));
        assert!(err.to_string().contains("ADN_TEST_BAD"));
        std::env::remove_var("ADN_TEST_BAD");
    }
}
