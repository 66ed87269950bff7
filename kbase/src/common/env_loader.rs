//! Environment variable loading utilities
//!
//! Values that are set but do not parse are reported with a warning and the
//! default is kept.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Load an environment variable with a string default
pub fn load_env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Load an environment variable with type conversion and default
pub fn load_env_parsed<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    load_env_optional(key).unwrap_or(default)
}

/// Load an environment variable as an `Option<T>`. Blank values count as unset.
pub fn load_env_optional<T>(key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = env::var(key).ok()?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring {}={:?}: {}", key, raw, e);
            None
        }
    }
}

/// Builder for loading multiple environment variables with consistent prefix
#[derive(Debug)]
pub struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    /// Create a new environment loader with the given prefix
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    /// Full variable name for `suffix`
    pub fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.prefix, suffix)
    }

    /// Load a string value with default
    pub fn load_string(&self, suffix: &str, default: &str) -> String {
        load_env_string(&self.key(suffix), default)
    }

    /// Load a parsed value with default
    pub fn load_parsed<T>(&self, suffix: &str, default: T) -> T
    where
        T: FromStr,
        T::Err: Display,
    {
        load_env_parsed(&self.key(suffix), default)
    }

    /// Load an optional value
    pub fn load_optional<T>(&self, suffix: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        load_env_optional(&self.key(suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_load_env_string() {
        let key = "KBASE_TEST_STRING_VAR";
        env::remove_var(key);
        assert_eq!(load_env_string(key, "fallback"), "fallback");

        env::set_var(key, "value");
        assert_eq!(load_env_string(key, "fallback"), "value");
        env::remove_var(key);
    }

    #[test]
    #[serial]
    fn test_load_env_parsed_keeps_default_on_garbage() {
        let key = "KBASE_TEST_PARSED_VAR";
        env::set_var(key, "not-a-number");
        assert_eq!(load_env_parsed(key, 42u32), 42);

        env::set_var(key, " 7 ");
        assert_eq!(load_env_parsed(key, 42u32), 7);
        env::remove_var(key);
    }

    #[test]
    #[serial]
    fn test_loader_prefix() {
        let loader = EnvLoader::new("KBASE_TEST");
        assert_eq!(loader.key("DAYS"), "KBASE_TEST_DAYS");

        env::set_var("KBASE_TEST_DAYS", "");
        assert_eq!(loader.load_optional::<u32>("DAYS"), None);
        env::set_var("KBASE_TEST_DAYS", "14");
        assert_eq!(loader.load_parsed("DAYS", 7u32), 14);
        env::remove_var("KBASE_TEST_DAYS");
    }
}
