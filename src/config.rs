// src/config.rs

//! Configuration for the shard scheduler.
//!
//! This module provides the scheduler's sizing and last-batch policy options,
//! with TOML parsing, environment variable overrides, and validation of the
//! legal option combinations.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, SchedError};

/// Sizing and last-batch policy for a [`ShardScheduler`](crate::ShardScheduler).
///
/// Exactly one of `size` and `reader_name` determines epoch sizing:
/// a positive `size` declares the epoch length manually, while `reader_name`
/// derives the epoch length and shard geometry from the workers' readers.
/// The default `size` of `-1` with no `reader_name` selects unsized mode,
/// where the caller alone decides when iteration stops.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of samples in one worker's shard, or `-1` for reader-driven or
    /// unsized operation.
    pub size: i64,
    /// Name of the reader to query for epoch size and shard geometry.
    pub reader_name: Option<String>,
    /// Whether the scheduler advances to the next epoch by itself when the
    /// epoch boundary is observed, instead of waiting for an explicit reset.
    pub auto_reset: bool,
    /// Whether the last batch of an epoch is filled up to the full batch size
    /// (wrapping into the next epoch's data) or left partial.
    pub fill_last_batch: bool,
    /// Whether a filled last batch repeats the final sample rather than
    /// borrowing from the next epoch. Derived from the reader when
    /// `reader_name` is set.
    pub last_batch_padded: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            size: -1,
            reader_name: None,
            auto_reset: false,
            fill_last_batch: true,
            last_batch_padded: false,
        }
    }
}

impl FromStr for SchedulerConfig {
    type Err = SchedError;

    /// Parse configuration from a TOML string.
    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| SchedError::invalid_config(format!("failed to parse TOML config: {e}")))
    }
}

impl SchedulerConfig {
    // Load configuration from a TOML file.
    //
    // # Errors
    //
    // Returns an error if the file cannot be read, parsed, or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SchedError::invalid_config(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        let config: Self = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    // Apply environment variable overrides.
    //
    // Environment variables are prefixed with `SHS_`:
    // - `SHS_SIZE` overrides `size`
    // - `SHS_READER_NAME` overrides `reader_name`
    // - `SHS_AUTO_RESET` overrides `auto_reset`
    // - `SHS_FILL_LAST_BATCH` overrides `fill_last_batch`
    // - `SHS_LAST_BATCH_PADDED` overrides `last_batch_padded`
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("SHS_SIZE") {
            if let Ok(v) = val.parse() {
                self.size = v;
            }
        }
        if let Ok(val) = std::env::var("SHS_READER_NAME") {
            if val.is_empty() {
                self.reader_name = None;
            } else {
                self.reader_name = Some(val);
            }
        }
        if let Ok(val) = std::env::var("SHS_AUTO_RESET") {
            if let Ok(v) = val.parse() {
                self.auto_reset = v;
            }
        }
        if let Ok(val) = std::env::var("SHS_FILL_LAST_BATCH") {
            if let Ok(v) = val.parse() {
                self.fill_last_batch = v;
            }
        }
        if let Ok(val) = std::env::var("SHS_LAST_BATCH_PADDED") {
            if let Ok(v) = val.parse() {
                self.last_batch_padded = v;
            }
        }
        self
    }

    /// Validate the option combinations that do not depend on the worker set.
    ///
    /// Worker-dependent rules (negative size with multiple workers) are
    /// checked when the scheduler is constructed.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(SchedError::invalid_config("size must not be 0"));
        }
        if self.reader_name.is_some() {
            if self.size >= 0 {
                return Err(SchedError::invalid_config(
                    "size must not be set when reader_name is used; \
                     the epoch size is derived from the reader",
                ));
            }
            if self.last_batch_padded {
                return Err(SchedError::invalid_config(
                    "last_batch_padded must not be set when reader_name is used; \
                     it is derived from the reader",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.size, -1);
        assert!(config.reader_name.is_none());
        assert!(!config.auto_reset);
        assert!(config.fill_last_batch);
        assert!(!config.last_batch_padded);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            size = 128
            auto_reset = true
            fill_last_batch = false
        "#;
        let config: SchedulerConfig = toml.parse().unwrap();
        assert_eq!(config.size, 128);
        assert!(config.auto_reset);
        assert!(!config.fill_last_batch);
        // omitted fields keep their defaults
        assert!(config.reader_name.is_none());
        assert!(!config.last_batch_padded);
    }

    #[test]
    fn test_parse_toml_reader_driven() {
        let toml = r#"
            reader_name = "train_reader"
            auto_reset = true
        "#;
        let config: SchedulerConfig = toml.parse().unwrap();
        assert_eq!(config.reader_name.as_deref(), Some("train_reader"));
        assert_eq!(config.size, -1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_str_invalid_toml() {
        let result: Result<SchedulerConfig> = "size = [not valid".parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "size = 64").unwrap();
        writeln!(file, "last_batch_padded = true").unwrap();
        file.flush().unwrap();

        let config = SchedulerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.size, 64);
        assert!(config.last_batch_padded);
    }

    #[test]
    fn test_from_file_not_found() {
        let result = SchedulerConfig::from_file("/nonexistent/sched.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_zero_size() {
        let config = SchedulerConfig {
            size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_reader_with_manual_size() {
        let config = SchedulerConfig {
            size: 100,
            reader_name: Some("reader".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_reader_with_last_batch_padded() {
        let config = SchedulerConfig {
            reader_name: Some("reader".to_string()),
            last_batch_padded: true,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        // Serialize access to the process environment within this test only.
        std::env::set_var("SHS_SIZE", "256");
        std::env::set_var("SHS_AUTO_RESET", "true");

        let config = SchedulerConfig::default().with_env_overrides();
        assert_eq!(config.size, 256);
        assert!(config.auto_reset);

        std::env::remove_var("SHS_SIZE");
        std::env::remove_var("SHS_AUTO_RESET");
    }
}
