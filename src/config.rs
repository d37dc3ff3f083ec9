/*!
 * Configuration types for s3-integrity
 *
 * Settings can come from a TOML file; command-line flags override whatever
 * the file provides.
 */

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::protocol::s3::{S3Config, DEFAULT_PART_SIZE};

/// Bytes per MiB
const MIB: usize = 1024 * 1024;

/// S3 rejects any part but the last below 5 MiB with `EntityTooSmall`
pub const MIN_PART_SIZE_MIB: usize = 5;

/// Configuration for one upload run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Store connection settings
    #[serde(default)]
    pub s3: S3Config,

    /// Part size in MiB
    #[serde(default = "default_part_size_mib")]
    pub part_size_mib: usize,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Write JSON logs to this file instead of stdout
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Debug logging including raw store responses
    #[serde(default)]
    pub verbose: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            s3: S3Config::default(),
            part_size_mib: default_part_size_mib(),
            log_level: LogLevel::default(),
            log_file: None,
            verbose: false,
        }
    }
}

/// Logging level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn default_part_size_mib() -> usize {
    DEFAULT_PART_SIZE / MIB
}

impl UploadConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: UploadConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Part size in bytes
    pub fn part_size_bytes(&self) -> usize {
        self.part_size_mib.saturating_mul(MIB)
    }

    /// Validate settings that cannot be checked by the type system
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.part_size_mib < MIN_PART_SIZE_MIB {
            anyhow::bail!(
                "part_size_mib must be at least {} (got {})",
                MIN_PART_SIZE_MIB,
                self.part_size_mib
            );
        }
        self.s3.validate().context("Invalid [s3] settings")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = UploadConfig::default();
        assert_eq!(config.part_size_mib, 8);
        assert_eq!(config.part_size_bytes(), 8 * 1024 * 1024);
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
part_size_mib = 16
log_level = "debug"

[s3]
endpoint = "http://localhost:9000"
access_key = "minioadmin"
secret_key = "minioadmin"
"#
        )
        .unwrap();

        let config = UploadConfig::from_file(file.path()).unwrap();
        assert_eq!(config.part_size_mib, 16);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.s3.endpoint.as_deref(), Some("http://localhost:9000"));
        assert!(config.s3.has_explicit_credentials());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_missing_file() {
        let err = UploadConfig::from_file(Path::new("/nonexistent/s3-integrity.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_validate_enforces_minimum_part_size() {
        for too_small in [0, 1, 4] {
            let config = UploadConfig {
                part_size_mib: too_small,
                ..Default::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("at least 5"));
        }

        let config = UploadConfig {
            part_size_mib: 5,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.part_size_bytes(), 5 * 1024 * 1024);
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::Error.to_tracing_level(), tracing::Level::ERROR);
        assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
    }
}
