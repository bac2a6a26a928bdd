//! Engine configuration
//!
//! Loaded from TOML; every section and field has a default, so an empty or
//! missing file yields a working in-memory engine with enforcement off.
//!
//! ```toml
//! [authorization]
//! enabled = true
//!
//! [job_executor]
//! acquisition_interval_ms = 500
//! max_jobs_per_acquisition = 3
//!
//! [logging]
//! level = "debug"
//! ```

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub authorization: AuthorizationConfig,

    #[serde(default)]
    pub job_executor: JobExecutorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from `path`, falling back to defaults if the file does not exist
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.job_executor.max_jobs_per_acquisition == 0 {
            return Err(ConfigError::Invalid(
                "job_executor.max_jobs_per_acquisition must be at least 1".into(),
            ));
        }
        if self.job_executor.acquisition_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "job_executor.acquisition_interval_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Permission enforcement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// Deferred job acquisition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobExecutorConfig {
    /// Start the background loop when the engine is built inside a tokio runtime
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_acquisition_interval")]
    pub acquisition_interval_ms: u64,

    #[serde(default = "default_max_jobs")]
    pub max_jobs_per_acquisition: usize,
}

impl JobExecutorConfig {
    pub fn acquisition_interval(&self) -> Duration {
        Duration::from_millis(self.acquisition_interval_ms)
    }
}

impl Default for JobExecutorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            acquisition_interval_ms: default_acquisition_interval(),
            max_jobs_per_acquisition: default_max_jobs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Include the event target in output
    #[serde(default)]
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: false,
        }
    }
}

fn default_acquisition_interval() -> u64 {
    5_000
}

fn default_max_jobs() -> usize {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(!config.authorization.enabled);
        assert_eq!(config.job_executor.max_jobs_per_acquisition, 3);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_missing_config() {
        let config = EngineConfig::load("/nonexistent/path/engine.toml").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = EngineConfig::from_toml_str(
            r#"
            [authorization]
            enabled = true

            [job_executor]
            acquisition_interval_ms = 250
            "#,
        )
        .unwrap();
        assert!(config.authorization.enabled);
        assert_eq!(config.job_executor.acquisition_interval(), Duration::from_millis(250));
        assert_eq!(config.job_executor.max_jobs_per_acquisition, 3);
        assert!(!config.logging.with_target);
    }

    #[test]
    fn test_invalid_values() {
        let err = EngineConfig::from_toml_str("[job_executor]\nmax_jobs_per_acquisition = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_toml_str("[authorization]\nenabled = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("bpm-engine-{}.toml", bpm_types::new_id()));
        std::fs::write(&path, "[logging]\nlevel = \"debug\"\nwith_target = true\n").unwrap();
        let config = EngineConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.with_target);
    }
}
