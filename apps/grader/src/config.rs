//! # Application Configuration
//!
//! `grader.toml` with three tables:
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! cors_origins = "http://localhost:3000"   # or "*"
//! rate_limit = 100                         # requests/second, 0 disables
//! api_key = "secret"                       # omit to disable auth
//! max_upload_bytes = 2097152
//!
//! [logging]
//! format = "text"                          # or "json"
//! filter = "grader=debug"
//!
//! [pipeline]
//! settle_delay_ms = 2000
//! timeout_ms = 5000
//! seed = 42
//! scorer = "reference"                     # or "pixel"
//! confidence = "reference"                 # or "margin"
//! ```
//!
//! A missing file means defaults. Environment variables override the file:
//! `GRADER_API_KEY`, `GRADER_RATE_LIMIT`, `GRADER_CORS_ORIGINS`,
//! `GRADER_LOG_FORMAT`, `GRADER_SETTLE_DELAY_MS`, `GRADER_SEED`.

use grader_core::{GraderError, PipelineConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default request body limit: 2 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;

/// Default rate limit: 100 requests per second.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Comma-separated origins, or "*". `None` allows localhost only.
    pub cors_origins: Option<String>,
    pub rate_limit: u32,
    /// Bearer key required on every route but `/health`.
    pub api_key: Option<String>,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: None,
            rate_limit: DEFAULT_RATE_LIMIT,
            api_key: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The API key, if one is configured and non-empty.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, GraderError> {
        toml::from_str(source).map_err(|e| GraderError::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load from a file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, GraderError> {
        match std::fs::read_to_string(path) {
            Ok(source) => Self::from_toml_str(&source),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(GraderError::Io(format!(
                "Cannot read config '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    /// Load from a file, apply environment overrides, and validate.
    pub fn load_with_env(path: &Path) -> Result<Self, GraderError> {
        let mut config = Self::load(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), GraderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("GRADER_API_KEY") {
            self.server.api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some(origins) = lookup("GRADER_CORS_ORIGINS") {
            self.server.cors_origins = Some(origins);
        }
        if let Some(limit) = lookup("GRADER_RATE_LIMIT") {
            self.server.rate_limit = parse_number("GRADER_RATE_LIMIT", &limit)?;
        }
        if let Some(format) = lookup("GRADER_LOG_FORMAT") {
            self.logging.format = match format.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Text,
            };
        }
        if let Some(delay) = lookup("GRADER_SETTLE_DELAY_MS") {
            self.pipeline.settle_delay_ms = parse_number("GRADER_SETTLE_DELAY_MS", &delay)?;
        }
        if let Some(seed) = lookup("GRADER_SEED") {
            self.pipeline.seed = Some(parse_number("GRADER_SEED", &seed)?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), GraderError> {
        if self.server.max_upload_bytes == 0 {
            return Err(GraderError::Config(
                "server.max_upload_bytes must be positive".to_string(),
            ));
        }
        self.pipeline.validate()
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, GraderError> {
    raw.trim()
        .parse()
        .map_err(|_| GraderError::Config(format!("{} must be a non-negative integer, got '{}'", key, raw)))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use grader_core::{ConfidenceKind, ScorerKind};
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_file_uses_defaults() {
        let temp = tempdir().expect("temp dir");
        let config = AppConfig::load(&temp.path().join("absent.toml")).expect("defaults");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.addr(), "127.0.0.1:8080");
        assert_eq!(config.pipeline.settle_delay_ms, 2000);
    }

    #[test]
    fn file_tables_are_parsed() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("grader.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9090
api_key = "k"

[logging]
format = "json"

[pipeline]
settle_delay_ms = 500
timeout_ms = 1500
scorer = "pixel"
confidence = "margin"
"#,
        )
        .expect("write config");

        let config = AppConfig::load(&path).expect("parse");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.api_key(), Some("k"));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.pipeline.timeout_ms, Some(1500));
        assert_eq!(config.pipeline.scorer, ScorerKind::Pixel);
        assert_eq!(config.pipeline.confidence, ConfidenceKind::Margin);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let result = AppConfig::from_toml_str("[server\nport = ");
        assert!(matches!(result, Err(GraderError::Config(_))));
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(lookup(&[
                ("GRADER_API_KEY", "env-key"),
                ("GRADER_RATE_LIMIT", "0"),
                ("GRADER_LOG_FORMAT", "JSON"),
                ("GRADER_SETTLE_DELAY_MS", "0"),
                ("GRADER_SEED", "7"),
            ]))
            .expect("overrides");

        assert_eq!(config.server.api_key(), Some("env-key"));
        assert_eq!(config.server.rate_limit, 0);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.pipeline.settle_delay_ms, 0);
        assert_eq!(config.pipeline.seed, Some(7));
    }

    #[test]
    fn empty_api_key_disables_auth() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(lookup(&[("GRADER_API_KEY", "")]))
            .expect("overrides");
        assert_eq!(config.server.api_key(), None);
    }

    #[test]
    fn non_numeric_override_is_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(lookup(&[("GRADER_RATE_LIMIT", "fast")]));
        assert!(matches!(result, Err(GraderError::Config(_))));
    }

    #[test]
    fn validate_checks_pipeline() {
        let mut config = AppConfig::default();
        config.pipeline.timeout_ms = Some(0);
        assert!(config.validate().is_err());
    }
}
