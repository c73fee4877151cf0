//! Configuration management for the feedback service.
//!
//! The service reads an optional JSON file at `~/.feedback/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `GEMINI_API_KEY` / `GOOGLE_API_KEY` → secrets.gemini_api_key
//! - `DATABASE_URL` → database.url
//! - `FEEDBACK_PORT` → service.port
//! - `FEEDBACK_BIND_ADDRESS` → network.bind
//! - `FEEDBACK_ADMIN_TOKEN` → admin.token
//! - `FEEDBACK_LLM_MODEL` → llm.model
//! - `FEEDBACK_LLM_BASE_URL` → llm.base_url
//! - `FEEDBACK_LLM_TIMEOUT_SECS` → llm.timeout_secs
//! - `FEEDBACK_LOG_LEVEL` → observability.log_level
//! - `FEEDBACK_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Local database file used when no `DATABASE_URL` is configured.
pub const DEFAULT_SQLITE_PATH: &str = "./reviews.db";

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".feedback"),
        |dirs| dirs.home_dir().join(".feedback"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Network / Service
// ============================================================================

/// Network configuration.
///
/// Default bind address is `127.0.0.1` (local only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_bind_address")]
    pub bind: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".into()
}

/// HTTP service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_port() -> u16 {
    8001
}

// ============================================================================
// Secrets
// ============================================================================

/// Credentials for external services.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct SecretsConfig {
    /// Gemini API key. When absent the analyzer runs in degraded mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
}

impl std::fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsConfig")
            .field(
                "gemini_api_key",
                &self.gemini_api_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

// ============================================================================
// LLM
// ============================================================================

/// Generation model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Gemini model name
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API base URL (overridable for testing and proxies)
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Request timeout for a single generation call
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature
    #[serde(default = "default_llm_temperature")]
    pub temperature: f64,

    /// Upper bound on generated tokens
    #[serde(default = "default_llm_max_output_tokens")]
    pub max_output_tokens: i64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            base_url: default_llm_base_url(),
            timeout_secs: default_llm_timeout_secs(),
            temperature: default_llm_temperature(),
            max_output_tokens: default_llm_max_output_tokens(),
        }
    }
}

fn default_llm_model() -> String {
    "gemini-flash-latest".into()
}

fn default_llm_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}

fn default_llm_timeout_secs() -> u64 {
    10
}

fn default_llm_temperature() -> f64 {
    0.7
}

fn default_llm_max_output_tokens() -> i64 {
    1024
}

// ============================================================================
// Database
// ============================================================================

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    /// Connection string. Absent selects the local SQLite file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl DatabaseConfig {
    /// Resolve the configured URL to a SQLite file path.
    ///
    /// Accepts `sqlite:///relative`, `sqlite:////absolute`, `sqlite://path`,
    /// `file:path` and bare paths. Other engines are not bundled with this
    /// build, so they fall back to [`DEFAULT_SQLITE_PATH`].
    pub fn sqlite_path(&self) -> PathBuf {
        let Some(url) = self.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
            return PathBuf::from(DEFAULT_SQLITE_PATH);
        };

        if let Some(rest) = url.strip_prefix("sqlite:///") {
            return PathBuf::from(rest);
        }
        if let Some(rest) = url.strip_prefix("sqlite://") {
            return PathBuf::from(rest);
        }
        if let Some(rest) = url.strip_prefix("file:") {
            return PathBuf::from(rest);
        }
        if url.contains("://") {
            let scheme = url.split("://").next().unwrap_or_default();
            tracing::warn!(
                scheme = %scheme,
                fallback = DEFAULT_SQLITE_PATH,
                "Unsupported database engine, falling back to local SQLite"
            );
            return PathBuf::from(DEFAULT_SQLITE_PATH);
        }

        PathBuf::from(url)
    }
}

// ============================================================================
// Admin
// ============================================================================

/// Admin endpoint access control.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AdminConfig {
    /// Bearer token required by `/admin/*`. Unset leaves the routes open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// ============================================================================
// Observability
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration for the feedback service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub secrets: SecretsConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source.
    ///
    /// Empty values are ignored. Unparseable numeric values keep the
    /// current setting.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("GEMINI_API_KEY").or_else(|| var("GOOGLE_API_KEY")) {
            self.secrets.gemini_api_key = Some(key);
        }
        if let Some(url) = var("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(port) = var("FEEDBACK_PORT") {
            if let Ok(p) = port.parse() {
                self.service.port = p;
            }
        }
        if let Some(bind) = var("FEEDBACK_BIND_ADDRESS") {
            self.network.bind = bind;
        }
        if let Some(token) = var("FEEDBACK_ADMIN_TOKEN") {
            self.admin.token = Some(token);
        }
        if let Some(model) = var("FEEDBACK_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(base_url) = var("FEEDBACK_LLM_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Some(timeout) = var("FEEDBACK_LLM_TIMEOUT_SECS") {
            if let Ok(t) = timeout.parse() {
                self.llm.timeout_secs = t;
            }
        }
        if let Some(level) = var("FEEDBACK_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = var("FEEDBACK_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// The generation API key, trimmed. Blank keys count as absent.
    pub fn llm_api_key(&self) -> Option<&str> {
        self.secrets
            .gemini_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Whether a generation credential is present.
    pub fn has_llm_credentials(&self) -> bool {
        self.llm_api_key().is_some()
    }

    /// Socket address string for the HTTP listener.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.network.bind, self.service.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.service.port, 8001);
        assert_eq!(config.network.bind, "127.0.0.1");
        assert_eq!(config.llm.model, "gemini-flash-latest");
        assert_eq!(config.llm.timeout_secs, 10);
        assert!(config.secrets.gemini_api_key.is_none());
        assert!(!config.has_llm_credentials());
    }

    #[test]
    fn test_parse_partial_json() {
        let config: Config =
            serde_json::from_str(r#"{"service": {"port": 9000}, "llm": {"model": "gemini-2.0-flash"}}"#)
                .unwrap();
        assert_eq!(config.service.port, 9000);
        assert_eq!(config.llm.model, "gemini-2.0-flash");
        assert_eq!(config.llm.timeout_secs, 10);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_observability_aliases() {
        let config: Config =
            serde_json::from_str(r#"{"observability": {"level": "debug", "format": "json"}}"#).unwrap();
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, "json");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("GOOGLE_API_KEY", "google-key"),
            ("DATABASE_URL", "sqlite:///./data/reviews.db"),
            ("FEEDBACK_PORT", "9100"),
            ("FEEDBACK_LLM_TIMEOUT_SECS", "3"),
            ("FEEDBACK_LOG_FORMAT", "json"),
        ]));

        assert_eq!(config.secrets.gemini_api_key.as_deref(), Some("google-key"));
        assert_eq!(config.service.port, 9100);
        assert_eq!(config.llm.timeout_secs, 3);
        assert_eq!(config.observability.log_format, "json");
        assert_eq!(config.database.sqlite_path(), PathBuf::from("./data/reviews.db"));
        assert!(config.has_llm_credentials());
    }

    #[test]
    fn test_llm_api_key_trims_and_rejects_blank() {
        let mut config = Config::default();
        config.secrets.gemini_api_key = Some("   ".into());
        assert!(config.llm_api_key().is_none());
        assert!(!config.has_llm_credentials());

        config.secrets.gemini_api_key = Some("  abc123 \n".into());
        assert_eq!(config.llm_api_key(), Some("abc123"));
        assert!(config.has_llm_credentials());
    }

    #[test]
    fn test_gemini_key_takes_precedence() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("GEMINI_API_KEY", "gemini-key"),
            ("GOOGLE_API_KEY", "google-key"),
        ]));
        assert_eq!(config.secrets.gemini_api_key.as_deref(), Some("gemini-key"));
    }

    #[test]
    fn test_invalid_and_empty_overrides_ignored() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("FEEDBACK_PORT", "not-a-port"),
            ("GEMINI_API_KEY", "   "),
        ]));
        assert_eq!(config.service.port, 8001);
        assert!(config.secrets.gemini_api_key.is_none());
    }

    #[test]
    fn test_sqlite_path_resolution() {
        let db = |url: Option<&str>| DatabaseConfig {
            url: url.map(String::from),
        };

        assert_eq!(db(None).sqlite_path(), PathBuf::from(DEFAULT_SQLITE_PATH));
        assert_eq!(db(Some("")).sqlite_path(), PathBuf::from(DEFAULT_SQLITE_PATH));
        assert_eq!(
            db(Some("sqlite:////var/lib/reviews.db")).sqlite_path(),
            PathBuf::from("/var/lib/reviews.db")
        );
        assert_eq!(db(Some("file:reviews.db")).sqlite_path(), PathBuf::from("reviews.db"));
        assert_eq!(db(Some("/tmp/x.db")).sqlite_path(), PathBuf::from("/tmp/x.db"));
        assert_eq!(
            db(Some("postgresql://user:pw@host/db")).sqlite_path(),
            PathBuf::from(DEFAULT_SQLITE_PATH)
        );
    }

    #[test]
    fn test_secrets_debug_redacted() {
        let secrets = SecretsConfig {
            gemini_api_key: Some("super-secret".into()),
        };
        let rendered = format!("{:?}", secrets);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"admin": {"token": "t0k3n"}}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.admin.token.as_deref(), Some("t0k3n"));
    }

    #[test]
    fn test_listen_address() {
        let config = Config::default();
        assert_eq!(config.listen_address(), "127.0.0.1:8001");
    }
}
