//! Configuration management for Lumen.
//!
//! Configuration lives in a single file at `~/.lumen/config.json`. A missing
//! file is not an error; every field has a default.
//!
//! # Configuration Priority
//!
//! 1. Command-line flags (`lumen serve --host/--port`)
//! 2. Environment variables
//! 3. Explicit config file values
//! 4. Default values
//!
//! A malformed numeric override is an error, not a silent fallback.
//!
//! # Environment Variable Mapping
//!
//! - `LUMEN_HOST` → server.host
//! - `PORT`, `LUMEN_PORT` → server.port (`LUMEN_PORT` wins when both are set)
//! - `GEMINI_API_KEY`, `GOOGLE_API_KEY` → gemini.api_key (only when the file sets none)
//! - `GEMINI_MODEL` → gemini.model
//! - `GEMINI_BASE_URL` → gemini.base_url
//! - `LUMEN_LOG_LEVEL` → observability.log_level
//! - `LUMEN_LOG_FORMAT` → observability.log_format

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result, ResultExt};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".lumen"),
        |dirs| dirs.home_dir().join(".lumen"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Server
// ============================================================================

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    5000
}

// ============================================================================
// Gemini
// ============================================================================

/// Remote model (Gemini) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key. Falls back to `GEMINI_API_KEY` / `GOOGLE_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the generative-language API, without the version path.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: i64,

    /// Whole-request timeout for remote calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// Keep the key out of logs.
impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("has_api_key", &self.api_key.is_some())
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_model() -> String {
    "gemini-2.5-flash".into()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_output_tokens() -> i64 {
    8192
}

fn default_timeout_secs() -> u64 {
    120
}

// ============================================================================
// Chat
// ============================================================================

/// Chat endpoint behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Include an HTML rendering of each reply as `formatted_reply`.
    #[serde(default = "default_true")]
    pub render_markdown: bool,

    /// Optional system instruction sent with every chat turn.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            render_markdown: true,
            system_prompt: None,
        }
    }
}

// ============================================================================
// Observability
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    /// Aliases: "level"
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    /// Aliases: "format"
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets to set to `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path, or defaults if absent.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .context(format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration from `path` (or the default location) and apply
    /// environment overrides. Not validated; call [`Config::validate`] once
    /// every override is in.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("LUMEN_HOST") {
            self.server.host = host;
        }
        for key in ["PORT", "LUMEN_PORT"] {
            if let Some(port) = lookup(key) {
                self.server.port = port.trim().parse().map_err(|_| {
                    Error::Config(format!("{key} must be a port number, got '{port}'"))
                })?;
            }
        }

        if self.gemini.api_key.as_deref().map_or(true, str::is_empty) {
            self.gemini.api_key = lookup("GEMINI_API_KEY")
                .or_else(|| lookup("GOOGLE_API_KEY"))
                .filter(|k| !k.is_empty());
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            self.gemini.model = model;
        }
        if let Some(base_url) = lookup("GEMINI_BASE_URL") {
            self.gemini.base_url = base_url;
        }

        if let Some(level) = lookup("LUMEN_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("LUMEN_LOG_FORMAT") {
            self.observability.log_format = format;
        }
        Ok(())
    }

    /// Apply command-line listener overrides.
    pub fn override_server(&mut self, host: Option<String>, port: Option<u16>) {
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(Error::Config("server.host must not be empty".into()));
        }
        if self.server.port == 0 {
            return Err(Error::Config("server.port must be non-zero".into()));
        }
        if !(0.0..=2.0).contains(&self.gemini.temperature) {
            return Err(Error::Config(format!(
                "gemini.temperature must be within 0.0..=2.0, got {}",
                self.gemini.temperature
            )));
        }
        if self.gemini.max_output_tokens <= 0 {
            return Err(Error::Config(
                "gemini.max_output_tokens must be positive".into(),
            ));
        }
        if self.gemini.model.trim().is_empty() {
            return Err(Error::Config("gemini.model must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert!(config.chat.render_markdown);
        assert_eq!(config.observability.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server": {{"port": 8080}}, "observability": {{"level": "debug"}}}}"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.gemini.max_output_tokens, 8192);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
        assert!(matches!(err, Error::WithContext { ref source, .. } if matches!(**source, Error::Json(_))));
    }

    #[test]
    fn test_missing_explicit_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read config from"));
        assert!(matches!(err, Error::WithContext { ref source, .. } if matches!(**source, Error::Io(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup_from(&[
                ("PORT", "9000"),
                ("GOOGLE_API_KEY", "google-key"),
                ("GEMINI_MODEL", "gemini-2.0-flash"),
                ("LUMEN_LOG_FORMAT", "json"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.gemini.api_key.as_deref(), Some("google-key"));
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        assert_eq!(config.observability.log_format, "json");
    }

    #[test]
    fn test_lumen_port_wins_over_port() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup_from(&[("PORT", "9000"), ("LUMEN_PORT", "9100")]))
            .unwrap();
        assert_eq!(config.server.port, 9100);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(lookup_from(&[("PORT", "80a")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("PORT must be a port number, got '80a'"));

        let mut config = Config::default();
        let err = config
            .apply_overrides(lookup_from(&[("LUMEN_PORT", "70000")]))
            .unwrap_err();
        assert!(err.to_string().contains("LUMEN_PORT"));
    }

    #[test]
    fn test_cli_port_override_is_validated() {
        let mut config = Config::default();
        config.override_server(Some("localhost".into()), Some(0));
        assert_eq!(config.server.host, "localhost");
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.override_server(None, Some(8081));
        assert_eq!(config.server.port, 8081);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_key_beats_env_key() {
        let mut config = Config::default();
        config.gemini.api_key = Some("file-key".into());
        config
            .apply_overrides(lookup_from(&[("GEMINI_API_KEY", "env-key")]))
            .unwrap();
        assert_eq!(config.gemini.api_key.as_deref(), Some("file-key"));
    }

    #[test]
    fn test_gemini_key_preferred_over_google_key() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup_from(&[
                ("GEMINI_API_KEY", "gemini-key"),
                ("GOOGLE_API_KEY", "google-key"),
            ]))
            .unwrap();
        assert_eq!(config.gemini.api_key.as_deref(), Some("gemini-key"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.gemini.temperature = 3.5;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.gemini.max_output_tokens = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_hides_api_key() {
        let mut config = GeminiConfig::default();
        config.api_key = Some("secret-value".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-value"));
        assert!(debug.contains("has_api_key: true"));
    }
}
