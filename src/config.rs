//! Configuration management for the resume reviewer
//!
//! Settings come from three layers, later layers winning:
//! 1. built-in defaults
//! 2. a TOML file (`config.toml` unless `--config` says otherwise)
//! 3. environment variables (`OLLAMA_URL`, `MODEL_NAME`, `PORT`, ...)
//!
//! The merged result is validated once, before the server starts.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub limits: LimitsConfig,
    pub cache: CacheConfig,
    pub cors: CorsConfig,
    pub observability: ObservabilityConfig,
}

/// Listening address
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
        }
    }
}

/// Model server connection and generation parameters
///
/// Fields are private; read them through the accessors after
/// [`Config::validate`] has accepted the configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    base_url: String,
    model: String,
    stream: bool,
    connect_timeout_seconds: f64,
    read_timeout_seconds: u64,
    max_tokens: u32,
    temperature: f64,
    max_attempts: usize,
    retry_backoff_ms: u64,
    keep_alive: Option<String>,
    warmup: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            stream: false,
            connect_timeout_seconds: 5.0,
            read_timeout_seconds: 120,
            max_tokens: 1024,
            temperature: 0.2,
            max_attempts: crate::upstream::retry::DEFAULT_MAX_ATTEMPTS,
            retry_backoff_ms: crate::upstream::retry::DEFAULT_RETRY_BACKOFF_MS,
            keep_alive: Some("30m".to_string()),
            warmup: true,
        }
    }
}

impl UpstreamConfig {
    /// Base URL of the model server, e.g. `http://localhost:11434`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Model identifier sent with every request
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether generations are requested as NDJSON streams
    pub fn stream(&self) -> bool {
        self.stream
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.connect_timeout_seconds)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_seconds)
    }

    /// Generation budget, forwarded as `options.num_predict`
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn retry_backoff_ms(&self) -> u64 {
        self.retry_backoff_ms
    }

    /// How long the server should keep the model loaded (`None` or empty
    /// leaves the server default)
    pub fn keep_alive(&self) -> Option<&str> {
        self.keep_alive.as_deref().filter(|s| !s.is_empty())
    }

    /// Whether to send a warm-up request at startup
    pub fn warmup(&self) -> bool {
        self.warmup
    }
}

/// Input size limits
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Sanitized text is truncated to this many characters
    pub max_input_chars: usize,
    /// Cleaned text longer than this is rejected outright (413)
    pub max_request_chars: usize,
    /// Declared page counts above this are rejected (413)
    pub max_pages: u32,
    /// Raw request body size limit in bytes
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 12_000,
            max_request_chars: 200_000,
            max_pages: 5,
            max_body_bytes: 1_048_576,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached analyses; 0 disables the cache
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: crate::cache::DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Browser origins allowed to call the API
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Exact origins, or `"*"` to allow any
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: [
                "https://resumereviewer.lukasanell.org",
                "http://localhost:5001",
                "http://localhost:8080",
                "http://127.0.0.1:8080",
                "http://localhost",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl CorsConfig {
    /// Whether the wildcard origin is configured
    pub fn allows_any(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Load configuration from a TOML file and validate it
    ///
    /// Environment variables are not consulted; see [`Config::load`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config = Self::parse_file(path.as_ref())?;
        config.validated(path.as_ref())
    }

    /// Load file, then environment overrides, then validate
    ///
    /// When `explicit` is false (the path is the default), a missing file
    /// is not an error and built-in defaults are used instead.
    pub fn load(path: &Path, explicit: bool) -> AppResult<Self> {
        let mut config = if !explicit && !path.exists() {
            tracing::debug!(
                path = %path.display(),
                "No configuration file found, using built-in defaults"
            );
            Self::default()
        } else {
            Self::parse_file(path)?
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validated(path)
    }

    /// Phase 1 and 2 of loading: read, then parse
    fn parse_file(path: &Path) -> AppResult<Self> {
        let path_display = path.display().to_string();

        let content =
            std::fs::read_to_string(path).map_err(|source| AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            })?;

        toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
            path: path_display,
            source,
        })
    }

    /// Phase 3 of loading, with the path attached to any failure
    fn validated(self, path: &Path) -> AppResult<Self> {
        self.validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(self)
    }

    /// Override settings from environment variables
    ///
    /// `lookup` abstracts the environment so tests don't mutate process
    /// state. Unparseable values are rejected, naming the variable.
    pub fn apply_env<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_env("PORT", &port)?;
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            self.upstream.base_url = url;
        }
        if let Some(model) = lookup("MODEL_NAME") {
            self.upstream.model = model;
        }
        if let Some(stream) = lookup("STREAM") {
            self.upstream.stream = parse_bool("STREAM", &stream)?;
        }
        if let Some(secs) = lookup("CONNECT_TIMEOUT_SECONDS") {
            self.upstream.connect_timeout_seconds = parse_env("CONNECT_TIMEOUT_SECONDS", &secs)?;
        }
        if let Some(secs) = lookup("READ_TIMEOUT_SECONDS") {
            self.upstream.read_timeout_seconds = parse_env("READ_TIMEOUT_SECONDS", &secs)?;
        }
        if let Some(tokens) = lookup("MAX_TOKENS") {
            self.upstream.max_tokens = parse_env("MAX_TOKENS", &tokens)?;
        }
        if let Some(chars) = lookup("MAX_INPUT_CHARS") {
            self.limits.max_input_chars = parse_env("MAX_INPUT_CHARS", &chars)?;
        }
        if let Some(pages) = lookup("MAX_PAGES") {
            self.limits.max_pages = parse_env("MAX_PAGES", &pages)?;
        }
        if let Some(capacity) = lookup("CACHE_CAPACITY") {
            self.cache.capacity = parse_env("CACHE_CAPACITY", &capacity)?;
        }
        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            self.cors.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        Ok(())
    }

    /// Validate configuration after parsing and overrides
    ///
    /// Called by `from_file()` and `load()`; call it explicitly when
    /// constructing a Config by other means.
    pub fn validate(&self) -> AppResult<()> {
        if self.server.host.trim().is_empty() {
            return Err(invalid("server.host must not be empty"));
        }

        let upstream = &self.upstream;
        if !upstream.base_url.starts_with("http://") && !upstream.base_url.starts_with("https://") {
            return Err(invalid(format!(
                "upstream.base_url must start with 'http://' or 'https://', got '{}'",
                upstream.base_url
            )));
        }
        if upstream.model.trim().is_empty() {
            return Err(invalid("upstream.model must not be empty"));
        }
        if !upstream.connect_timeout_seconds.is_finite()
            || upstream.connect_timeout_seconds <= 0.0
            || upstream.connect_timeout_seconds > 300.0
        {
            return Err(invalid(format!(
                "upstream.connect_timeout_seconds must be in (0, 300], got {}",
                upstream.connect_timeout_seconds
            )));
        }
        if upstream.read_timeout_seconds == 0 || upstream.read_timeout_seconds > 3600 {
            return Err(invalid(format!(
                "upstream.read_timeout_seconds must be in [1, 3600], got {}",
                upstream.read_timeout_seconds
            )));
        }
        if upstream.max_tokens == 0 {
            return Err(invalid("upstream.max_tokens must be greater than 0"));
        }
        if !upstream.temperature.is_finite() || !(0.0..=2.0).contains(&upstream.temperature) {
            return Err(invalid(format!(
                "upstream.temperature must be a finite number between 0.0 and 2.0, got {}",
                upstream.temperature
            )));
        }
        if upstream.max_attempts == 0 || upstream.max_attempts > 10 {
            return Err(invalid(format!(
                "upstream.max_attempts must be in [1, 10], got {}",
                upstream.max_attempts
            )));
        }

        let limits = &self.limits;
        if limits.max_input_chars == 0 {
            return Err(invalid("limits.max_input_chars must be greater than 0"));
        }
        if limits.max_request_chars < limits.max_input_chars {
            return Err(invalid(format!(
                "limits.max_request_chars ({}) must be at least limits.max_input_chars ({})",
                limits.max_request_chars, limits.max_input_chars
            )));
        }
        if limits.max_body_bytes == 0 {
            return Err(invalid("limits.max_body_bytes must be greater than 0"));
        }

        for origin in &self.cors.allowed_origins {
            if origin != "*" && !origin.starts_with("http://") && !origin.starts_with("https://") {
                return Err(invalid(format!(
                    "cors.allowed_origins entry '{origin}' must be '*' or start with 'http://' or 'https://'"
                )));
            }
        }

        if !LOG_LEVELS.contains(&self.observability.log_level.as_str()) {
            return Err(invalid(format!(
                "observability.log_level must be one of {LOG_LEVELS:?}, got '{}'",
                self.observability.log_level
            )));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}

fn invalid(reason: impl Into<String>) -> AppError {
    AppError::Config(reason.into())
}

fn parse_env<T>(key: &str, value: &str) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| invalid(format!("environment variable {key}='{value}' is invalid: {e}")))
}

fn parse_bool(key: &str, value: &str) -> AppResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(format!(
            "environment variable {key}='{value}' is not a boolean"
        ))),
    }
}
