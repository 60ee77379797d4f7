//! Command-line interface for the resume reviewer

use std::path::Path;

use clap::{Parser, Subcommand};

/// Configuration file used when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Resume analysis service backed by a local LLM
#[derive(Parser)]
#[command(name = "resume-reviewer")]
#[command(version)]
#[command(about = "Resume analysis service backed by a local LLM")]
#[command(
    long_about = "Scores resume text against a fixed five-category rubric by prompting an \
    Ollama-compatible model server, validating its JSON answer and caching the result."
)]
pub struct Cli {
    /// Path to configuration file [default: config.toml, optional]
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The configuration path, and whether the user named it explicitly
    ///
    /// Only an explicitly named file is required to exist.
    pub fn config_path(&self) -> (&Path, bool) {
        match &self.config {
            Some(path) => (Path::new(path), true),
            None => (Path::new(DEFAULT_CONFIG_PATH), false),
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# Resume Reviewer Configuration
# =============================
#
# Every key is optional; the values below are the built-in defaults.
# Environment variables override this file (shown next to each key).

# ─────────────────────────────────────────────────────────────────────────────
# SERVER
# ─────────────────────────────────────────────────────────────────────────────

[server]
# Address to bind (0.0.0.0 for all interfaces)            env: HOST
host = "0.0.0.0"
# Port to listen on                                       env: PORT
port = 5001

# ─────────────────────────────────────────────────────────────────────────────
# MODEL SERVER (Ollama-compatible /api/generate)
# ─────────────────────────────────────────────────────────────────────────────

[upstream]
# Base URL of the model server                            env: OLLAMA_URL
base_url = "http://localhost:11434"
# Model to run                                            env: MODEL_NAME
model = "llama3"
# Request NDJSON streaming; lets the reader stop as soon  env: STREAM
# as a complete JSON object has arrived
stream = false
# Time allowed to establish the connection                env: CONNECT_TIMEOUT_SECONDS
connect_timeout_seconds = 5.0
# Time allowed for the complete response                  env: READ_TIMEOUT_SECONDS
read_timeout_seconds = 120
# Generation budget (options.num_predict)                 env: MAX_TOKENS
max_tokens = 1024
# Sampling temperature (0.0-2.0)
temperature = 0.2
# Attempts per call for transient failures (timeouts, network errors, 5xx)
max_attempts = 3
# Base backoff between attempts; doubles on each retry
retry_backoff_ms = 500
# How long the model server keeps the model loaded ("" = server default)
keep_alive = "30m"
# Load the model with an empty prompt at startup
warmup = true

# ─────────────────────────────────────────────────────────────────────────────
# INPUT LIMITS
# ─────────────────────────────────────────────────────────────────────────────

[limits]
# Sanitized text is truncated to this many characters     env: MAX_INPUT_CHARS
max_input_chars = 12000
# Cleaned text longer than this is rejected with 413
max_request_chars = 200000
# Declared page counts above this are rejected with 413   env: MAX_PAGES
max_pages = 5
# Raw request body limit in bytes
max_body_bytes = 1048576

# ─────────────────────────────────────────────────────────────────────────────
# RESPONSE CACHE
# ─────────────────────────────────────────────────────────────────────────────

[cache]
# Number of analyses kept in memory (0 disables caching)  env: CACHE_CAPACITY
capacity = 64

# ─────────────────────────────────────────────────────────────────────────────
# CORS
# ─────────────────────────────────────────────────────────────────────────────

[cors]
# Browser origins allowed to call the API; "*" allows any
# env: ALLOWED_ORIGINS (comma-separated)
allowed_origins = [
    "https://resumereviewer.lukasanell.org",
    "http://localhost:5001",
    "http://localhost:8080",
    "http://127.0.0.1:8080",
    "http://localhost",
]

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error" (RUST_LOG wins)
log_level = "info"

# Prometheus metrics are always available at /metrics on the server port
"#
}
