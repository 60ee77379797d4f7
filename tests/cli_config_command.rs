//! Integration tests for the `config` subcommand's template output

use resume_reviewer::cli::generate_config_template;
use resume_reviewer::config::Config;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_written_template_loads_as_valid_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");

    fs::write(&config_path, generate_config_template()).expect("Failed to write template");

    let config =
        Config::from_file(&config_path).expect("Generated template should load as valid Config");
    assert_eq!(config.server.port, 5001);
    assert_eq!(config.upstream.model(), "llama3");
    assert_eq!(config.upstream.base_url(), "http://localhost:11434");
    assert!(!config.upstream.stream());
}

#[test]
fn test_template_documents_environment_overrides() {
    let template = generate_config_template();

    for var in [
        "HOST",
        "PORT",
        "OLLAMA_URL",
        "MODEL_NAME",
        "STREAM",
        "CONNECT_TIMEOUT_SECONDS",
        "READ_TIMEOUT_SECONDS",
        "MAX_TOKENS",
        "MAX_INPUT_CHARS",
        "MAX_PAGES",
        "CACHE_CAPACITY",
        "ALLOWED_ORIGINS",
    ] {
        assert!(template.contains(var), "template should mention {var}");
    }
}
