//! Integration tests for configuration loading from disk

use std::io::Write;

use resume_reviewer::config::Config;
use resume_reviewer::error::AppError;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_full_file_round_trips_through_loader() {
    let file = write_config(
        r#"
[server]
host = "127.0.0.1"
port = 8088

[upstream]
base_url = "http://gpu-box:11434"
model = "llama3:70b"
stream = true
read_timeout_seconds = 300
max_attempts = 5

[limits]
max_input_chars = 8000
max_pages = 3

[cache]
capacity = 128

[cors]
allowed_origins = ["https://reviewer.example"]

[observability]
log_level = "debug"
"#,
    );

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8088);
    assert_eq!(config.upstream.base_url(), "http://gpu-box:11434");
    assert_eq!(config.upstream.model(), "llama3:70b");
    assert!(config.upstream.stream());
    assert_eq!(config.upstream.read_timeout().as_secs(), 300);
    assert_eq!(config.upstream.max_attempts(), 5);
    assert_eq!(config.limits.max_input_chars, 8000);
    assert_eq!(config.limits.max_pages, 3);
    assert_eq!(config.cache.capacity, 128);
    assert_eq!(config.cors.allowed_origins, vec!["https://reviewer.example"]);
    assert_eq!(config.observability.log_level, "debug");
}

#[test]
fn test_validation_error_names_file_and_key() {
    let file = write_config("[limits]\nmax_input_chars = 0\n");

    let err = Config::from_file(file.path()).unwrap_err();
    match &err {
        AppError::ConfigValidationFailed { path, reason } => {
            assert_eq!(path, &file.path().display().to_string());
            assert!(reason.contains("limits.max_input_chars"), "reason: {reason}");
        }
        other => panic!("expected ConfigValidationFailed, got {other:?}"),
    }
}

#[test]
fn test_unknown_value_type_is_parse_error() {
    let file = write_config("[server]\nport = \"eighty\"\n");
    assert!(matches!(
        Config::from_file(file.path()),
        Err(AppError::ConfigParseFailed { .. })
    ));
}

#[test]
fn test_explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(&dir.path().join("missing.toml"), true).unwrap_err();
    assert!(matches!(err, AppError::ConfigFileRead { .. }));
}
