//! Config file loading and environment overlay

use budget_pacing_monitor::config::{AppConfig, CheckpointBackend, ConfigError, PublisherKind, ENV_CLIENT_ID, ENV_REFRESH_TOKEN};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

fn write_config(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_file() {
    let file = write_config(
        r#"
recipients = ["ops@example.com", "lead@example.com"]
pacing_threshold = 85
datetime_locale = "de-DE"
datetime_timezone = "Europe/Berlin"
combine_all_accounts = false
account_batch_size = 25
publisher = "csv"
checkpoint_backend = "drive"
output_dir = "/tmp/reports"

[credentials]
client_id = "id"
client_secret = "secret"
refresh_token = "refresh"
"#,
    );

    let config = AppConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.recipients.len(), 2);
    assert_eq!(config.pacing_threshold, 85);
    assert!(!config.combine_all_accounts);
    assert_eq!(config.account_batch_size, 25);
    assert_eq!(config.publisher, PublisherKind::Csv);
    assert_eq!(config.checkpoint_backend, CheckpointBackend::Drive);
    assert_eq!(config.output_dir, Path::new("/tmp/reports"));
    assert_eq!(config.credentials.refresh_token.as_deref(), Some("refresh"));
    // untouched keys keep their defaults
    assert!(config.new_spreadsheet_each_run);
    assert_eq!(config.timezone().unwrap(), chrono_tz::Europe::Berlin);
    config.validate().unwrap();
}

#[test]
fn test_missing_file_is_read_error() {
    let err = AppConfig::load(Some(Path::new("/nonexistent/monitor.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn test_malformed_file_is_parse_error() {
    let file = write_config("pacing_threshold = \"high\"");
    let err = AppConfig::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_environment_overrides_file_credentials() {
    let file = write_config("[credentials]\nclient_id = \"from-file\"\n");
    let mut config = AppConfig::load(Some(file.path())).unwrap();

    config.apply_env_from(|key| match key {
        k if k == ENV_CLIENT_ID => Some("from-env".to_string()),
        k if k == ENV_REFRESH_TOKEN => Some("refresh-env".to_string()),
        _ => None,
    });

    assert_eq!(config.credentials.client_id.as_deref(), Some("from-env"));
    assert_eq!(config.credentials.refresh_token.as_deref(), Some("refresh-env"));
    assert!(config.credentials.client_secret.is_none());
}
