//! Monitor configuration
//!
//! Loaded from a TOML file where every field has a default, then overlaid
//! with credentials from the environment.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::discovery::Credentials;

/// Report name shared by the spreadsheet and the checkpoint blob
pub const REPORT_NAME: &str = "Campaigns and budgets";

/// Accounts per run
pub const ACCOUNT_BATCH_SIZE: usize = 50;

/// Daily outbound call quota
pub const DAILY_CALL_QUOTA: usize = 20_000;

/// Per-account time limit in seconds
pub const ACCOUNT_TIMEOUT_SECS: u64 = 30 * 60;

/// Environment variables overriding the configured credentials
pub const ENV_ACCESS_TOKEN: &str = "GOOGLE_ACCESS_TOKEN";
/// See [`ENV_ACCESS_TOKEN`]
pub const ENV_CLIENT_ID: &str = "GOOGLE_CLIENT_ID";
/// See [`ENV_ACCESS_TOKEN`]
pub const ENV_CLIENT_SECRET: &str = "GOOGLE_CLIENT_SECRET";
/// See [`ENV_ACCESS_TOKEN`]
pub const ENV_REFRESH_TOKEN: &str = "GOOGLE_REFRESH_TOKEN";

/// Name of the checkpoint blob
pub fn accounts_file_name() -> String {
    format!("MicrosoftAds-Scripts-{REPORT_NAME}-AccountList.json")
}

/// Name of the daily call quota ledger
pub fn quota_file_name() -> String {
    format!("MicrosoftAds-Scripts-{REPORT_NAME}-QuotaUsage.json")
}

/// Base name of the published spreadsheet
pub fn spreadsheet_file_name() -> String {
    format!("MicrosoftAds-Scripts-{REPORT_NAME}")
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("failed to read config {path}: {message}")]
    Read {
        /// Config path
        path: String,
        /// Underlying error
        message: String,
    },

    /// Config file malformed
    #[error("invalid config: {0}")]
    Parse(String),

    /// Config parsed but unusable
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Where reports go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PublisherKind {
    /// Google Sheets, Drive and Gmail
    #[default]
    Google,
    /// Local CSV files
    Csv,
}

/// Where the checkpoint list lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointBackend {
    /// File in `state_dir`
    #[default]
    Local,
    /// Google Drive document
    Drive,
}

/// Monitor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Summary email recipients
    pub recipients: Vec<String>,
    /// Google API credentials
    pub credentials: Credentials,
    /// Campaigns strictly above this pacing percentage are reported
    pub pacing_threshold: u32,
    /// Locale used for human-facing timestamps
    pub datetime_locale: String,
    /// IANA timezone used for human-facing timestamps
    pub datetime_timezone: String,
    /// Send the summary even when nothing matched
    pub send_email_even_if_no_rows: bool,
    /// One combined section instead of one per account
    pub combine_all_accounts: bool,
    /// New timestamped spreadsheet per run instead of overwriting one
    pub new_spreadsheet_each_run: bool,
    /// Accounts per run
    pub account_batch_size: usize,
    /// Daily outbound call quota
    pub daily_call_quota: usize,
    /// Per-account time limit in seconds; 0 disables it
    pub account_timeout_secs: u64,
    /// Report destination
    pub publisher: PublisherKind,
    /// Directory for the CSV publisher
    pub output_dir: PathBuf,
    /// Directory for local checkpoint blobs
    pub state_dir: PathBuf,
    /// Checkpoint storage
    pub checkpoint_backend: CheckpointBackend,
    /// JSON fixture describing accounts and campaigns
    pub entity_source: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            recipients: Vec::new(),
            credentials: Credentials::default(),
            pacing_threshold: 0,
            datetime_locale: "en-US".to_string(),
            datetime_timezone: "America/New_York".to_string(),
            send_email_even_if_no_rows: false,
            combine_all_accounts: true,
            new_spreadsheet_each_run: true,
            account_batch_size: ACCOUNT_BATCH_SIZE,
            daily_call_quota: DAILY_CALL_QUOTA,
            account_timeout_secs: ACCOUNT_TIMEOUT_SECS,
            publisher: PublisherKind::Google,
            output_dir: PathBuf::from("reports"),
            state_dir: PathBuf::from("state"),
            checkpoint_backend: CheckpointBackend::Local,
            entity_source: PathBuf::from("entities.json"),
        }
    }
}

impl AppConfig {
    /// Parse TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read the file at `path`, or defaults when `path` is `None`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            debug!("No config file given, using defaults");
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_toml(&text)?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Overlay credentials found in the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay credentials using `lookup` for variable values
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let env = Credentials {
            access_token: lookup(ENV_ACCESS_TOKEN),
            client_id: lookup(ENV_CLIENT_ID),
            client_secret: lookup(ENV_CLIENT_SECRET),
            refresh_token: lookup(ENV_REFRESH_TOKEN),
        };
        self.credentials.merge(env);
    }

    /// Configured display timezone
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.datetime_timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Invalid(format!("unknown timezone {}", self.datetime_timezone)))
    }

    /// Per-account time limit, `None` when disabled
    pub fn account_timeout(&self) -> Option<Duration> {
        (self.account_timeout_secs > 0).then(|| Duration::from_secs(self.account_timeout_secs))
    }

    /// Check values that cannot be expressed in the types
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account_batch_size == 0 {
            return Err(ConfigError::Invalid("account_batch_size must be at least 1".to_string()));
        }
        self.timezone()?;
        if self.publisher == PublisherKind::Google && self.recipients.is_empty() {
            return Err(ConfigError::Invalid(
                "the google publisher needs at least one recipient".to_string(),
            ));
        }
        Ok(())
    }

    /// `at` rendered for people, in the configured locale and timezone
    pub fn display_timestamp(&self, at: DateTime<Utc>) -> Result<String, ConfigError> {
        Ok(format_timestamp(at, self.timezone()?, &self.datetime_locale))
    }
}

/// `at` in `tz`, formatted for `locale`
pub fn format_timestamp(at: DateTime<Utc>, tz: Tz, locale: &str) -> String {
    let local = at.with_timezone(&tz);
    match locale_format(locale) {
        Some(format) => local.format(format).to_string(),
        None => local.to_rfc3339(),
    }
}

/// strftime pattern for a locale, `None` for locales rendered as RFC 3339
pub fn locale_format(locale: &str) -> Option<&'static str> {
    match locale {
        "en-US" => Some("%-m/%-d/%Y, %-I:%M:%S %p"),
        "en-GB" => Some("%d/%m/%Y, %H:%M:%S"),
        "de-DE" => Some("%-d.%-m.%Y, %H:%M:%S"),
        "fr-FR" => Some("%d/%m/%Y %H:%M:%S"),
        "ja-JP" => Some("%Y/%-m/%-d %-H:%M:%S"),
        _ => None,
    }
}
