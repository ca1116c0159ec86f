//! CLI command implementations

pub mod error;
pub mod operations;
pub mod run;
pub mod status;

pub use error::CliError;
pub use operations::OperationsArgs;
pub use run::{Cli, Commands, RunArgs};

use std::path::Path;
use std::sync::Arc;

use crate::config::{self, AppConfig, CheckpointBackend};
use crate::discovery::ServiceBuilder;
use crate::google::{DiscoveryUrls, DriveBlobStore, GoogleServices};
use crate::quota::{CallBudget, DailyQuotaLedger};
use crate::resume::{BlobStore, CheckpointStore, LocalBlobStore};

/// Load the config file (or defaults) and overlay environment credentials
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, CliError> {
    let mut config = AppConfig::load(path)?;
    config.apply_env();
    Ok(config)
}

/// Google services charged against `budget`
pub fn google_services(config: &AppConfig, budget: &CallBudget) -> Arc<GoogleServices> {
    let builder = ServiceBuilder::new().with_call_budget(budget.clone());
    Arc::new(GoogleServices::new(
        builder,
        config.credentials.clone(),
        DiscoveryUrls::default(),
    ))
}

/// Today's call quota, kept next to local checkpoints whatever the backend
///
/// Reading it must not spend quota, so it never goes through Drive.
pub async fn quota_ledger(config: &AppConfig) -> Result<DailyQuotaLedger<LocalBlobStore>, CliError> {
    let ledger = DailyQuotaLedger::load(
        LocalBlobStore::new(&config.state_dir),
        config::quota_file_name(),
        config.daily_call_quota,
        chrono::Utc::now().date_naive(),
    )
    .await?;
    Ok(ledger)
}

/// Checkpoint store for the configured backend
pub fn checkpoint_store(
    config: &AppConfig,
    services: &Arc<GoogleServices>,
) -> CheckpointStore<Arc<dyn BlobStore>> {
    let blobs: Arc<dyn BlobStore> = match config.checkpoint_backend {
        CheckpointBackend::Local => Arc::new(LocalBlobStore::new(&config.state_dir)),
        CheckpointBackend::Drive => Arc::new(DriveBlobStore::new(services.clone())),
    };
    CheckpointStore::new(blobs, config::accounts_file_name())
}
