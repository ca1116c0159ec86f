//! Status command: the rotation as the next run would see it

use std::path::Path;

use super::{checkpoint_store, google_services, load_config, CliError};
use crate::quota::CallBudget;
use crate::resume::CheckpointList;

/// Stored checkpoints, oldest first
pub async fn load_rotation(config_path: Option<&Path>) -> Result<CheckpointList, CliError> {
    let config = load_config(config_path)?;
    let budget = CallBudget::new(config.daily_call_quota);
    let services = google_services(&config, &budget);

    let mut list = checkpoint_store(&config, &services).load().await?;
    list.sort_oldest_first();
    Ok(list)
}

/// One line per account: position, id and last check (or `never`)
pub fn render_rotation(list: &CheckpointList) -> String {
    let mut out = String::new();
    for (position, checkpoint) in list.iter().enumerate() {
        let last = if checkpoint.is_unchecked() {
            "never"
        } else {
            checkpoint.last_checked.as_str()
        };
        out.push_str(&format!("{:>4}  {:<20}  {}\n", position + 1, checkpoint.id, last));
    }
    out
}

/// Print the stored rotation
pub async fn execute(config_path: Option<&Path>) -> Result<(), CliError> {
    let list = load_rotation(config_path).await?;
    if list.is_empty() {
        println!("No accounts stored yet");
    } else {
        print!("{}", render_rotation(&list));
    }
    Ok(())
}
