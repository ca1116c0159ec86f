//! Operations command: inspect a discovery document

use clap::Args;
use std::path::Path;

use super::{load_config, CliError};
use crate::discovery::{Operation, ServiceBuilder};

/// Operations command arguments
#[derive(Args, Debug)]
pub struct OperationsArgs {
    /// Discovery document URL
    #[arg(long)]
    pub discovery_url: String,
}

/// `name  METHOD  path` per operation
pub fn render_operations<'a>(operations: impl Iterator<Item = (&'a str, &'a Operation)>) -> String {
    let mut out = String::new();
    for (name, op) in operations {
        out.push_str(&format!("{:<40}  {:<6}  {}\n", name, op.http_method, op.path));
    }
    out
}

impl OperationsArgs {
    /// Build the service and print its operations
    pub async fn execute(&self, config_path: Option<&Path>) -> Result<(), CliError> {
        let config = load_config(config_path)?;
        let service = ServiceBuilder::new()
            .build(&self.discovery_url, &config.credentials)
            .await?;
        print!("{}", render_operations(service.operations()));
        Ok(())
    }
}
