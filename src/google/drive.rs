//! Drive files addressed by name

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use super::GoogleServices;
use crate::discovery::{ServiceHandle, UploadParams};
use crate::report::{PublishError, PublishResult};
use crate::resume::{BlobStore, ResumeError, ResumeResult};

/// Native spreadsheet
pub const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";
/// Native text document
pub const DOCUMENT_MIME_TYPE: &str = "application/vnd.google-apps.document";

/// Drive search expression matching files named `name`, percent-encoded for the query string
pub fn name_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    urlencoding::encode(&format!("name = '{escaped}'")).into_owned()
}

/// Id of the first file named `name`
pub async fn find_file_id(drive: &ServiceHandle, name: &str) -> PublishResult<Option<String>> {
    let response = drive.invoke("files.list", &[("q", name_query(name))], None).await?;
    let files = response
        .json()
        .get("files")
        .and_then(|f| f.as_array())
        .ok_or_else(|| PublishError::UnexpectedResponse(format!("files.list without files: {}", response.body)))?;

    Ok(files
        .first()
        .and_then(|f| f.get("id"))
        .and_then(|id| id.as_str())
        .map(str::to_string))
}

/// Id of the file named `name`, creating an empty one of `mime_type` if none exists
pub async fn create_file_if_not_exists(drive: &ServiceHandle, name: &str, mime_type: &str) -> PublishResult<String> {
    if let Some(id) = find_file_id(drive, name).await? {
        debug!(name, file_id = %id, "Found existing file");
        return Ok(id);
    }

    let response = drive
        .invoke("files.create", &[], Some(json!({ "name": name, "mimeType": mime_type })))
        .await?;
    let id = response
        .json()
        .get("id")
        .and_then(|id| id.as_str())
        .ok_or_else(|| PublishError::UnexpectedResponse(format!("files.create without id: {}", response.body)))?;

    info!(name, file_id = %id, "Created file");
    Ok(id.to_string())
}

/// Make the file readable by anyone with the link and return the link
pub async fn share_with_link(drive: &ServiceHandle, file_id: &str) -> PublishResult<String> {
    drive
        .invoke(
            "permissions.create",
            &[("fileId", file_id.to_string())],
            Some(json!({ "type": "anyone", "role": "reader", "allowFileDiscovery": false })),
        )
        .await?;

    let response = drive
        .invoke(
            "files.get",
            &[("fileId", file_id.to_string()), ("fields", "webViewLink".to_string())],
            None,
        )
        .await?;

    response
        .json()
        .get("webViewLink")
        .and_then(|l| l.as_str())
        .map(str::to_string)
        .ok_or_else(|| PublishError::UnexpectedResponse(format!("files.get without webViewLink: {}", response.body)))
}

/// Document contents as plain text
pub async fn export_text(drive: &ServiceHandle, file_id: &str) -> PublishResult<String> {
    let response = drive
        .invoke(
            "files.export",
            &[("fileId", file_id.to_string()), ("mimeType", "text/plain".to_string())],
            None,
        )
        .await?;
    Ok(response.body)
}

/// Overwrite the file's contents with `text`
pub async fn update_text(drive: &ServiceHandle, file_id: &str, text: &str) -> PublishResult<()> {
    drive
        .invoke_upload(
            "files.update",
            &[("fileId", file_id.to_string())],
            text.as_bytes().to_vec(),
            &UploadParams::simple("text/plain"),
        )
        .await?;
    Ok(())
}

/// Checkpoint blobs kept as Drive documents
#[derive(Clone)]
pub struct DriveBlobStore {
    services: Arc<GoogleServices>,
}

impl DriveBlobStore {
    /// Store backed by the Drive service in `services`
    pub fn new(services: Arc<GoogleServices>) -> Self {
        Self { services }
    }
}

fn remote(e: impl std::fmt::Display) -> ResumeError {
    ResumeError::Remote(e.to_string())
}

#[async_trait]
impl BlobStore for DriveBlobStore {
    async fn read(&self, name: &str) -> ResumeResult<Option<String>> {
        let drive = self.services.drive().await.map_err(remote)?;
        let Some(file_id) = find_file_id(drive, name).await.map_err(remote)? else {
            return Ok(None);
        };
        let text = export_text(drive, &file_id).await.map_err(remote)?;
        Ok(Some(text.trim_start_matches('\u{feff}').trim().to_string()))
    }

    async fn write(&self, name: &str, contents: &str) -> ResumeResult<()> {
        let drive = self.services.drive().await.map_err(remote)?;
        let file_id = create_file_if_not_exists(drive, name, DOCUMENT_MIME_TYPE)
            .await
            .map_err(remote)?;
        update_text(drive, &file_id, contents).await.map_err(remote)
    }
}
