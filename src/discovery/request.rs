//! Request construction for a single operation call
//!
//! Everything here is pure: path template selection, parameter substitution,
//! URL assembly, payload encoding and response classification. The transport
//! lives in [`super::service::ServiceHandle`].

use indexmap::IndexMap;
use serde_json::Value;
use std::str::FromStr;

use super::document::{Operation, ParameterLocation, ParameterRule};
use super::{DiscoveryError, DiscoveryResult};

/// Media upload protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadType {
    /// Single-request upload
    Simple,
    /// Resumable upload session
    Resumable,
}

impl UploadType {
    /// Value of the `uploadType` query argument
    pub fn query_value(&self) -> &'static str {
        match self {
            UploadType::Simple => "media",
            UploadType::Resumable => "resumable",
        }
    }
}

impl FromStr for UploadType {
    type Err = DiscoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(UploadType::Simple),
            "resumable" => Ok(UploadType::Resumable),
            other => Err(DiscoveryError::UnsupportedUploadType(other.to_string())),
        }
    }
}

/// Caller-supplied upload parameters
#[derive(Debug, Clone)]
pub struct UploadParams {
    /// `simple` or `resumable`
    pub upload_type: String,
    /// Content type of the uploaded payload
    pub content_type: String,
}

impl UploadParams {
    /// Simple upload with the given content type
    pub fn simple(content_type: impl Into<String>) -> Self {
        Self {
            upload_type: "simple".to_string(),
            content_type: content_type.into(),
        }
    }
}

/// Body of an operation call
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// JSON-serialized resource; `None` sends no payload
    Json(Option<Value>),
    /// Media passed through unmodified with the upload's content type
    Media(Vec<u8>),
}

/// Fully resolved request, ready for the transport
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// HTTP method
    pub method: reqwest::Method,
    /// Absolute URL including the query string
    pub url: String,
    /// Content type header, when a payload is sent
    pub content_type: Option<String>,
    /// Encoded payload
    pub payload: Option<Vec<u8>>,
}

/// Service-wide context shared by every operation of a descriptor
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    /// Descriptor root URL
    pub root_url: &'a str,
    /// Descriptor service path
    pub service_path: &'a str,
    /// Standard parameter rules
    pub standard_parameters: &'a IndexMap<String, ParameterRule>,
}

impl<'a> Endpoint<'a> {
    /// Build the request for one call of `operation`
    pub fn prepare(
        &self,
        name: &str,
        operation: &Operation,
        url_params: &[(&str, String)],
        body: RequestBody,
        upload: Option<&UploadParams>,
    ) -> DiscoveryResult<PreparedRequest> {
        let method = reqwest::Method::from_bytes(operation.http_method.as_bytes()).map_err(|_| {
            DiscoveryError::InvalidDescriptor(format!(
                "operation {name} has invalid HTTP method {}",
                operation.http_method
            ))
        })?;

        let url = self.build_url(name, operation, url_params, upload)?;

        let (content_type, payload) = match (upload, body) {
            (Some(upload), RequestBody::Media(bytes)) => (Some(upload.content_type.clone()), Some(bytes)),
            (Some(upload), RequestBody::Json(value)) => {
                let bytes = value.map(|v| encode_json(&v)).transpose()?;
                (Some(upload.content_type.clone()), bytes)
            }
            (None, RequestBody::Json(None)) => (None, None),
            (None, RequestBody::Json(Some(value))) => {
                (Some("application/json".to_string()), Some(encode_json(&value)?))
            }
            (None, RequestBody::Media(_)) => {
                return Err(DiscoveryError::Serialization(format!(
                    "media payload for {name} requires upload parameters"
                )))
            }
        };

        Ok(PreparedRequest {
            method,
            url,
            content_type,
            payload,
        })
    }

    /// Select the path template, substitute parameters and assemble the URL
    pub fn build_url(
        &self,
        name: &str,
        operation: &Operation,
        url_params: &[(&str, String)],
        upload: Option<&UploadParams>,
    ) -> DiscoveryResult<String> {
        let upload_type = upload
            .map(|u| select_upload_type(name, operation, &u.upload_type))
            .transpose()?;

        let mut path = match upload_type {
            None => operation.path.clone(),
            Some(upload_type) => upload_path(operation, upload_type)?,
        };

        let mut query: Vec<String> = Vec::new();
        for (param, value) in url_params {
            let rule = operation
                .parameters
                .get(*param)
                .or_else(|| self.standard_parameters.get(*param))
                .ok_or_else(|| DiscoveryError::UnknownParameter {
                    operation: name.to_string(),
                    name: param.to_string(),
                })?;

            match rule.classify(param)? {
                ParameterLocation::Path => {
                    path = path.replacen(&format!("{{{param}}}"), value, 1);
                }
                ParameterLocation::Query => query.push(format!("{param}={value}")),
            }
        }

        if let Some(upload_type) = upload_type {
            query.push(format!("uploadType={}", upload_type.query_value()));
        }

        let mut url = match path.strip_prefix('/') {
            Some(absolute) if self.root_url.ends_with('/') => format!("{}{absolute}", self.root_url),
            Some(_) => format!("{}{path}", self.root_url),
            None => format!("{}{}{path}", self.root_url, self.service_path),
        };

        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }

        Ok(url)
    }
}

fn select_upload_type(name: &str, operation: &Operation, requested: &str) -> DiscoveryResult<UploadType> {
    if !operation.supports_media_upload || operation.media_upload.is_none() {
        return Err(DiscoveryError::UnsupportedUpload(name.to_string()));
    }
    requested.parse()
}

fn upload_path(operation: &Operation, upload_type: UploadType) -> DiscoveryResult<String> {
    let protocols = operation
        .media_upload
        .as_ref()
        .map(|m| &m.protocols)
        .ok_or_else(|| DiscoveryError::UnsupportedUploadType(format!("{upload_type:?}")))?;

    let (protocol, label) = match upload_type {
        UploadType::Simple => (protocols.simple.as_ref(), "simple"),
        UploadType::Resumable => (protocols.resumable.as_ref(), "resumable"),
    };

    protocol
        .map(|p| p.path.clone())
        .ok_or_else(|| DiscoveryError::UnsupportedUploadType(label.to_string()))
}

fn encode_json(value: &Value) -> DiscoveryResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| DiscoveryError::Serialization(e.to_string()))
}

/// Response of a successful operation call
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// Parsed JSON body, `None` when the body is not JSON
    pub result: Option<Value>,
    /// Raw response body
    pub body: String,
    /// HTTP status code
    pub status: u16,
}

impl ApiResponse {
    /// Parsed body, or `Value::Null` when the body was not JSON
    pub fn json(&self) -> &Value {
        self.result.as_ref().unwrap_or(&Value::Null)
    }
}

/// Classify a raw response as success (2xx) or [`DiscoveryError::Api`]
pub fn classify_response(status: u16, body: String) -> DiscoveryResult<ApiResponse> {
    if (200..=299).contains(&status) {
        let result = serde_json::from_str(&body).ok();
        Ok(ApiResponse { result, body, status })
    } else {
        Err(DiscoveryError::Api { status, body })
    }
}
