//! Typed discovery document
//!
//! Only the subset of the discovery format the client needs is modelled:
//! root URL, service path, parameter rules, the resource tree and each
//! operation's path template and media upload protocols.

use indexmap::IndexMap;
use serde::Deserialize;

use super::{DiscoveryError, DiscoveryResult};

/// Parsed discovery document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    /// Root URL of the service (e.g., `https://www.googleapis.com/`)
    pub root_url: String,
    /// Path appended to the root URL for relative path templates
    #[serde(default)]
    pub service_path: String,
    /// Standard parameters accepted by every operation
    #[serde(default)]
    pub parameters: IndexMap<String, ParameterRule>,
    /// Top-level resources
    #[serde(default)]
    pub resources: IndexMap<String, Resource>,
    /// Top-level operations
    #[serde(default)]
    pub methods: IndexMap<String, Operation>,
}

/// Node of the resource tree
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resource {
    /// Nested resources
    #[serde(default)]
    pub resources: IndexMap<String, Resource>,
    /// Operations declared on this resource
    #[serde(default)]
    pub methods: IndexMap<String, Operation>,
}

/// A single remote operation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Fully qualified id from the document, if present
    #[serde(default)]
    pub id: Option<String>,
    /// HTTP method (e.g., `GET`)
    pub http_method: String,
    /// Path template with `{name}` placeholders
    pub path: String,
    /// Operation-specific parameter rules (override the standard ones)
    #[serde(default)]
    pub parameters: IndexMap<String, ParameterRule>,
    /// Whether the operation accepts media uploads
    #[serde(default)]
    pub supports_media_upload: bool,
    /// Media upload protocols
    #[serde(default)]
    pub media_upload: Option<MediaUpload>,
}

/// Parameter rule
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParameterRule {
    /// Declared location; validated when the parameter is used
    #[serde(default)]
    pub location: String,
    /// Whether the parameter must be supplied
    #[serde(default)]
    pub required: bool,
}

/// Where a parameter goes in the request URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLocation {
    /// Substituted into a `{name}` placeholder
    Path,
    /// Appended as `name=value`
    Query,
}

impl ParameterRule {
    /// Classify the rule's location
    pub fn classify(&self, name: &str) -> DiscoveryResult<ParameterLocation> {
        match self.location.as_str() {
            "path" => Ok(ParameterLocation::Path),
            "query" => Ok(ParameterLocation::Query),
            other => Err(DiscoveryError::UnknownParameterLocation {
                name: name.to_string(),
                location: other.to_string(),
            }),
        }
    }
}

/// Media upload descriptor
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaUpload {
    /// Supported protocols
    #[serde(default)]
    pub protocols: MediaProtocols,
}

/// Upload protocols declared by an operation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaProtocols {
    /// Single-request upload
    #[serde(default)]
    pub simple: Option<UploadProtocol>,
    /// Resumable upload session
    #[serde(default)]
    pub resumable: Option<UploadProtocol>,
}

/// Path template of one upload protocol
#[derive(Debug, Clone, Deserialize)]
pub struct UploadProtocol {
    /// Path template used for this protocol
    pub path: String,
}

impl ServiceDescriptor {
    /// Parse a discovery document from JSON text
    pub fn from_json(text: &str) -> DiscoveryResult<Self> {
        serde_json::from_str(text).map_err(|e| DiscoveryError::DiscoveryFetch(e.to_string()))
    }

    /// Walk the resource tree and collect every operation under its dotted path
    ///
    /// Top-level methods are keyed by their bare name; nested ones by
    /// `resource.sub.method`.
    pub fn operations(&self) -> IndexMap<String, Operation> {
        let mut out = IndexMap::new();
        collect(&self.resources, &self.methods, "", &mut out);
        out
    }
}

fn collect(
    resources: &IndexMap<String, Resource>,
    methods: &IndexMap<String, Operation>,
    prefix: &str,
    out: &mut IndexMap<String, Operation>,
) {
    for (name, resource) in resources {
        let path = format!("{prefix}{name}.");
        collect(&resource.resources, &resource.methods, &path, out);
    }
    for (name, operation) in methods {
        out.insert(format!("{prefix}{name}"), operation.clone());
    }
}
