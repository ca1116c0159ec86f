//! Service construction and operation dispatch
//!
//! [`ServiceBuilder::build`] fetches a discovery document, resolves an access
//! token once and returns a [`ServiceHandle`]. The handle indexes every
//! operation of the resource tree by dotted path and dispatches calls through
//! [`ServiceHandle::invoke`]. The bound token is never refreshed; rebuild the
//! service to pick up a new one.

use indexmap::IndexMap;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::document::{Operation, ServiceDescriptor};
use super::request::{classify_response, ApiResponse, Endpoint, RequestBody, UploadParams};
use super::shared_resources::global_http_client;
use super::token::{Credentials, TokenProvider};
use super::{DiscoveryError, DiscoveryResult};
use crate::metrics;
use crate::quota::CallBudget;

/// Builds [`ServiceHandle`]s from discovery documents
#[derive(Clone)]
pub struct ServiceBuilder {
    client: Arc<Client>,
    tokens: TokenProvider,
    budget: Option<CallBudget>,
}

impl Default for ServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceBuilder {
    /// Builder using the global HTTP client and the default token endpoint
    pub fn new() -> Self {
        Self {
            client: global_http_client(),
            tokens: TokenProvider::default(),
            budget: None,
        }
    }

    /// Use a specific HTTP client
    pub fn with_client(mut self, client: Arc<Client>) -> Self {
        self.client = client;
        self
    }

    /// Use a specific token provider
    pub fn with_token_provider(mut self, tokens: TokenProvider) -> Self {
        self.tokens = tokens;
        self
    }

    /// Charge discovery fetches and operation calls against `budget`
    pub fn with_call_budget(mut self, budget: CallBudget) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Fetch the descriptor at `descriptor_url` and bind it to a fresh token
    ///
    /// # Errors
    /// - [`DiscoveryError::DiscoveryFetch`] on network failure, non-2xx status or non-JSON body
    /// - [`DiscoveryError::Auth`] when no token can be obtained
    pub async fn build(&self, descriptor_url: &str, credentials: &Credentials) -> DiscoveryResult<ServiceHandle> {
        info!(url = %descriptor_url, "Fetching discovery document");

        if let Some(budget) = &self.budget {
            budget.consume(1)?;
        }

        let response = self
            .client
            .get(descriptor_url)
            .send()
            .await
            .map_err(|e| DiscoveryError::DiscoveryFetch(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DiscoveryError::DiscoveryFetch(e.to_string()))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Discovery document request failed");
            return Err(DiscoveryError::DiscoveryFetch(format!("status {status}: {text}")));
        }

        let descriptor = ServiceDescriptor::from_json(&text)?;
        self.build_from_descriptor(descriptor, credentials).await
    }

    /// Bind an already-parsed descriptor to a fresh token
    pub async fn build_from_descriptor(
        &self,
        descriptor: ServiceDescriptor,
        credentials: &Credentials,
    ) -> DiscoveryResult<ServiceHandle> {
        let access_token = self.tokens.get_access_token(credentials).await?;
        let operations = descriptor.operations();

        debug!(
            root_url = %descriptor.root_url,
            operations = operations.len(),
            "Service built"
        );

        Ok(ServiceHandle {
            inner: Arc::new(ServiceInner {
                descriptor,
                operations,
                access_token,
                client: self.client.clone(),
                budget: self.budget.clone(),
            }),
        })
    }
}

struct ServiceInner {
    descriptor: ServiceDescriptor,
    operations: IndexMap<String, Operation>,
    access_token: String,
    client: Arc<Client>,
    budget: Option<CallBudget>,
}

/// Callable view of one discovery document; cheap to clone
#[derive(Clone)]
pub struct ServiceHandle {
    inner: Arc<ServiceInner>,
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("root_url", &self.inner.descriptor.root_url)
            .field("operations", &self.inner.operations.len())
            .finish()
    }
}

impl ServiceHandle {
    /// Descriptor this handle was built from
    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.inner.descriptor
    }

    /// All operations with their dotted paths, in document order
    pub fn operations(&self) -> impl Iterator<Item = (&str, &Operation)> {
        self.inner.operations.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Look up an operation by dotted path
    pub fn operation(&self, name: &str) -> DiscoveryResult<&Operation> {
        self.inner
            .operations
            .get(name)
            .ok_or_else(|| DiscoveryError::UnknownOperation(name.to_string()))
    }

    fn endpoint(&self) -> Endpoint<'_> {
        let descriptor = &self.inner.descriptor;
        Endpoint {
            root_url: &descriptor.root_url,
            service_path: &descriptor.service_path,
            standard_parameters: &descriptor.parameters,
        }
    }

    /// Invoke a non-upload operation with an optional JSON body
    pub async fn invoke(
        &self,
        operation: &str,
        url_params: &[(&str, String)],
        body: Option<Value>,
    ) -> DiscoveryResult<ApiResponse> {
        self.call(operation, url_params, RequestBody::Json(body), None).await
    }

    /// Invoke a media-upload operation; `media` is sent unmodified
    pub async fn invoke_upload(
        &self,
        operation: &str,
        url_params: &[(&str, String)],
        media: Vec<u8>,
        upload: &UploadParams,
    ) -> DiscoveryResult<ApiResponse> {
        self.call(operation, url_params, RequestBody::Media(media), Some(upload)).await
    }

    /// Resolve, send and classify one call
    ///
    /// Transport errors propagate as [`DiscoveryError::Http`]; a non-2xx
    /// status is [`DiscoveryError::Api`] carrying the raw body.
    pub async fn call(
        &self,
        operation: &str,
        url_params: &[(&str, String)],
        body: RequestBody,
        upload: Option<&UploadParams>,
    ) -> DiscoveryResult<ApiResponse> {
        let op = self.operation(operation)?;
        let prepared = self.endpoint().prepare(operation, op, url_params, body, upload)?;

        if let Some(budget) = &self.inner.budget {
            budget.consume(1)?;
            metrics::record_quota_remaining(budget.remaining());
        }

        debug!(operation, method = %prepared.method, url = %prepared.url, "Invoking operation");

        let mut request = self
            .inner
            .client
            .request(prepared.method, &prepared.url)
            .bearer_auth(&self.inner.access_token);
        if let Some(content_type) = prepared.content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }
        if let Some(payload) = prepared.payload {
            request = request.body(payload);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        metrics::record_api_request(operation, status);

        let result = classify_response(status, body);
        if let Err(DiscoveryError::Api { status, .. }) = &result {
            warn!(operation, status, "Operation returned non-success status");
        }
        result
    }
}
