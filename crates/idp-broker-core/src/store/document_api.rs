use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use super::{ConfigFetchError, TenantConfigStore, check_tenant_key};
use crate::tenant::TenantIdentityConfig;

pub const DEFAULT_DATABASE_ID: &str = "mcp_hub";
pub const DEFAULT_COLLECTION_ID: &str = "auth0_projects";

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const API_KEY_HEADER: &str = "X-Appwrite-Key";

/// Connection settings for an Appwrite-compatible document database.
#[derive(Clone)]
pub struct DocumentApiOptions {
    /// API root, e.g. `https://cloud.appwrite.io/v1`.
    pub endpoint: String,
    pub project_id: String,
    pub api_key: String,
    pub database_id: String,
    pub collection_id: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for DocumentApiOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentApiOptions")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .field("database_id", &self.database_id)
            .field("collection_id", &self.collection_id)
            .finish_non_exhaustive()
    }
}

impl DocumentApiOptions {
    pub fn new(
        endpoint: impl Into<String>,
        project_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            project_id: project_id.into(),
            api_key: api_key.into(),
            database_id: DEFAULT_DATABASE_ID.to_string(),
            collection_id: DEFAULT_COLLECTION_ID.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Tenant store backed by a remote document database's REST API.
pub struct DocumentApiStore {
    http: Client,
    base_url: Url,
    options: DocumentApiOptions,
}

impl DocumentApiStore {
    pub fn new(options: DocumentApiOptions) -> Result<Self, ConfigFetchError> {
        let http = Client::builder().timeout(options.timeout).build()?;
        Self::with_client(options, http)
    }

    pub fn with_client(
        options: DocumentApiOptions,
        http: Client,
    ) -> Result<Self, ConfigFetchError> {
        let base_url = Url::parse(options.endpoint.trim_end_matches('/')).map_err(|err| {
            ConfigFetchError::Unavailable(format!("invalid document endpoint: {err}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigFetchError::Unavailable(format!(
                "document endpoint `{}` cannot be used as a base url",
                options.endpoint
            )));
        }
        Ok(Self {
            http,
            base_url,
            options,
        })
    }

    fn document_url(&self, tenant_key: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "databases",
                self.options.database_id.as_str(),
                "collections",
                self.options.collection_id.as_str(),
                "documents",
                tenant_key,
            ]);
        }
        url
    }
}

#[async_trait]
impl TenantConfigStore for DocumentApiStore {
    async fn fetch(&self, tenant_key: &str) -> Result<TenantIdentityConfig, ConfigFetchError> {
        let tenant_key = check_tenant_key(tenant_key)?;
        let url = self.document_url(tenant_key);
        tracing::debug!(
            target: "idp.store",
            tenant = tenant_key,
            database = %self.options.database_id,
            collection = %self.options.collection_id,
            "fetching tenant document"
        );

        let response = self
            .http
            .get(url)
            .header(PROJECT_HEADER, &self.options.project_id)
            .header(API_KEY_HEADER, &self.options.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ConfigFetchError::NotFound(tenant_key.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|value| {
                    value
                        .get("message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .unwrap_or(body);
            return Err(ConfigFetchError::Unavailable(format!(
                "document api returned {status}: {message}"
            )));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
