//! Identity gateway: one validated tenant configuration plus the outbound calls built on it.
//!
//! The gateway starts uninitialized. [`IdentityGateway::init`] loads and validates the tenant
//! record exactly once; every other operation refuses to run before that, without touching
//! the network. Management API calls fetch a fresh client-credentials token each time.

mod error;
mod management;

use std::{sync::Arc, time::Duration};

use idp_broker_core::{
    ConfigSummary, DEFAULT_REDIRECT_URI, OAuthTokenSet, TenantConfigStore, ValidatedTenantConfig,
    load_validated,
};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

pub use error::{GatewayError, ProviderFailure};
pub use management::DEFAULT_TICKET_TTL_SECS;
use error::provider_message;

pub const DEFAULT_USER_CONNECTION: &str = "Username-Password-Authentication";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub redirect_uri: String,
    /// Database connection new users are created in.
    pub user_connection: String,
    pub http_timeout: Duration,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            user_connection: DEFAULT_USER_CONNECTION.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

struct Session {
    tenant_key: String,
    config: ValidatedTenantConfig,
}

pub struct IdentityGateway {
    store: Arc<dyn TenantConfigStore>,
    http: Client,
    options: GatewayOptions,
    session: OnceCell<Session>,
}

#[derive(Deserialize)]
struct ManagementTokenResponse {
    access_token: String,
}

impl IdentityGateway {
    pub fn new(
        store: Arc<dyn TenantConfigStore>,
        options: GatewayOptions,
    ) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(options.http_timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(options.http_timeout))
            .build()
            .map_err(GatewayError::HttpClient)?;
        Ok(Self::with_client(store, options, http))
    }

    pub fn with_client(
        store: Arc<dyn TenantConfigStore>,
        options: GatewayOptions,
        http: Client,
    ) -> Self {
        Self {
            store,
            http,
            options,
            session: OnceCell::new(),
        }
    }

    pub fn options(&self) -> &GatewayOptions {
        &self.options
    }

    /// Load and validate the tenant's configuration.
    ///
    /// Concurrent callers share a single store read. Calling again with the same key returns
    /// the existing summary; a different key is rejected. A failed attempt leaves the gateway
    /// uninitialized so a later call can retry.
    pub async fn init(&self, tenant_key: &str) -> Result<ConfigSummary, GatewayError> {
        let session = self
            .session
            .get_or_try_init(|| async {
                match load_validated(self.store.as_ref(), tenant_key).await {
                    Ok(config) => {
                        info!(
                            target: "idp.gateway",
                            tenant = tenant_key,
                            domain = %config.domain(),
                            "identity gateway initialized"
                        );
                        Ok(Session {
                            tenant_key: tenant_key.to_string(),
                            config,
                        })
                    }
                    Err(source) => {
                        warn!(
                            target: "idp.gateway",
                            tenant = tenant_key,
                            error = %source,
                            "identity gateway initialization failed"
                        );
                        Err(GatewayError::Init {
                            tenant_key: tenant_key.to_string(),
                            source,
                        })
                    }
                }
            })
            .await?;

        if session.tenant_key != tenant_key {
            return Err(GatewayError::AlreadyInitialized {
                current: session.tenant_key.clone(),
                requested: tenant_key.to_string(),
            });
        }
        Ok(session.config.summary(&self.options.redirect_uri))
    }

    pub fn is_ready(&self) -> bool {
        self.session.initialized()
    }

    pub fn tenant_key(&self) -> Option<&str> {
        self.session.get().map(|session| session.tenant_key.as_str())
    }

    pub fn config(&self) -> Result<ConfigSummary, GatewayError> {
        Ok(self.session()?.summary(&self.options.redirect_uri))
    }

    fn session(&self) -> Result<&ValidatedTenantConfig, GatewayError> {
        self.session
            .get()
            .map(|session| &session.config)
            .ok_or(GatewayError::NotInitialized)
    }

    /// Authorization-code URL with `client_id`, `redirect_uri`, `response_type`, `scope` and
    /// `state` query parameters, in that order.
    pub fn generate_authorization_url(
        &self,
        state: &str,
        scope: &str,
    ) -> Result<String, GatewayError> {
        let config = self.session()?;
        let mut url = parse_endpoint(config.authorization_url())?;
        url.query_pairs_mut()
            .append_pair("client_id", config.client_id())
            .append_pair("redirect_uri", &self.options.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", scope)
            .append_pair("state", state);
        Ok(url.into())
    }

    pub async fn exchange_code_for_token(&self, code: &str) -> Result<OAuthTokenSet, GatewayError> {
        let config = self.session()?;
        debug!(target: "idp.gateway", operation = "exchange_code", "requesting tokens");
        let payload = json!({
            "client_id": config.client_id(),
            "client_secret": config.client_secret(),
            "audience": config.api_audience(),
            "grant_type": "authorization_code",
            "code": code,
            "redirect_uri": self.options.redirect_uri,
        });
        send_json(self.http.post(config.token_endpoint()).json(&payload))
            .await
            .map_err(|cause| GatewayError::provider("exchange code for token", cause))
    }

    /// Client-credentials token for the Management API. Never cached.
    pub async fn get_management_token(&self) -> Result<String, GatewayError> {
        let config = self.session()?;
        self.request_management_token(config)
            .await
            .map_err(|cause| GatewayError::provider("obtain management token", cause))
    }

    pub async fn get_user_info(&self, access_token: &str) -> Result<Value, GatewayError> {
        let config = self.session()?;
        send_json(
            self.http
                .get(config.user_info_endpoint())
                .bearer_auth(access_token),
        )
        .await
        .map_err(|cause| GatewayError::provider("fetch user info", cause))
    }

    async fn request_management_token(
        &self,
        config: &ValidatedTenantConfig,
    ) -> Result<String, ProviderFailure> {
        let payload = json!({
            "client_id": config.client_id(),
            "client_secret": config.client_secret(),
            "audience": config.management_api_endpoint(),
            "grant_type": "client_credentials",
        });
        let response: ManagementTokenResponse =
            send_json(self.http.post(config.token_endpoint()).json(&payload)).await?;
        if response.access_token.is_empty() {
            return Err(ProviderFailure::InvalidResponse(
                "token response carried an empty access_token".into(),
            ));
        }
        Ok(response.access_token)
    }

    /// Management token for a dependent call, with failures tagged as token failures.
    async fn management_token(
        &self,
        config: &ValidatedTenantConfig,
    ) -> Result<String, ProviderFailure> {
        self.request_management_token(config)
            .await
            .map_err(|err| ProviderFailure::ManagementToken(Box::new(err)))
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, GatewayError> {
    Url::parse(raw).map_err(|source| GatewayError::InvalidEndpoint {
        url: raw.to_string(),
        source,
    })
}

async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ProviderFailure> {
    let response = builder
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderFailure::Status {
            status,
            message: provider_message(status, &body),
        });
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| ProviderFailure::InvalidResponse(err.to_string()))
}

/// Like [`send_json`] for calls whose success body is irrelevant or empty.
async fn send_discarding_body(builder: RequestBuilder) -> Result<(), ProviderFailure> {
    let response = builder.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderFailure::Status {
            status,
            message: provider_message(status, &body),
        });
    }
    Ok(())
}
