use std::{env, path::PathBuf, sync::Arc, time::Duration};

use idp_broker_core::{
    ConfigFetchError, DEFAULT_REDIRECT_URI, DocumentApiOptions, DocumentApiStore,
    FileTenantStore, TenantConfigStore,
    store::document_api::{DEFAULT_COLLECTION_ID, DEFAULT_DATABASE_ID},
};
use url::Url;

use crate::{
    gateway::{
        DEFAULT_HTTP_TIMEOUT, DEFAULT_TICKET_TTL_SECS, DEFAULT_USER_CONNECTION, GatewayOptions,
    },
    handlers::PasswordResetTickets,
    http::DEFAULT_REQUEST_TIMEOUT,
};

pub const DEFAULT_TENANT_KEY: &str = "default";
const DEFAULT_TENANT_DIR: &str = "./tenants";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("tenant store error: {0}")]
    Store(#[from] ConfigFetchError),
}

/// Where tenant records are read from.
#[derive(Debug, Clone)]
pub enum TenantSource {
    DocumentApi(DocumentApiOptions),
    Directory(PathBuf),
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub tenant_key: String,
    pub redirect_uri: String,
    pub tenant_source: TenantSource,
    pub http_timeout: Duration,
    pub user_connection: String,
    pub password_reset: Option<PasswordResetTickets>,
    pub request_timeout: Duration,
    pub development: bool,
    pub host: String,
    pub port: u16,
}

impl BrokerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let redirect_uri = var("REDIRECT_URI").unwrap_or_else(|| DEFAULT_REDIRECT_URI.into());
        Url::parse(&redirect_uri).map_err(|_| {
            ConfigError::InvalidConfig(format!("REDIRECT_URI `{redirect_uri}` is not a valid url"))
        })?;

        let http_timeout = match var("IDP_HTTP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_secs("IDP_HTTP_TIMEOUT_SECS", &raw)?),
            None => DEFAULT_HTTP_TIMEOUT,
        };
        let request_timeout = match var("REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_secs("REQUEST_TIMEOUT_SECS", &raw)?),
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let password_reset = match var("PASSWORD_RESET_CONNECTION_ID") {
            Some(connection_id) => {
                let ttl_secs = match var("PASSWORD_RESET_TTL_SECS") {
                    Some(raw) => parse_secs("PASSWORD_RESET_TTL_SECS", &raw)?,
                    None => DEFAULT_TICKET_TTL_SECS,
                };
                Some(PasswordResetTickets {
                    connection_id,
                    ttl_secs,
                })
            }
            None => None,
        };

        let development = ["APP_ENV", "NODE_ENV"]
            .into_iter()
            .filter_map(&var)
            .any(|value| value.eq_ignore_ascii_case("development"));

        let port = match var("BROKER_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                ConfigError::InvalidConfig(format!("BROKER_PORT `{raw}` is not a valid port"))
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            tenant_key: var("TENANT_KEY").unwrap_or_else(|| DEFAULT_TENANT_KEY.into()),
            redirect_uri,
            tenant_source: tenant_source(&var, http_timeout)?,
            http_timeout,
            user_connection: var("IDP_USER_CONNECTION")
                .unwrap_or_else(|| DEFAULT_USER_CONNECTION.into()),
            password_reset,
            request_timeout,
            development,
            host: var("BROKER_HOST").unwrap_or_else(|| DEFAULT_HOST.into()),
            port,
        })
    }

    pub fn gateway_options(&self) -> GatewayOptions {
        GatewayOptions {
            redirect_uri: self.redirect_uri.clone(),
            user_connection: self.user_connection.clone(),
            http_timeout: self.http_timeout,
        }
    }

    pub fn build_store(&self) -> Result<Arc<dyn TenantConfigStore>, ConfigError> {
        let store: Arc<dyn TenantConfigStore> = match &self.tenant_source {
            TenantSource::DocumentApi(options) => Arc::new(DocumentApiStore::new(options.clone())?),
            TenantSource::Directory(dir) => Arc::new(FileTenantStore::new(dir.clone())),
        };
        Ok(store)
    }
}

/// The document API needs endpoint, project and key together; without any of them the
/// local directory store is used.
fn tenant_source(
    var: &impl Fn(&str) -> Option<String>,
    timeout: Duration,
) -> Result<TenantSource, ConfigError> {
    let endpoint = var("APPWRITE_ENDPOINT");
    let project_id = var("APPWRITE_PROJECT_ID");
    let api_key = var("APPWRITE_API_KEY");

    match (endpoint, project_id, api_key) {
        (None, None, None) => Ok(TenantSource::Directory(PathBuf::from(
            var("TENANT_CONFIG_DIR").unwrap_or_else(|| DEFAULT_TENANT_DIR.into()),
        ))),
        (Some(endpoint), Some(project_id), Some(api_key)) => {
            Url::parse(&endpoint).map_err(|_| {
                ConfigError::InvalidConfig(format!(
                    "APPWRITE_ENDPOINT `{endpoint}` is not a valid url"
                ))
            })?;
            let mut options = DocumentApiOptions::new(endpoint, project_id, api_key);
            options.database_id =
                var("TENANT_DATABASE_ID").unwrap_or_else(|| DEFAULT_DATABASE_ID.into());
            options.collection_id =
                var("TENANT_COLLECTION_ID").unwrap_or_else(|| DEFAULT_COLLECTION_ID.into());
            options.timeout = timeout;
            Ok(TenantSource::DocumentApi(options))
        }
        (None, _, _) => Err(ConfigError::MissingEnv("APPWRITE_ENDPOINT")),
        (_, None, _) => Err(ConfigError::MissingEnv("APPWRITE_PROJECT_ID")),
        (_, _, None) => Err(ConfigError::MissingEnv("APPWRITE_API_KEY")),
    }
}

/// Whole seconds, greater than zero.
fn parse_secs(key: &str, raw: &str) -> Result<u64, ConfigError> {
    let secs = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidConfig(format!("{key} `{raw}` is not a whole number")))?;
    if secs == 0 {
        return Err(ConfigError::InvalidConfig(format!(
            "{key} must be greater than zero"
        )));
    }
    Ok(secs)
}
