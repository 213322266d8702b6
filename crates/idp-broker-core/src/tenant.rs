use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Redirect URI used when the environment does not provide one.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/api/auth/callback";

/// Fields a tenant record must carry before any derived endpoint is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    Domain,
    ClientId,
    ClientSecret,
    ManagementApiEndpoint,
}

impl RequiredField {
    /// Validation order; the first missing field in this order is reported.
    pub const ALL: [RequiredField; 4] = [
        RequiredField::Domain,
        RequiredField::ClientId,
        RequiredField::ClientSecret,
        RequiredField::ManagementApiEndpoint,
    ];

    /// Field name as it appears in the tenant document.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequiredField::Domain => "domain",
            RequiredField::ClientId => "clientId",
            RequiredField::ClientSecret => "clientSecret",
            RequiredField::ManagementApiEndpoint => "managementApiEndpoint",
        }
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required configuration: {missing_field}")]
pub struct ConfigValidationError {
    pub missing_field: RequiredField,
}

/// Identity-provider settings for one tenant, exactly as stored.
///
/// Every field is optional here; [`TenantIdentityConfig::validate`] turns the record into a
/// [`ValidatedTenantConfig`], the only type that exposes derived endpoints.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantIdentityConfig {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub management_api_endpoint: Option<String>,
}

impl fmt::Debug for TenantIdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantIdentityConfig")
            .field("domain", &self.domain)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("management_api_endpoint", &self.management_api_endpoint)
            .finish()
    }
}

impl TenantIdentityConfig {
    pub fn new(
        domain: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        management_api_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            domain: Some(domain.into()),
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
            management_api_endpoint: Some(management_api_endpoint.into()),
        }
    }

    fn field(&self, field: RequiredField) -> Option<&str> {
        let value = match field {
            RequiredField::Domain => self.domain.as_deref(),
            RequiredField::ClientId => self.client_id.as_deref(),
            RequiredField::ClientSecret => self.client_secret.as_deref(),
            RequiredField::ManagementApiEndpoint => self.management_api_endpoint.as_deref(),
        };
        value.filter(|v| !v.is_empty())
    }

    /// Check the four required fields in their fixed order and derive the endpoint set.
    pub fn validate(self) -> Result<ValidatedTenantConfig, ConfigValidationError> {
        if let Some(missing_field) = RequiredField::ALL
            .into_iter()
            .find(|field| self.field(*field).is_none())
        {
            return Err(ConfigValidationError { missing_field });
        }

        // Every field is known to be present and non-empty past this point.
        let domain = self.domain.unwrap_or_default();
        let client_id = self.client_id.unwrap_or_default();
        let client_secret = self.client_secret.unwrap_or_default();
        let mut management_api_endpoint = self.management_api_endpoint.unwrap_or_default();
        if !management_api_endpoint.ends_with('/') {
            management_api_endpoint.push('/');
        }

        let issuer_base = issuer_base(&domain);
        Ok(ValidatedTenantConfig {
            authorization_url: format!("{issuer_base}/authorize"),
            token_endpoint: format!("{issuer_base}/oauth/token"),
            user_info_endpoint: format!("{issuer_base}/userinfo"),
            users_endpoint: format!("{management_api_endpoint}users"),
            domain,
            client_id,
            client_secret,
            management_api_endpoint,
        })
    }
}

fn issuer_base(domain: &str) -> String {
    let trimmed = domain.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// A tenant record that passed validation, with its derived endpoints.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedTenantConfig {
    domain: String,
    client_id: String,
    client_secret: String,
    management_api_endpoint: String,
    authorization_url: String,
    token_endpoint: String,
    user_info_endpoint: String,
    users_endpoint: String,
}

impl fmt::Debug for ValidatedTenantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedTenantConfig")
            .field("domain", &self.domain)
            .field("client_id", &self.client_id)
            .field("management_api_endpoint", &self.management_api_endpoint)
            .finish_non_exhaustive()
    }
}

impl ValidatedTenantConfig {
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Management API base URL, always ending in `/`.
    pub fn management_api_endpoint(&self) -> &str {
        &self.management_api_endpoint
    }

    pub fn authorization_url(&self) -> &str {
        &self.authorization_url
    }

    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }

    pub fn user_info_endpoint(&self) -> &str {
        &self.user_info_endpoint
    }

    pub fn users_endpoint(&self) -> &str {
        &self.users_endpoint
    }

    /// Management API audience used for authorization-code exchanges.
    pub fn api_audience(&self) -> String {
        format!("{}/api/v2/", issuer_base(&self.domain))
    }

    /// Management API endpoint joined with a relative path such as `jobs/send-verification-email`.
    pub fn management_url(&self, path: &str) -> String {
        format!(
            "{}{}",
            self.management_api_endpoint,
            path.trim_start_matches('/')
        )
    }

    /// Serializable view of the configuration; the client secret is never included.
    pub fn summary(&self, redirect_uri: &str) -> ConfigSummary {
        ConfigSummary {
            domain: self.domain.clone(),
            client_id: self.client_id.clone(),
            management_api_endpoint: self.management_api_endpoint.clone(),
            redirect_uri: redirect_uri.to_string(),
            authorization_url: self.authorization_url.clone(),
            token_endpoint: self.token_endpoint.clone(),
            user_info_endpoint: self.user_info_endpoint.clone(),
            users_endpoint: self.users_endpoint.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSummary {
    pub domain: String,
    pub client_id: String,
    pub management_api_endpoint: String,
    pub redirect_uri: String,
    pub authorization_url: String,
    pub token_endpoint: String,
    pub user_info_endpoint: String,
    pub users_endpoint: String,
}
