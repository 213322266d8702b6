use idp_broker_core::LoadError;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to initialize identity gateway for tenant `{tenant_key}`: {source}")]
    Init {
        tenant_key: String,
        #[source]
        source: LoadError,
    },
    #[error("identity gateway already initialized for tenant `{current}`, refusing `{requested}`")]
    AlreadyInitialized { current: String, requested: String },
    #[error("identity gateway not initialized")]
    NotInitialized,
    #[error("failed to {action}: {cause}")]
    Provider {
        action: &'static str,
        #[source]
        cause: ProviderFailure,
    },
    #[error("{resource} not found")]
    NotFound { resource: String },
    #[error("invalid endpoint `{url}`: {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

impl GatewayError {
    pub(crate) fn provider(action: &'static str, cause: ProviderFailure) -> Self {
        GatewayError::Provider { action, cause }
    }

    /// Status and message when the provider itself answered the named call with a non-2xx.
    pub fn provider_rejection(&self) -> Option<(StatusCode, &str)> {
        match self {
            GatewayError::Provider {
                cause: ProviderFailure::Status { status, message },
                ..
            } => Some((*status, message.as_str())),
            _ => None,
        }
    }
}

/// Reasons a single outbound provider call failed.
#[derive(Debug, Error)]
pub enum ProviderFailure {
    #[error("provider returned {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
    #[error("failed to obtain management token: {0}")]
    ManagementToken(#[source] Box<ProviderFailure>),
}

/// Pull the most descriptive message out of a provider error body.
pub(crate) fn provider_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["error_description", "message", "error"]
                .into_iter()
                .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(str::to_string))
        });
    if let Some(message) = from_json {
        return message;
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string())
}
