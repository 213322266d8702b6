//! Request handlers for login, signup, profile and password reset.
//!
//! Handlers see a transport-neutral [`HandlerRequest`] and always produce a
//! [`HandlerResponse`]; failures are rendered as `{error, message}` bodies.

pub mod error;
pub mod login;
pub mod password_reset;
pub mod profile;
pub mod signup;

use std::{collections::HashMap, sync::Arc};

use axum::http::{Method, StatusCode};
use serde_json::{Map, Value};

use crate::gateway::{DEFAULT_TICKET_TTL_SECS, IdentityGateway};

pub use error::ApiError;
pub use login::login;
pub use password_reset::password_reset;
pub use profile::profile;
pub use signup::signup;

#[derive(Debug, Clone)]
pub struct HandlerRequest {
    pub method: Method,
    pub body: Value,
    pub query: HashMap<String, String>,
}

impl HandlerRequest {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: Value::Object(Map::new()),
            query: HashMap::new(),
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Body field, only when present and truthy.
    pub fn body_field(&self, key: &str) -> Option<&Value> {
        self.body.get(key).filter(|value| is_truthy(value))
    }

    /// Truthy body field rendered as text; strings are taken verbatim.
    pub fn body_text(&self, key: &str) -> Option<String> {
        self.body_field(key).map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl HandlerResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, body)
    }
}

/// Password-change tickets instead of the email job, when a connection is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordResetTickets {
    pub connection_id: String,
    pub ttl_secs: u64,
}

impl PasswordResetTickets {
    pub fn new(connection_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            ttl_secs: DEFAULT_TICKET_TTL_SECS,
        }
    }
}

/// Everything a handler needs besides the request itself.
#[derive(Clone)]
pub struct HandlerContext {
    pub gateway: Arc<IdentityGateway>,
    pub tenant_key: String,
    pub password_reset: Option<PasswordResetTickets>,
    /// Include error cause chains in response bodies.
    pub expose_error_details: bool,
}

impl HandlerContext {
    pub fn new(gateway: Arc<IdentityGateway>, tenant_key: impl Into<String>) -> Self {
        Self {
            gateway,
            tenant_key: tenant_key.into(),
            password_reset: None,
            expose_error_details: false,
        }
    }

    /// Initialize the gateway on first use.
    pub(crate) async fn ensure_ready(&self, category: &'static str) -> Result<(), ApiError> {
        if self.gateway.is_ready() {
            return Ok(());
        }
        tracing::info!(
            target: "idp.gateway",
            tenant = %self.tenant_key,
            "initializing identity gateway"
        );
        self.gateway
            .init(&self.tenant_key)
            .await
            .map(|_| ())
            .map_err(|err| ApiError::internal(category, &err))
    }
}

/// JavaScript-style truthiness: `null`, `false`, `0`, `""` and absent are all missing.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_none_or(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_matches_presence_rules() {
        for value in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(!is_truthy(&value), "{value} should be missing");
        }
        for value in [json!(true), json!(1), json!("x"), json!([]), json!({})] {
            assert!(is_truthy(&value), "{value} should be present");
        }
    }

    #[test]
    fn body_helpers_skip_falsy_fields() {
        let request = HandlerRequest::new(Method::POST).with_body(json!({
            "code": "",
            "state": "s1",
            "count": 7
        }));
        assert_eq!(request.body_text("code"), None);
        assert_eq!(request.body_text("state").as_deref(), Some("s1"));
        assert_eq!(request.body_text("count").as_deref(), Some("7"));
        assert_eq!(request.body_text("missing"), None);
    }
}
