use std::error::Error as StdError;

use axum::http::StatusCode;
use serde_json::{Value, json};
use thiserror::Error;

use super::HandlerResponse;

pub const METHOD_NOT_ALLOWED: &str = "Method Not Allowed";
pub const VALIDATION_ERROR: &str = "Validation Error";
pub const USER_NOT_FOUND: &str = "User Not Found";
pub const GATEWAY_TIMEOUT: &str = "Gateway Timeout";

/// Handler failure rendered as `{error: category, message}`.
#[derive(Debug, Error)]
#[error("{category}: {message}")]
pub struct ApiError {
    status: StatusCode,
    category: &'static str,
    message: String,
    details: Option<Vec<String>>,
}

impl ApiError {
    pub fn new(status: StatusCode, category: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            category,
            message: message.into(),
            details: None,
        }
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, METHOD_NOT_ALLOWED, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, VALIDATION_ERROR, message)
    }

    pub fn user_not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, USER_NOT_FOUND, message)
    }

    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, GATEWAY_TIMEOUT, message)
    }

    /// 500 carrying the error's message, with its cause chain kept for development output.
    pub fn internal(category: &'static str, err: &(dyn StdError + 'static)) -> Self {
        let mut details = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            details.push(cause.to_string());
            source = cause.source();
        }
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            category,
            message: err.to_string(),
            details: Some(details),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn category(&self) -> &'static str {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn into_response(self, expose_details: bool) -> HandlerResponse {
        let mut body = json!({
            "error": self.category,
            "message": self.message,
        });
        if expose_details
            && let Some(details) = self.details
            && let Value::Object(map) = &mut body
        {
            map.insert("details".into(), json!(details));
        }
        HandlerResponse::new(self.status, body)
    }
}
