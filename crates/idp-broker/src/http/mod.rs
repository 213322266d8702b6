use std::{collections::HashMap, future::Future, time::Duration};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::Method,
    response::{IntoResponse, Response},
    routing::{any, get},
};
use serde_json::{Map, Value, json};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, warn};

use crate::handlers::{self, ApiError, HandlerContext, HandlerRequest, HandlerResponse};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
struct HttpState {
    handlers: HandlerContext,
    request_timeout: Duration,
}

/// Every auth route accepts any method; the handler decides what it allows.
pub fn router(context: HandlerContext, request_timeout: Duration) -> Router {
    Router::new()
        .route("/api/auth/login", any(login))
        .route("/api/auth/signup", any(signup))
        .route("/api/auth/profile", any(profile))
        .route("/api/auth/password-reset", any(password_reset))
        .route("/healthz", get(healthz))
        .layer(
            TraceLayer::new_for_http()
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(HttpState {
            handlers: context,
            request_timeout,
        })
}

async fn login(
    State(state): State<HttpState>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    match handler_request(method, query, &body) {
        Ok(request) => {
            let handled = handlers::login(&state.handlers, request);
            respond(within(state.request_timeout, handled).await)
        }
        Err(err) => respond(err.into_response(false)),
    }
}

async fn signup(
    State(state): State<HttpState>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    match handler_request(method, query, &body) {
        Ok(request) => {
            let handled = handlers::signup(&state.handlers, request);
            respond(within(state.request_timeout, handled).await)
        }
        Err(err) => respond(err.into_response(false)),
    }
}

async fn profile(
    State(state): State<HttpState>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    match handler_request(method, query, &body) {
        Ok(request) => {
            let handled = handlers::profile(&state.handlers, request);
            respond(within(state.request_timeout, handled).await)
        }
        Err(err) => respond(err.into_response(false)),
    }
}

async fn password_reset(
    State(state): State<HttpState>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    match handler_request(method, query, &body) {
        Ok(request) => {
            let handled = handlers::password_reset(&state.handlers, request);
            respond(within(state.request_timeout, handled).await)
        }
        Err(err) => respond(err.into_response(false)),
    }
}

async fn healthz(State(state): State<HttpState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "ready": state.handlers.gateway.is_ready(),
    }))
}

/// A handler still running at the deadline is dropped and answered with a 504.
async fn within(
    limit: Duration,
    handled: impl Future<Output = HandlerResponse>,
) -> HandlerResponse {
    match tokio::time::timeout(limit, handled).await {
        Ok(response) => response,
        Err(_) => {
            warn!(target: "idp.http", timeout_ms = limit.as_millis() as u64, "request timed out");
            ApiError::gateway_timeout(format!(
                "request did not complete within {}ms",
                limit.as_millis()
            ))
            .into_response(false)
        }
    }
}

/// Empty bodies read as `{}`; anything else must be JSON.
fn handler_request(
    method: Method,
    query: HashMap<String, String>,
    body: &[u8],
) -> Result<HandlerRequest, ApiError> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Map::new())
    } else {
        serde_json::from_slice(body).map_err(|err| {
            ApiError::validation(format!("Request body must be valid JSON: {err}"))
        })?
    };
    Ok(HandlerRequest {
        method,
        body,
        query,
    })
}

fn respond(response: HandlerResponse) -> Response {
    (response.status, Json(response.body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn empty_and_whitespace_bodies_become_empty_objects() {
        for body in [&b""[..], &b"  \n"[..]] {
            let request = handler_request(Method::POST, HashMap::new(), body).expect("request");
            assert_eq!(request.body, json!({}));
        }
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        let err = handler_request(Method::POST, HashMap::new(), b"{oops").expect_err("invalid");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.category(), "Validation Error");
    }

    #[tokio::test]
    async fn handlers_past_the_deadline_become_gateway_timeouts() {
        let stalled = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            HandlerResponse::ok(json!({"success": true}))
        };
        let response = within(Duration::from_millis(20), stalled).await;
        assert_eq!(response.status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            response.body,
            json!({
                "error": "Gateway Timeout",
                "message": "request did not complete within 20ms"
            })
        );
    }
}
