use axum::http::Method;
use serde_json::json;
use tracing::{error, info, warn};

use super::{ApiError, HandlerContext, HandlerRequest, HandlerResponse};

pub const DEFAULT_STATE: &str = "default-state";
pub const LOGIN_SCOPE: &str = "openid profile email";
const CATEGORY: &str = "Authentication Error";

/// With a `code`, exchange it for tokens; otherwise hand back an authorization URL.
pub async fn login(ctx: &HandlerContext, request: HandlerRequest) -> HandlerResponse {
    info!(target: "idp.login", method = %request.method, "request received");
    match handle(ctx, &request).await {
        Ok(response) => response,
        Err(err) => {
            if err.status().is_server_error() {
                error!(target: "idp.login", status = %err.status(), error = %err, "login failed");
            } else {
                warn!(target: "idp.login", status = %err.status(), error = %err, "login rejected");
            }
            err.into_response(ctx.expose_error_details)
        }
    }
}

async fn handle(
    ctx: &HandlerContext,
    request: &HandlerRequest,
) -> Result<HandlerResponse, ApiError> {
    if request.method != Method::POST {
        return Err(ApiError::method_not_allowed("Only POST requests are allowed"));
    }

    ctx.ensure_ready(CATEGORY).await?;

    if let Some(code) = request.body_text("code") {
        info!(target: "idp.login", "exchanging authorization code");
        let tokens = ctx
            .gateway
            .exchange_code_for_token(&code)
            .await
            .map_err(|err| ApiError::internal(CATEGORY, &err))?;
        info!(target: "idp.login", "token exchange succeeded");
        return Ok(HandlerResponse::ok(json!({
            "success": true,
            "accessToken": tokens.access_token,
            "idToken": tokens.id_token,
            "refreshToken": tokens.refresh_token,
            "expiresIn": tokens.expires_in,
            "tokenType": tokens.token_type,
        })));
    }

    let state = request
        .body_text("state")
        .unwrap_or_else(|| DEFAULT_STATE.to_string());
    let authorization_url = ctx
        .gateway
        .generate_authorization_url(&state, LOGIN_SCOPE)
        .map_err(|err| ApiError::internal(CATEGORY, &err))?;
    info!(target: "idp.login", "authorization url generated");

    Ok(HandlerResponse::ok(json!({
        "success": true,
        "authorizationUrl": authorization_url,
        "state": state,
    })))
}
