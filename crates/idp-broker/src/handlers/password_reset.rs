use axum::http::{Method, StatusCode};
use serde_json::json;
use tracing::{error, info, warn};

use super::{ApiError, HandlerContext, HandlerRequest, HandlerResponse};

const CATEGORY: &str = "Password Reset Error";
const REJECTED: &str = "Password Reset Failed";

pub async fn password_reset(ctx: &HandlerContext, request: HandlerRequest) -> HandlerResponse {
    info!(target: "idp.password_reset", method = %request.method, "request received");
    match handle(ctx, &request).await {
        Ok(response) => response,
        Err(err) => {
            if err.status().is_server_error() {
                error!(
                    target: "idp.password_reset",
                    status = %err.status(),
                    error = %err,
                    "password reset failed"
                );
            } else {
                warn!(
                    target: "idp.password_reset",
                    status = %err.status(),
                    error = %err,
                    "password reset rejected"
                );
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

    let Some(email) = request.body_text("email") else {
        return Err(ApiError::validation("Email is required"));
    };

    ctx.ensure_ready(CATEGORY).await?;

    let outcome = match &ctx.password_reset {
        Some(tickets) => {
            info!(target: "idp.password_reset", "creating password change ticket");
            ctx.gateway
                .create_password_change_ticket(&email, &tickets.connection_id, tickets.ttl_secs)
                .await
                .map(|_| ())
        }
        None => {
            info!(target: "idp.password_reset", "queueing password reset email");
            ctx.gateway.send_password_reset_email(&email).await.map(|_| ())
        }
    };

    if let Err(err) = outcome {
        if let Some((_, message)) = err.provider_rejection() {
            return Err(ApiError::new(StatusCode::BAD_REQUEST, REJECTED, message));
        }
        return Err(ApiError::internal(CATEGORY, &err));
    }

    Ok(HandlerResponse::ok(json!({
        "success": true,
        "message": "Password reset email sent. Please check your inbox.",
        "email": email,
    })))
}
