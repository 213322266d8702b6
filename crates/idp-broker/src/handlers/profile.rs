use axum::http::Method;
use idp_broker_core::ProviderUser;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use super::{ApiError, HandlerContext, HandlerRequest, HandlerResponse};
use crate::gateway::GatewayError;

const CATEGORY: &str = "Profile Operation Error";

/// `GET` reads a profile by `userId` or `email` query; `PATCH` applies `updates` to `userId`.
pub async fn profile(ctx: &HandlerContext, request: HandlerRequest) -> HandlerResponse {
    info!(target: "idp.profile", method = %request.method, "request received");
    match handle(ctx, &request).await {
        Ok(response) => response,
        Err(err) => {
            if err.status().is_server_error() {
                error!(
                    target: "idp.profile",
                    status = %err.status(),
                    error = %err,
                    "profile operation failed"
                );
            } else {
                warn!(
                    target: "idp.profile",
                    status = %err.status(),
                    error = %err,
                    "profile operation rejected"
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
    if request.method != Method::GET && request.method != Method::PATCH {
        return Err(ApiError::method_not_allowed(
            "Only GET and PATCH requests are allowed",
        ));
    }

    ctx.ensure_ready(CATEGORY).await?;

    if request.method == Method::GET {
        read_profile(ctx, request).await
    } else {
        update_profile(ctx, request).await
    }
}

async fn read_profile(
    ctx: &HandlerContext,
    request: &HandlerRequest,
) -> Result<HandlerResponse, ApiError> {
    let user = match (request.query_param("userId"), request.query_param("email")) {
        (Some(user_id), _) => {
            info!(target: "idp.profile", user_id, "fetching profile by id");
            match ctx.gateway.get_user(user_id).await {
                Ok(user) => user,
                Err(GatewayError::NotFound { .. }) => {
                    return Err(ApiError::user_not_found(format!(
                        "No user found with id: {user_id}"
                    )));
                }
                Err(err) => return Err(ApiError::internal(CATEGORY, &err)),
            }
        }
        (None, Some(email)) => {
            info!(target: "idp.profile", "fetching profile by email");
            ctx.gateway
                .find_users_by_email(email)
                .await
                .map_err(|err| ApiError::internal(CATEGORY, &err))?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    ApiError::user_not_found(format!("No user found with email: {email}"))
                })?
        }
        (None, None) => {
            return Err(ApiError::validation("Either userId or email is required"));
        }
    };

    Ok(HandlerResponse::ok(json!({
        "success": true,
        "user": profile_view(&user),
    })))
}

async fn update_profile(
    ctx: &HandlerContext,
    request: &HandlerRequest,
) -> Result<HandlerResponse, ApiError> {
    let (Some(user_id), Some(updates)) =
        (request.body_text("userId"), request.body_field("updates"))
    else {
        return Err(ApiError::validation("userId and updates are required"));
    };

    info!(target: "idp.profile", user_id = %user_id, "updating profile");
    let user = match ctx.gateway.update_user(&user_id, updates).await {
        Ok(user) => user,
        Err(GatewayError::NotFound { .. }) => {
            return Err(ApiError::user_not_found(format!(
                "No user found with id: {user_id}"
            )));
        }
        Err(err) => return Err(ApiError::internal(CATEGORY, &err)),
    };

    Ok(HandlerResponse::ok(json!({
        "success": true,
        "message": "Profile updated successfully",
        "user": {
            "userId": user.user_id,
            "email": user.email,
            "emailVerified": user.email_verified,
            "metadata": user.metadata_or_empty(),
            "updatedAt": user.updated_at,
        },
    })))
}

fn profile_view(user: &ProviderUser) -> Value {
    json!({
        "userId": user.user_id,
        "email": user.email,
        "emailVerified": user.email_verified,
        "name": user.name,
        "picture": user.picture,
        "nickname": user.nickname,
        "metadata": user.metadata_or_empty(),
        "createdAt": user.created_at,
        "updatedAt": user.updated_at,
        "lastLogin": user.last_login,
    })
}
