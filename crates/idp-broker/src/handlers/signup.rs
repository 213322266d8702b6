use axum::http::{Method, StatusCode};
use idp_broker_core::UserMetadata;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use super::{ApiError, HandlerContext, HandlerRequest, HandlerResponse};

const CATEGORY: &str = "Signup Error";

pub async fn signup(ctx: &HandlerContext, request: HandlerRequest) -> HandlerResponse {
    info!(target: "idp.signup", method = %request.method, "request received");
    match handle(ctx, &request).await {
        Ok(response) => response,
        Err(err) => {
            if err.status().is_server_error() {
                error!(target: "idp.signup", status = %err.status(), error = %err, "signup failed");
            } else {
                warn!(
                    target: "idp.signup",
                    status = %err.status(),
                    error = %err,
                    "signup rejected"
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

    let (Some(email), Some(password)) = (request.body_text("email"), request.body_text("password"))
    else {
        return Err(ApiError::validation("Email and password are required"));
    };

    ctx.ensure_ready(CATEGORY).await?;

    let metadata = signup_metadata(request);
    let user = ctx
        .gateway
        .create_user(&email, &password, &metadata)
        .await
        .map_err(|err| ApiError::internal(CATEGORY, &err))?;
    info!(
        target: "idp.signup",
        user_id = user.user_id.as_deref().unwrap_or_default(),
        "user created"
    );

    Ok(HandlerResponse::new(
        StatusCode::CREATED,
        json!({
            "success": true,
            "user": {
                "userId": user.user_id,
                "email": user.email,
                "emailVerified": user.email_verified,
                "createdAt": user.created_at,
            },
            "message": "User created successfully. Please verify your email.",
        }),
    ))
}

/// `firstName`/`lastName` defaults, overlaid by any caller-supplied `metadata` object.
fn signup_metadata(request: &HandlerRequest) -> UserMetadata {
    let mut metadata = UserMetadata::new();
    for key in ["firstName", "lastName"] {
        let value = request
            .body_field(key)
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()));
        metadata.insert(key.to_string(), value);
    }
    if let Some(Value::Object(extra)) = request.body.get("metadata") {
        metadata.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_defaults_names_and_lets_metadata_win() {
        let request = HandlerRequest::new(Method::POST).with_body(json!({
            "email": "a@example.com",
            "password": "pw",
            "firstName": "Ada",
            "metadata": {"lastName": "Lovelace", "plan": "pro"}
        }));
        let metadata = signup_metadata(&request);
        assert_eq!(
            Value::Object(metadata),
            json!({"firstName": "Ada", "lastName": "Lovelace", "plan": "pro"})
        );
    }

    #[test]
    fn missing_names_become_empty_strings() {
        let request = HandlerRequest::new(Method::POST).with_body(json!({"metadata": "ignored"}));
        assert_eq!(
            Value::Object(signup_metadata(&request)),
            json!({"firstName": "", "lastName": ""})
        );
    }
}
