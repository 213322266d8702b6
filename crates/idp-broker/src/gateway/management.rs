use idp_broker_core::{NewUser, ProviderUser, UserMetadata, ValidatedTenantConfig};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use super::{
    GatewayError, IdentityGateway, ProviderFailure, parse_endpoint, send_discarding_body,
    send_json,
};

pub const DEFAULT_TICKET_TTL_SECS: u64 = 86_400;

impl IdentityGateway {
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        user_metadata: &UserMetadata,
    ) -> Result<ProviderUser, GatewayError> {
        let config = self.session()?;
        let payload = NewUser {
            email,
            password,
            connection: &self.options.user_connection,
            user_metadata,
            email_verified: false,
        };
        debug!(
            target: "idp.gateway",
            operation = "create_user",
            connection = %payload.connection,
            "creating user"
        );
        let result: Result<ProviderUser, ProviderFailure> = async {
            let token = self.management_token(config).await?;
            send_json(
                self.http
                    .post(config.users_endpoint())
                    .bearer_auth(token)
                    .json(&payload),
            )
            .await
        }
        .await;
        result.map_err(|cause| GatewayError::provider("create user", cause))
    }

    /// Fetch a single user; a 404 from the provider becomes [`GatewayError::NotFound`].
    pub async fn get_user(&self, user_id: &str) -> Result<ProviderUser, GatewayError> {
        let config = self.session()?;
        let url = user_url(config, user_id)?;
        let result: Result<ProviderUser, ProviderFailure> = async {
            let token = self.management_token(config).await?;
            send_json(self.http.get(url).bearer_auth(token)).await
        }
        .await;
        match result {
            Ok(user) => Ok(user),
            Err(ProviderFailure::Status { status, .. }) if status == StatusCode::NOT_FOUND => {
                Err(GatewayError::NotFound {
                    resource: format!("user `{user_id}`"),
                })
            }
            Err(cause) => Err(GatewayError::provider("get user", cause)),
        }
    }

    /// Users whose email matches exactly, via the v3 user search.
    pub async fn find_users_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<ProviderUser>, GatewayError> {
        let config = self.session()?;
        let query = format!("email:\"{email}\"");
        let url = Url::parse_with_params(
            config.users_endpoint(),
            &[("q", query.as_str()), ("search_engine", "v3")],
        )
        .map_err(|source| GatewayError::InvalidEndpoint {
            url: config.users_endpoint().to_string(),
            source,
        })?;
        let result: Result<Vec<ProviderUser>, ProviderFailure> = async {
            let token = self.management_token(config).await?;
            send_json(self.http.get(url).bearer_auth(token)).await
        }
        .await;
        result.map_err(|cause| GatewayError::provider("search users by email", cause))
    }

    pub async fn update_user(
        &self,
        user_id: &str,
        updates: &Value,
    ) -> Result<ProviderUser, GatewayError> {
        self.patch_user("update user", user_id, updates).await
    }

    pub async fn change_password(
        &self,
        user_id: &str,
        new_password: &str,
    ) -> Result<ProviderUser, GatewayError> {
        self.patch_user("change password", user_id, &json!({ "password": new_password }))
            .await
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<bool, GatewayError> {
        let config = self.session()?;
        let url = user_url(config, user_id)?;
        let result: Result<(), ProviderFailure> = async {
            let token = self.management_token(config).await?;
            send_discarding_body(self.http.delete(url).bearer_auth(token)).await
        }
        .await;
        result
            .map(|()| true)
            .map_err(|cause| GatewayError::provider("delete user", cause))
    }

    /// Queue the provider's email job for the given address.
    pub async fn send_password_reset_email(&self, email: &str) -> Result<bool, GatewayError> {
        let config = self.session()?;
        let payload = json!({
            "client_id": config.client_id(),
            "user_id": email,
        });
        let result: Result<(), ProviderFailure> = async {
            let token = self.management_token(config).await?;
            send_discarding_body(
                self.http
                    .post(config.management_url("jobs/send-verification-email"))
                    .bearer_auth(token)
                    .json(&payload),
            )
            .await
        }
        .await;
        result
            .map(|()| true)
            .map_err(|cause| GatewayError::provider("send password reset email", cause))
    }

    /// Create a password-change ticket; the provider emails the link and returns the ticket.
    pub async fn create_password_change_ticket(
        &self,
        email: &str,
        connection_id: &str,
        ttl_secs: u64,
    ) -> Result<Value, GatewayError> {
        let config = self.session()?;
        let payload = json!({
            "client_id": config.client_id(),
            "email": email,
            "connection_id": connection_id,
            "ttl_sec": ttl_secs,
        });
        let result: Result<Value, ProviderFailure> = async {
            let token = self.management_token(config).await?;
            send_json(
                self.http
                    .post(config.management_url("tickets/password-change"))
                    .bearer_auth(token)
                    .json(&payload),
            )
            .await
        }
        .await;
        result.map_err(|cause| GatewayError::provider("create password change ticket", cause))
    }

    async fn patch_user(
        &self,
        action: &'static str,
        user_id: &str,
        body: &Value,
    ) -> Result<ProviderUser, GatewayError> {
        let config = self.session()?;
        let url = user_url(config, user_id)?;
        let result: Result<ProviderUser, ProviderFailure> = async {
            let token = self.management_token(config).await?;
            send_json(self.http.patch(url).bearer_auth(token).json(body)).await
        }
        .await;
        result.map_err(|cause| GatewayError::provider(action, cause))
    }
}

/// Dot segments and empty ids would resolve to the users collection itself.
fn user_url(config: &ValidatedTenantConfig, user_id: &str) -> Result<Url, GatewayError> {
    if matches!(user_id, "" | "." | "..") {
        return Err(GatewayError::NotFound {
            resource: format!("user `{user_id}`"),
        });
    }
    let mut url = parse_endpoint(config.users_endpoint())?;
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(user_id);
    }
    Ok(url)
}
