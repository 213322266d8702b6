use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open map of user metadata keys to arbitrary JSON values.
pub type UserMetadata = Map<String, Value>;

/// Token bundle returned by an authorization-code exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokenSet {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// User object as returned by the provider's management API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderUser {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub user_metadata: Option<UserMetadata>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProviderUser {
    /// `user_metadata`, or an empty object when the provider omitted it.
    pub fn metadata_or_empty(&self) -> Value {
        Value::Object(self.user_metadata.clone().unwrap_or_default())
    }
}

/// Payload for creating a database-connection user.
#[derive(Clone, PartialEq, Serialize)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub connection: &'a str,
    pub user_metadata: &'a UserMetadata,
    pub email_verified: bool,
}

impl std::fmt::Debug for NewUser<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}
