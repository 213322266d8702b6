//! Tenant identity-provider configuration, tenant stores and provider wire types.

pub mod store;
pub mod tenant;
pub mod types;

pub use store::{
    ConfigFetchError, DocumentApiOptions, DocumentApiStore, FileTenantStore, MemoryTenantStore,
    TenantConfigStore,
};
pub use tenant::{
    ConfigSummary, ConfigValidationError, DEFAULT_REDIRECT_URI, RequiredField,
    TenantIdentityConfig, ValidatedTenantConfig,
};
pub use types::{NewUser, OAuthTokenSet, ProviderUser, UserMetadata};

/// Loads a tenant record and validates it in one step.
pub async fn load_validated(
    store: &dyn TenantConfigStore,
    tenant_key: &str,
) -> Result<ValidatedTenantConfig, LoadError> {
    let raw = store.fetch(tenant_key).await?;
    Ok(raw.validate()?)
}

/// Either half of loading a tenant can fail.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] ConfigFetchError),
    #[error(transparent)]
    Validation(#[from] ConfigValidationError),
}
