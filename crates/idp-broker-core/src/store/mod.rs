pub mod document_api;
pub mod file;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::tenant::TenantIdentityConfig;

pub use document_api::{DocumentApiOptions, DocumentApiStore};
pub use file::FileTenantStore;
pub use memory::MemoryTenantStore;

/// Source of per-tenant identity-provider records.
#[async_trait]
pub trait TenantConfigStore: Send + Sync {
    /// Look up the record stored under `tenant_key`. One read per call, no writes.
    async fn fetch(&self, tenant_key: &str) -> Result<TenantIdentityConfig, ConfigFetchError>;
}

/// Errors arising while reading a tenant record.
#[derive(Debug, Error)]
pub enum ConfigFetchError {
    #[error("tenant `{0}` not found")]
    NotFound(String),
    #[error("tenant key is invalid: {0}")]
    InvalidKey(String),
    #[error("tenant store unavailable: {0}")]
    Unavailable(String),
    #[error("tenant document is malformed: {0}")]
    InvalidDocument(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Tenant keys name a single document; reject anything that could address another location.
pub(crate) fn check_tenant_key(tenant_key: &str) -> Result<&str, ConfigFetchError> {
    let invalid = tenant_key.is_empty()
        || tenant_key == "."
        || tenant_key == ".."
        || tenant_key.contains(['/', '\\'])
        || tenant_key.chars().any(|c| c.is_control());
    if invalid {
        return Err(ConfigFetchError::InvalidKey(tenant_key.to_string()));
    }
    Ok(tenant_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversing_tenant_keys() {
        for key in ["", ".", "..", "../etc", "a/b", "a\\b", "a\nb"] {
            assert!(
                matches!(check_tenant_key(key), Err(ConfigFetchError::InvalidKey(_))),
                "{key:?} should be rejected"
            );
        }
        assert_eq!(check_tenant_key("printHub").unwrap(), "printHub");
    }
}
