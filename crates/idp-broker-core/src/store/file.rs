use std::{io::ErrorKind, path::PathBuf};

use async_trait::async_trait;

use super::{ConfigFetchError, TenantConfigStore, check_tenant_key};
use crate::tenant::TenantIdentityConfig;

/// Development-oriented tenant store reading `<base_dir>/<tenant_key>.json`.
pub struct FileTenantStore {
    base_dir: PathBuf,
}

impl FileTenantStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn path_for(&self, tenant_key: &str) -> PathBuf {
        self.base_dir.join(format!("{tenant_key}.json"))
    }
}

#[async_trait]
impl TenantConfigStore for FileTenantStore {
    async fn fetch(&self, tenant_key: &str) -> Result<TenantIdentityConfig, ConfigFetchError> {
        let tenant_key = check_tenant_key(tenant_key)?;
        let path = self.path_for(tenant_key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(ConfigFetchError::NotFound(tenant_key.to_string()))
            }
            Err(err) => Err(ConfigFetchError::from(err)),
        }
    }
}
