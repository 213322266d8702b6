use std::{
    collections::HashMap,
    sync::{
        RwLock,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;

use super::{ConfigFetchError, TenantConfigStore};
use crate::tenant::TenantIdentityConfig;

/// Map-backed tenant store for embedding and tests.
#[derive(Default)]
pub struct MemoryTenantStore {
    records: RwLock<HashMap<String, TenantIdentityConfig>>,
    reads: AtomicUsize,
}

impl MemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant(self, tenant_key: impl Into<String>, config: TenantIdentityConfig) -> Self {
        self.insert(tenant_key, config);
        self
    }

    pub fn insert(&self, tenant_key: impl Into<String>, config: TenantIdentityConfig) {
        self.records
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(tenant_key.into(), config);
    }

    /// Number of `fetch` calls served so far, hits and misses alike.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TenantConfigStore for MemoryTenantStore {
    async fn fetch(&self, tenant_key: &str) -> Result<TenantIdentityConfig, ConfigFetchError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(tenant_key)
            .cloned()
            .ok_or_else(|| ConfigFetchError::NotFound(tenant_key.to_string()))
    }
}
