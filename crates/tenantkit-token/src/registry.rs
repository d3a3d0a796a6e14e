//! Per-tenant provider instances.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;

/// One provider per tenant id, created on first use.
///
/// Owned by the application's composition root and shared by reference;
/// there is no process-wide instance.
pub struct TenantRegistry<P> {
    providers: RwLock<HashMap<String, Arc<P>>>,
}

impl<P> Default for TenantRegistry<P> {
    fn default() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
        }
    }
}

impl<P> TenantRegistry<P> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The provider for `tenant`, if one was created.
    pub async fn get(&self, tenant: &str) -> Option<Arc<P>> {
        self.providers.read().await.get(tenant).cloned()
    }

    /// The provider for `tenant`, creating it with `create` on first use.
    pub async fn get_or_insert_with<F>(&self, tenant: &str, create: F) -> Arc<P>
    where
        F: FnOnce() -> P,
    {
        if let Some(existing) = self.get(tenant).await {
            return existing;
        }
        let mut providers = self.providers.write().await;
        providers
            .entry(tenant.to_string())
            .or_insert_with(|| {
                tracing::debug!(tenant, "creating tenant provider");
                Arc::new(create())
            })
            .clone()
    }

    /// Like [`get_or_insert_with`](Self::get_or_insert_with) for fallible,
    /// async construction. Nothing is inserted when `create` fails.
    ///
    /// `create` runs outside the registry lock and may use the registry.
    /// Concurrent callers can each build a provider; the first one stored is
    /// returned to all of them.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, tenant: &str, create: F) -> Result<Arc<P>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<P, E>>,
    {
        if let Some(existing) = self.get(tenant).await {
            return Ok(existing);
        }
        // Built without holding the lock; a provider registered meanwhile wins.
        let created = create().await?;
        let mut providers = self.providers.write().await;
        Ok(providers
            .entry(tenant.to_string())
            .or_insert_with(|| {
                tracing::debug!(tenant, "creating tenant provider");
                Arc::new(created)
            })
            .clone())
    }

    /// Register a ready-made provider, replacing any previous one.
    pub async fn insert(&self, tenant: &str, provider: P) -> Arc<P> {
        let provider = Arc::new(provider);
        self.providers
            .write()
            .await
            .insert(tenant.to_string(), provider.clone());
        provider
    }

    /// Drop the provider for `tenant`.
    pub async fn remove(&self, tenant: &str) -> Option<Arc<P>> {
        self.providers.write().await.remove(tenant)
    }

    /// Registered tenant ids, sorted.
    pub async fn tenants(&self) -> Vec<String> {
        let mut tenants: Vec<String> = self.providers.read().await.keys().cloned().collect();
        tenants.sort();
        tenants
    }

    /// Number of registered tenants.
    pub async fn len(&self) -> usize {
        self.providers.read().await.len()
    }

    /// Whether no tenant is registered.
    pub async fn is_empty(&self) -> bool {
        self.providers.read().await.is_empty()
    }
}
