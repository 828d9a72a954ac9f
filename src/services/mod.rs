//! Services layer - Business logic
//!
//! Services validate input, check references, coordinate repositories with
//! the cache and media storage, and translate storage errors into
//! [`ServiceError`].

pub mod assets;
pub mod error;
pub mod geo;
pub mod media;
pub mod publishing;
pub mod reference;
pub mod template_content;

pub use assets::AssetService;
pub use error::{ServiceError, ServiceResult};
pub use geo::GeoService;
pub use media::{MediaKind, MediaStorage, StoredFile};
pub use publishing::PublishingService;
pub use reference::ReferenceService;
pub use template_content::TemplateContentService;

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Cache, CacheLayer};

/// Read-through cache for one key namespace.
///
/// Cache failures never fail a read; writes drop the whole namespace.
/// A load that overlaps an invalidation is returned but not stored.
#[derive(Clone)]
pub(crate) struct ReadCache {
    cache: Arc<Cache>,
    prefix: &'static str,
    ttl: Duration,
    generation: Arc<AtomicU64>,
}

impl ReadCache {
    pub(crate) fn new(cache: Arc<Cache>, prefix: &'static str) -> Self {
        let ttl = cache.default_ttl();
        Self {
            cache,
            prefix,
            ttl,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub(crate) async fn get_or_load<T, F, Fut>(&self, key: &str, load: F) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let key = format!("{}{}", self.prefix, key);
        if let Some(value) = self.cache.get::<T>(&key).await.ok().flatten() {
            return Ok(value);
        }
        let generation = self.generation.load(Ordering::Acquire);
        let value = load().await?;
        if self.generation.load(Ordering::Acquire) != generation {
            tracing::debug!("Skipped caching {}: invalidated while loading", key);
            return Ok(value);
        }
        if let Err(e) = self.cache.set(&key, &value, self.ttl).await {
            tracing::warn!("Failed to cache {}: {}", key, e);
        }
        Ok(value)
    }

    pub(crate) async fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Err(e) = self.cache.delete_prefix(self.prefix).await {
            tracing::warn!("Failed to invalidate cache prefix {}: {}", self.prefix, e);
        }
    }
}

/// Fail with `InvalidReference` unless `missing` is empty
pub(crate) fn ensure_exist(
    field: &'static str,
    entity: &'static str,
    missing: Vec<i64>,
) -> ServiceResult<()> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::InvalidReference {
            field,
            entity,
            ids: missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_read_cache_loads_once_until_invalidated() {
        let reads = ReadCache::new(create_cache(&CacheConfig::default()), "test:");
        let counter = AtomicUsize::new(0);
        let loads = &counter;
        let load = move || async move {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>(vec![1_i64, 2, 3])
        };

        assert_eq!(reads.get_or_load("list", load).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(reads.get_or_load("list", load).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        reads.invalidate().await;
        reads.get_or_load("list", load).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_read_cache_skips_value_invalidated_while_loading() {
        let reads = ReadCache::new(create_cache(&CacheConfig::default()), "test:");
        let value = reads
            .get_or_load("n", || async {
                // a write lands between the read and the cache fill
                reads.invalidate().await;
                Ok::<_, anyhow::Error>(1_i64)
            })
            .await
            .unwrap();
        assert_eq!(value, 1);

        let value = reads.get_or_load("n", || async { Ok(2_i64) }).await.unwrap();
        assert_eq!(value, 2);
        let value = reads.get_or_load("n", || async { Ok(3_i64) }).await.unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_read_cache_does_not_store_failures() {
        let reads = ReadCache::new(create_cache(&CacheConfig::default()), "test:");
        let failed: anyhow::Result<i64> = reads
            .get_or_load("n", || async { Err::<i64, _>(anyhow::anyhow!("boom")) })
            .await;
        assert!(failed.is_err());
        let value = reads.get_or_load("n", || async { Ok(5_i64) }).await.unwrap();
        assert_eq!(value, 5);
    }

    #[test]
    fn test_ensure_exist() {
        assert!(ensure_exist("states", "State", vec![]).is_ok());
        let err = ensure_exist("states", "State", vec![9]).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidReference { ref ids, .. } if ids == &vec![9]));
    }
}
