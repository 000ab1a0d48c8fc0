//! Remote context cache bootstrapping.
//!
//! The idiom dataset is uploaded once and pinned server-side as a cached
//! context so later requests can reference it by handle instead of resending
//! it. [`CacheBootstrapper`] guarantees at most one provisioning per validity
//! window: a stored, unexpired [`CacheDescriptor`] is reused without touching
//! the network.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CacheResult;
use crate::store::{CACHE_KEY, KeyValueStore};

/// Lifetime of a provisioned cache, in seconds.
pub const CACHE_TTL_SECS: i64 = 3600;

/// Lifetime of a provisioned cache.
pub fn cache_ttl() -> Duration {
    Duration::seconds(CACHE_TTL_SECS)
}

/// Handle and metadata of a provisioned cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheDescriptor {
    /// Server-side handle, `cachedContents/...`.
    #[serde(rename = "cacheName")]
    pub cache_handle: String,
    /// Model the cache is bound to. Requests using the cache must use it too.
    #[serde(rename = "model")]
    pub model_id: String,
    /// When the server drops the cache.
    #[serde(rename = "expiresAt", with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    /// Tokens held by the cache, zero when unreported.
    #[serde(rename = "tokenCount", default)]
    pub token_count: u64,
}

impl CacheDescriptor {
    /// Whether the cache can still be used at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Time left at `now`, zero once expired.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

/// Something that can create a fresh cache.
#[async_trait]
pub trait CacheProvisioner: Send + Sync {
    /// Create a cache and describe it.
    async fn provision(&self) -> CacheResult<CacheDescriptor>;
}

#[async_trait]
impl<P: CacheProvisioner + ?Sized> CacheProvisioner for Box<P> {
    async fn provision(&self) -> CacheResult<CacheDescriptor> {
        (**self).provision().await
    }
}

/// Anything that can hand out a usable cache descriptor.
#[async_trait]
pub trait CacheSource: Send + Sync {
    /// A valid descriptor, provisioning one if needed.
    async fn ensure_cache(&self) -> CacheResult<CacheDescriptor>;
}

/// Reuses a stored cache descriptor while it is valid, provisions otherwise.
pub struct CacheBootstrapper<P, S> {
    provisioner: P,
    store: S,
}

impl<P: CacheProvisioner, S: KeyValueStore> CacheBootstrapper<P, S> {
    /// Bootstrapper persisting descriptors in `store`.
    pub fn new(provisioner: P, store: S) -> Self {
        Self { provisioner, store }
    }

    /// The store holding the descriptor.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ensure a cache is available as of now.
    pub async fn ensure_cache(&self) -> CacheResult<CacheDescriptor> {
        self.ensure_cache_at(Utc::now()).await
    }

    /// Ensure a cache is available as of `now`.
    pub async fn ensure_cache_at(&self, now: DateTime<Utc>) -> CacheResult<CacheDescriptor> {
        if let Some(existing) = self.stored()? {
            if existing.is_valid_at(now) {
                tracing::debug!(cache = %existing.cache_handle, "reusing stored context cache");
                return Ok(existing);
            }
            tracing::info!(cache = %existing.cache_handle, "stored context cache expired");
        }

        tracing::info!("provisioning context cache");
        let descriptor = self.provisioner.provision().await?;
        let encoded = serde_json::to_string(&descriptor).map_err(|err| {
            crate::CacheError::Provisioning {
                message: "failed to encode cache descriptor".to_string(),
                detail: err.to_string(),
            }
        })?;
        self.store.set(CACHE_KEY, &encoded)?;
        tracing::info!(
            cache = %descriptor.cache_handle,
            model = %descriptor.model_id,
            tokens = descriptor.token_count,
            "context cache ready"
        );
        Ok(descriptor)
    }

    /// The stored descriptor, valid or not. Undecodable data counts as absent.
    pub fn stored(&self) -> CacheResult<Option<CacheDescriptor>> {
        let Some(raw) = self.store.get(CACHE_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(descriptor) => Ok(Some(descriptor)),
            Err(err) => {
                tracing::warn!(%err, "ignoring undecodable cache descriptor");
                Ok(None)
            }
        }
    }

    /// Forget the stored descriptor so the next call provisions again.
    pub fn invalidate(&self) -> CacheResult<()> {
        self.store.remove(CACHE_KEY)?;
        Ok(())
    }
}

#[async_trait]
impl<P: CacheProvisioner, S: KeyValueStore> CacheSource for CacheBootstrapper<P, S> {
    async fn ensure_cache(&self) -> CacheResult<CacheDescriptor> {
        CacheBootstrapper::ensure_cache(self).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::TimeZone;

    use super::*;
    use crate::CacheError;
    use crate::store::MemoryStore;

    #[derive(Clone)]
    struct Counting {
        calls: Arc<AtomicUsize>,
        base: DateTime<Utc>,
    }

    impl Counting {
        fn new(base: DateTime<Utc>) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                base,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CacheProvisioner for Counting {
        async fn provision(&self) -> CacheResult<CacheDescriptor> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(CacheDescriptor {
                cache_handle: format!("cachedContents/c{n}"),
                model_id: "gemini-2.5-pro".to_string(),
                expires_at: self.base + Duration::seconds(CACHE_TTL_SECS * n as i64),
                token_count: 1200,
            })
        }
    }

    struct Failing;

    #[async_trait]
    impl CacheProvisioner for Failing {
        async fn provision(&self) -> CacheResult<CacheDescriptor> {
            Err(CacheError::MissingCredential)
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn valid_descriptor_is_reused() {
        let provisioner = Counting::new(t0());
        let boot = CacheBootstrapper::new(provisioner.clone(), MemoryStore::new());

        let first = boot.ensure_cache_at(t0()).await.unwrap();
        let second = boot
            .ensure_cache_at(t0() + Duration::minutes(30))
            .await
            .unwrap();

        assert_eq!(provisioner.calls(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn expired_descriptor_is_replaced() {
        let provisioner = Counting::new(t0());
        let boot = CacheBootstrapper::new(provisioner.clone(), MemoryStore::new());

        let first = boot.ensure_cache_at(t0()).await.unwrap();
        let later = first.expires_at;
        let second = boot.ensure_cache_at(later).await.unwrap();

        assert_eq!(provisioner.calls(), 2);
        assert_ne!(first.cache_handle, second.cache_handle);
        assert_eq!(boot.stored().unwrap(), Some(second));
    }

    #[tokio::test]
    async fn corrupt_descriptor_counts_as_absent() {
        let provisioner = Counting::new(t0());
        let store = MemoryStore::new();
        store.set(CACHE_KEY, "{not json").unwrap();
        let boot = CacheBootstrapper::new(provisioner.clone(), store);

        assert_eq!(boot.stored().unwrap(), None);
        boot.ensure_cache_at(t0()).await.unwrap();
        assert_eq!(provisioner.calls(), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_reprovision() {
        let provisioner = Counting::new(t0());
        let boot = CacheBootstrapper::new(provisioner.clone(), MemoryStore::new());

        boot.ensure_cache_at(t0()).await.unwrap();
        boot.invalidate().unwrap();
        assert_eq!(boot.stored().unwrap(), None);
        boot.ensure_cache_at(t0()).await.unwrap();
        assert_eq!(provisioner.calls(), 2);
    }

    #[tokio::test]
    async fn provisioning_failure_stores_nothing() {
        let boot = CacheBootstrapper::new(Failing, MemoryStore::new());
        let err = boot.ensure_cache_at(t0()).await.unwrap_err();
        assert!(matches!(err, CacheError::MissingCredential));
        assert_eq!(boot.stored().unwrap(), None);
    }

    #[test]
    fn descriptor_wire_shape() {
        let json = r#"{"cacheName":"cachedContents/x","model":"gemini-2.5-pro","expiresAt":1740830400000,"tokenCount":42}"#;
        let descriptor: CacheDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.cache_handle, "cachedContents/x");
        assert_eq!(descriptor.expires_at.timestamp_millis(), 1_740_830_400_000);
        assert!(descriptor.is_valid_at(descriptor.expires_at - Duration::seconds(1)));
        assert!(!descriptor.is_valid_at(descriptor.expires_at));
        assert_eq!(
            descriptor.remaining_at(descriptor.expires_at + Duration::hours(1)),
            Duration::zero()
        );
        assert_eq!(serde_json::to_string(&descriptor).unwrap(), json);
    }
}
