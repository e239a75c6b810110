use async_trait::async_trait;
use cart::ports::KeyValueBackend;
use moka::Expiry;
use moka::future::Cache;
use shared::Result;
use std::fmt::Debug;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct StoredPayload {
    bytes: Vec<u8>,
    ttl: Option<Duration>,
}

/// Per-entry expiry: every write restarts the clock with the ttl it carried.
struct PayloadExpiry;

impl Expiry<String, StoredPayload> for PayloadExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredPayload,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredPayload,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// In-process backend built on Moka.
///
/// Carts live only as long as the process. Intended for local development
/// (`REDIS_ADDR=memory://`) and tests.
pub struct MokaBackend {
    cache: Cache<String, StoredPayload>,
}

impl MokaBackend {
    /// Create a backend holding at most `max_carts` carts when given.
    pub fn new(name: &str, max_carts: Option<u64>) -> Self {
        let mut builder = Cache::builder().name(name).expire_after(PayloadExpiry);

        if let Some(capacity) = max_carts {
            builder = builder.max_capacity(capacity);
        }

        Self {
            cache: builder.build(),
        }
    }
}

#[async_trait]
impl KeyValueBackend for MokaBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.cache.get(key).await.map(|stored| stored.bytes))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        self.cache
            .insert(key.to_string(), StoredPayload { bytes: value, ttl })
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.cache.remove(key).await.is_some())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

impl Debug for MokaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaBackend")
            .field("entry_count", &self.cache.entry_count())
            .field("weighted_size", &self.cache.weighted_size())
            .finish()
    }
}
