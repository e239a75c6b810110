use crate::redis_backend::{RedisBackend, map_redis_error};
use redis::aio::ConnectionManager;
use shared::{Error, Result};
use std::fmt::Debug;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Passive observer of the redis connection shared by the cart store.
///
/// Holds a clone of the multiplexed handle, so samples ride the same socket
/// as cart traffic and never open a connection of their own.
#[derive(Clone)]
pub struct ConnectionObserver {
    connection: ConnectionManager,
    address: String,
}

impl ConnectionObserver {
    pub fn attach(backend: &RedisBackend) -> Self {
        Self {
            connection: backend.connection().clone(),
            address: backend.address().to_string(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Time one `PING` round trip on the shared connection.
    pub async fn sample(&self) -> Result<Duration> {
        let mut conn = self.connection.clone();
        let started = Instant::now();
        redis::cmd("PING")
            .query_async::<()>(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(started.elapsed())
    }

    /// Sample every `interval` until the task is aborted.
    pub async fn run(self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let sample = tokio::time::timeout(interval, self.sample())
                .await
                .unwrap_or_else(|_| {
                    Err(Error::StoreUnavailable(format!(
                        "no PING reply within {:?}",
                        interval
                    )))
                });
            match sample {
                Ok(latency) => debug!(address = %self.address, ?latency, "redis round trip"),
                Err(e) => warn!(address = %self.address, error = %e, "redis round trip failed"),
            }
        }
    }
}

impl Debug for ConnectionObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionObserver")
            .field("address", &self.address)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_redis::FakeRedis;
    use cart::ports::CartStore;
    use cart::{InstrumentedCartStore, KvCartStore, StoreOptions};

    #[tokio::test]
    async fn test_observer_shares_the_store_connection() {
        let server = FakeRedis::start().await;
        let backend = RedisBackend::connect(&server.url, Duration::from_secs(2))
            .await
            .unwrap();
        let store = InstrumentedCartStore::new(
            KvCartStore::connect(backend, StoreOptions::default())
                .await
                .unwrap(),
        );

        let observer = ConnectionObserver::attach(store.inner().backend());
        assert_eq!(observer.address(), server.url);

        store.add_item("u1", "SKU1", 2).await.unwrap();
        observer.sample().await.unwrap();

        // Backend connect, store connect and the sample all PING over one socket
        assert_eq!(server.connections(), 1);
        assert_eq!(server.commands("SET").len(), 1);
        assert_eq!(server.commands("PING").len(), 3);
    }

    #[tokio::test]
    async fn test_sample_reports_server_errors() {
        let server = FakeRedis::start().await;
        let backend = RedisBackend::connect(&server.url, Duration::from_secs(2))
            .await
            .unwrap();
        let observer = ConnectionObserver::attach(&backend);

        server.fail_pings("ERR server is shutting down");

        assert!(matches!(
            observer.sample().await,
            Err(Error::StoreUnavailable(_))
        ));
    }
}
