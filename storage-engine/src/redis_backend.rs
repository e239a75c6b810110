use async_trait::async_trait;
use cart::ports::KeyValueBackend;
use redis::aio::ConnectionManager;
use redis::{Client, ErrorKind, RedisError};
use shared::{Error, Result};
use std::fmt::Debug;
use std::time::Duration;
use tracing::info;

/// Redis backend over a single multiplexed, auto-reconnecting connection.
///
/// Every request clones the `ConnectionManager` handle, which shares the
/// underlying connection, so no in-process lock is ever taken.
pub struct RedisBackend {
    connection: ConnectionManager,
    address: String,
}

impl RedisBackend {
    /// Open the connection and confirm the server answers `PING`.
    ///
    /// Gives up after `timeout`; the caller treats failure as fatal.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let address = redact(url);
        let client = Client::open(url).map_err(|e| {
            Error::InvalidArgument(format!("invalid redis address '{}': {}", address, e))
        })?;

        info!("Connecting to redis at {}", address);
        let connection = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                Error::StoreUnavailable(format!(
                    "connecting to redis at {} timed out after {:?}",
                    address, timeout
                ))
            })?
            .map_err(map_redis_error)?;

        let backend = Self {
            connection,
            address,
        };
        tokio::time::timeout(timeout, backend.ping())
            .await
            .map_err(|_| {
                Error::StoreUnavailable(format!(
                    "redis at {} did not answer PING within {:?}",
                    backend.address, timeout
                ))
            })??;

        info!("Connected to redis at {}", backend.address);
        Ok(backend)
    }

    /// The shared connection handle, exposed for passive instrumentation.
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Server address with any credentials masked.
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl KeyValueBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async::<Option<Vec<u8>>>(&mut conn)
            .await
            .map_err(map_redis_error)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.connection.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg((ttl.as_millis() as u64).max(1));
        }
        cmd.query_async::<()>(&mut conn)
            .await
            .map_err(map_redis_error)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection.clone();
        let removed = redis::cmd("DEL")
            .arg(key)
            .query_async::<u64>(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(removed > 0)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        let reply = redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(map_redis_error)?;
        if reply != "PONG" {
            return Err(Error::StoreUnavailable(format!(
                "unexpected PING reply '{}'",
                reply
            )));
        }
        Ok(())
    }
}

impl Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("address", &self.address)
            .finish()
    }
}

/// A value of the wrong shape under a cart key is a data problem, not an outage.
pub(crate) fn map_redis_error(err: RedisError) -> Error {
    if err.kind() == ErrorKind::TypeError || err.code() == Some("WRONGTYPE") {
        return Error::CorruptPayload(format!("redis value has unexpected type: {}", err));
    }
    Error::StoreUnavailable(format!("redis: {}", err))
}

fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
