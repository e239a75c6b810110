use crate::codec;
use crate::domain::Cart;
use crate::ports::{CartStore, KeyValueBackend};
use async_trait::async_trait;
use shared::{Error, Result};
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct StoreOptions {
    /// Prepended to the user id to form the backend key.
    pub key_prefix: String,
    /// Expiry applied on every write. `None` keeps carts until emptied.
    pub ttl: Option<Duration>,
    /// Upper bound for a single backend round trip.
    pub op_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key_prefix: "cart:".to_string(),
            ttl: Some(Duration::from_secs(3600)),
            op_timeout: Duration::from_secs(2),
        }
    }
}

/// Cart store that keeps one encoded payload per user in a key-value backend.
///
/// `add_item` is a read-modify-write over two round trips. Two concurrent adds
/// for the same user can interleave and one increment may be lost. Adds for
/// different users never contend.
pub struct KvCartStore<B>
where
    B: KeyValueBackend,
{
    backend: Arc<B>,
    options: StoreOptions,
}

impl<B> KvCartStore<B>
where
    B: KeyValueBackend,
{
    pub fn new(backend: B, options: StoreOptions) -> Self {
        Self::from_shared(Arc::new(backend), options)
    }

    pub fn from_shared(backend: Arc<B>, options: StoreOptions) -> Self {
        Self { backend, options }
    }

    /// Build the store and verify the backend answers before handing it out.
    pub async fn connect(backend: B, options: StoreOptions) -> Result<Self> {
        let store = Self::new(backend, options);
        store.ping().await?;
        info!(
            "Cart store ready on {} backend (prefix='{}', ttl={:?})",
            store.backend.name(),
            store.options.key_prefix,
            store.options.ttl
        );
        Ok(store)
    }

    /// Read-only access to the backend for instrumentation.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn key_for(&self, user_id: &str) -> String {
        format!("{}{}", self.options.key_prefix, user_id)
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.options.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::StoreUnavailable(format!(
                "{} on {} backend timed out after {:?}",
                op,
                self.backend.name(),
                self.options.op_timeout
            ))),
        }
    }

    async fn load(&self, user_id: &str, key: &str) -> Result<Cart> {
        match self.bounded("GET", self.backend.get(key)).await? {
            Some(raw) => {
                let items = codec::decode(&raw).map_err(|e| match e {
                    Error::CorruptPayload(msg) => {
                        Error::CorruptPayload(format!("key '{}': {}", key, msg))
                    }
                    other => other,
                })?;
                Ok(Cart::with_items(user_id, items))
            }
            None => Ok(Cart::empty(user_id)),
        }
    }
}

#[async_trait]
impl<B> CartStore for KvCartStore<B>
where
    B: KeyValueBackend,
{
    async fn add_item(&self, user_id: &str, product_id: &str, quantity: i32) -> Result<()> {
        require_non_empty("user_id", user_id)?;
        require_non_empty("product_id", product_id)?;
        if quantity < 0 {
            return Err(Error::InvalidArgument(format!(
                "quantity must be non-negative, got {}",
                quantity
            )));
        }
        if quantity == 0 {
            debug!("Skipping zero quantity add for product '{}'", product_id);
            return Ok(());
        }

        let key = self.key_for(user_id);
        let mut cart = self.load(user_id, &key).await?;
        let total = cart.merge(product_id, quantity).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "quantity for product '{}' would exceed {}",
                product_id,
                i32::MAX
            ))
        })?;

        let payload = codec::encode(&cart.items);
        self.bounded(
            "SET",
            self.backend.set(&key, payload.to_vec(), self.options.ttl),
        )
        .await?;

        debug!(
            "Product '{}' now at {} in cart '{}' ({} lines)",
            product_id,
            total,
            key,
            cart.items.len()
        );
        Ok(())
    }

    async fn get_cart(&self, user_id: &str) -> Result<Cart> {
        require_non_empty("user_id", user_id)?;
        let key = self.key_for(user_id);
        self.load(user_id, &key).await
    }

    async fn empty_cart(&self, user_id: &str) -> Result<()> {
        require_non_empty("user_id", user_id)?;
        let key = self.key_for(user_id);
        let existed = self.bounded("DEL", self.backend.delete(&key)).await?;
        debug!("Emptied cart '{}' (existed={})", key, existed);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.bounded("PING", self.backend.ping()).await
    }
}

impl<B> Debug for KvCartStore<B>
where
    B: KeyValueBackend,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvCartStore")
            .field("backend", &self.backend.name())
            .field("options", &self.options)
            .finish()
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidArgument(format!("{} must not be empty", field)));
    }
    Ok(())
}
