#![deny(clippy::all)]

use crate::domain::Cart;
use async_trait::async_trait;
use shared::Result;
use std::time::Duration;

// Ports are the pluggable extension points: callers depend on CartStore,
// KvCartStore depends on KeyValueBackend.

/// Port for cart persistence.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait CartStore: Send + Sync + 'static {
    /// Merge `quantity` units of `product_id` into the user's cart.
    async fn add_item(&self, user_id: &str, product_id: &str, quantity: i32) -> Result<()>;

    /// Fetch the user's cart. An unknown user yields an empty cart.
    async fn get_cart(&self, user_id: &str) -> Result<Cart>;

    /// Remove every item from the user's cart. Emptying an empty cart succeeds.
    async fn empty_cart(&self, user_id: &str) -> Result<()>;

    /// Confirm the backing store is reachable. Returns within a bounded time.
    async fn ping(&self) -> Result<()>;
}

/// Port for the raw key-value backend a `KvCartStore` writes through.
///
/// Connectivity failures are reported as `Error::StoreUnavailable`.
#[async_trait]
pub trait KeyValueBackend: Send + Sync + 'static {
    /// Short backend name for logs, e.g. "redis" or "memory".
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, expiring after `ttl` when given.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;

    /// Delete `key`. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    async fn ping(&self) -> Result<()>;
}
