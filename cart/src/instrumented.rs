use crate::domain::Cart;
use crate::ports::CartStore;
use async_trait::async_trait;
use shared::{Error, Result};
use std::future::Future;
use std::time::Instant;
use tracing::{Instrument, debug, error, info_span, warn};

/// Decorator that traces every call made to the wrapped store.
///
/// Results pass through untouched; only spans and log events are added.
#[derive(Debug)]
pub struct InstrumentedCartStore<S> {
    inner: S,
}

impl<S> InstrumentedCartStore<S>
where
    S: CartStore,
{
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn observe<T, F>(&self, op: &'static str, user_id: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let result = fut
            .instrument(info_span!("cart_store", op, user_id))
            .await;
        let elapsed = started.elapsed();

        match &result {
            Ok(_) => debug!(op, user_id, ?elapsed, "cart store call succeeded"),
            Err(e @ Error::CorruptPayload(_)) => {
                error!(op, user_id, ?elapsed, error = %e, "stored cart could not be decoded")
            }
            Err(e) => warn!(
                op,
                user_id,
                ?elapsed,
                transient = e.is_transient(),
                error = %e,
                "cart store call failed"
            ),
        }

        result
    }
}

#[async_trait]
impl<S> CartStore for InstrumentedCartStore<S>
where
    S: CartStore,
{
    async fn add_item(&self, user_id: &str, product_id: &str, quantity: i32) -> Result<()> {
        self.observe(
            "add_item",
            user_id,
            self.inner.add_item(user_id, product_id, quantity),
        )
        .await
    }

    async fn get_cart(&self, user_id: &str) -> Result<Cart> {
        self.observe("get_cart", user_id, self.inner.get_cart(user_id))
            .await
    }

    async fn empty_cart(&self, user_id: &str) -> Result<()> {
        self.observe("empty_cart", user_id, self.inner.empty_cart(user_id))
            .await
    }

    async fn ping(&self) -> Result<()> {
        self.observe("ping", "", self.inner.ping()).await
    }
}
