use crate::generated::cart_service_server::CartServiceServer;
use crate::server::CartServer;
use cart::ports::CartStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tonic_health::server::HealthReporter;
use tracing::{info, warn};

/// Publishes `CartService` health to the grpc health service based on store pings.
pub struct HealthWatcher {
    store: Arc<dyn CartStore>,
    reporter: HealthReporter,
    serving: Option<bool>,
}

impl HealthWatcher {
    pub fn new(store: Arc<dyn CartStore>, reporter: HealthReporter) -> Self {
        Self {
            store,
            reporter,
            serving: None,
        }
    }

    /// Ping the store once, update the reported status if it changed and
    /// return whether the store is healthy.
    pub async fn check(&mut self) -> bool {
        let healthy = match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Cart store health check failed: {}", e);
                false
            }
        };

        if self.serving != Some(healthy) {
            if healthy {
                self.reporter
                    .set_serving::<CartServiceServer<CartServer>>()
                    .await;
                info!("CartService health: SERVING");
            } else {
                self.reporter
                    .set_not_serving::<CartServiceServer<CartServer>>()
                    .await;
                warn!("CartService health: NOT_SERVING");
            }
            self.serving = Some(healthy);
        }

        healthy
    }

    pub async fn run(mut self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.check().await;
        }
    }
}
