mod generated;
mod server;

use cart::ports::CartStore;
use cart::{InstrumentedCartStore, KvCartStore, StoreOptions};
use shared::config::{Backend, Config};
use std::net::ToSocketAddrs;
use std::sync::Arc;
use storage_engine::{ConnectionObserver, MokaBackend, RedisBackend};
use tokio::task::JoinHandle;
use tonic::transport::Server;
use tonic_reflection::server::Builder as ReflectionBuilder;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::generated::FILE_DESCRIPTOR_SET;
use crate::generated::cart_service_server::CartServiceServer;
use crate::server::CartServer;
use crate::server::health::HealthWatcher;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting Cart gRPC Server...");

    match dotenvy::dotenv() {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env();
    let Some(backend) = config.backend.clone() else {
        error!("REDIS_ADDR is not set; the cart service needs a key-value backend (host:port or memory://)");
        return Err("REDIS_ADDR environment variable is required".into());
    };

    // The store is a hard dependency: no traffic is served until it answers.
    let (store, observer_task) = match open_store(&config, &backend).await {
        Ok(opened) => opened,
        Err(e) => {
            error!("Failed to initialize {} cart store: {}", backend.scheme(), e);
            return Err(e.into());
        }
    };
    info!("Cart store initialization completed");

    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    let mut watcher = HealthWatcher::new(Arc::clone(&store), health_reporter);
    watcher.check().await;
    let health_task = tokio::spawn(watcher.run(config.health_interval));

    let reflection_service = ReflectionBuilder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .register_encoded_file_descriptor_set(tonic_health::pb::FILE_DESCRIPTOR_SET)
        .build_v1()?;

    let address = config.address();
    let socket_addr = address
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| format!("could not resolve listen address {}", address))?;

    info!("Server Listening on: grpc://{}", address);

    let result = Server::builder()
        .add_service(health_service)
        .add_service(reflection_service)
        .add_service(CartServiceServer::new(CartServer::new(Arc::clone(&store))))
        .serve_with_shutdown(socket_addr, shutdown_signal())
        .await;

    health_task.abort();
    if let Some(task) = observer_task {
        task.abort();
    }
    drop(store);
    info!("Cart store connection closed");

    if let Err(e) = result {
        error!("server error: {}", e);
        return Err(e.into());
    }

    info!("Cart server stopped");
    Ok(())
}

/// Open the configured store. The redis variant also starts a connection
/// observer over the store's own connection handle.
async fn open_store(
    config: &Config,
    backend: &Backend,
) -> shared::Result<(Arc<dyn CartStore>, Option<JoinHandle<()>>)> {
    let options = StoreOptions {
        key_prefix: config.key_prefix.clone(),
        ttl: config.cart_ttl,
        op_timeout: config.store_timeout,
    };

    match backend {
        Backend::Memory => {
            warn!("Using in-process cart backend; carts are lost on restart");
            let backend = MokaBackend::new("carts", Some(config.memory_max_carts));
            let store = KvCartStore::connect(backend, options).await?;
            Ok((Arc::new(InstrumentedCartStore::new(store)), None))
        }
        Backend::Redis(url) => {
            let backend = RedisBackend::connect(url, config.store_timeout).await?;
            let store = InstrumentedCartStore::new(KvCartStore::connect(backend, options).await?);

            let observer = ConnectionObserver::attach(store.inner().backend());
            info!("Observing redis connection to {}", observer.address());
            let task = tokio::spawn(observer.run(config.health_interval));

            Ok((Arc::new(store), Some(task)))
        }
    }
}

// Graceful shutdown handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
