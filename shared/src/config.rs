use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Where the cart payloads live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Remote Redis endpoint, normalised to a `redis://` or `rediss://` url.
    Redis(String),
    /// In-process store for local development. Carts do not survive a restart.
    Memory,
}

impl Backend {
    /// Parse a `REDIS_ADDR` style value.
    ///
    /// Accepts `host:port`, `redis://...`, `rediss://...` and `memory://`.
    pub fn parse(addr: &str) -> Option<Self> {
        let addr = addr.trim();
        if addr.is_empty() {
            return None;
        }
        if addr.starts_with("memory://") {
            return Some(Backend::Memory);
        }
        if addr.starts_with("redis://") || addr.starts_with("rediss://") {
            return Some(Backend::Redis(addr.to_string()));
        }
        Some(Backend::Redis(format!("redis://{}", addr)))
    }

    pub fn scheme(&self) -> &str {
        match self {
            Backend::Redis(url) if url.starts_with("rediss://") => "rediss",
            Backend::Redis(_) => "redis",
            Backend::Memory => "memory",
        }
    }
}

pub struct Config {
    pub host: String,
    pub port: u16,
    /// `None` when `REDIS_ADDR` is unset; the binary refuses to start in that case.
    pub backend: Option<Backend>,
    pub key_prefix: String,
    pub cart_ttl: Option<Duration>,
    pub store_timeout: Duration,
    pub health_interval: Duration,
    pub memory_max_carts: u64,
}

impl Config {
    const DEFAULT_HOST: &str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 7070;
    const DEFAULT_KEY_PREFIX: &str = "cart:";
    const DEFAULT_CART_TTL_SECS: u64 = 3600;
    const DEFAULT_STORE_TIMEOUT_MS: u64 = 2000;
    const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 5;
    const DEFAULT_MEMORY_MAX_CARTS: u64 = 100_000;

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("CART_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let port = parse_or(&lookup, "CART_SERVICE_PORT", Self::DEFAULT_PORT);
        let backend = lookup("REDIS_ADDR").and_then(|addr| Backend::parse(&addr));

        let ttl_secs = parse_or(&lookup, "CART_TTL_SECS", Self::DEFAULT_CART_TTL_SECS);
        let timeout_ms = parse_or(
            &lookup,
            "CART_STORE_TIMEOUT_MS",
            Self::DEFAULT_STORE_TIMEOUT_MS,
        );
        let health_secs = parse_or(
            &lookup,
            "CART_HEALTH_INTERVAL_SECS",
            Self::DEFAULT_HEALTH_INTERVAL_SECS,
        );

        Self {
            host,
            port,
            backend,
            key_prefix: lookup("CART_KEY_PREFIX")
                .unwrap_or_else(|| Self::DEFAULT_KEY_PREFIX.to_string()),
            cart_ttl: (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)),
            store_timeout: Duration::from_millis(timeout_ms.max(1)),
            health_interval: Duration::from_secs(health_secs.max(1)),
            memory_max_carts: parse_or(
                &lookup,
                "CART_MEMORY_MAX_CARTS",
                Self::DEFAULT_MEMORY_MAX_CARTS,
            ),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", name, raw, default);
            default
        }),
        None => default,
    }
}
