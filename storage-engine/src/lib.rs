mod moka_backend;
mod redis_backend;
mod telemetry;

#[cfg(test)]
mod fake_redis;

pub use moka_backend::MokaBackend;
pub use redis_backend::RedisBackend;
pub use telemetry::ConnectionObserver;
