// shared/src/lib.rs

/// Error vocabulary shared by every cart store implementation.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Malformed caller input. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Backend unreachable or timed out. Callers may retry with backoff.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    /// Stored bytes could not be decoded. Retrying reproduces it.
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_))
    }
}

pub mod config;
