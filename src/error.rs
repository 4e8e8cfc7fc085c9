//! Error types for the hook pipeline and its transports.
//!
//! Every failure the crate can surface is a variant of [`Error`]. Transport
//! failures are always terminal for the exchange that produced them; the
//! pipeline never hands back a partially filled response.

use crate::types::AsyncId;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while building, dispatching or streaming a request.
#[derive(Debug, Error)]
pub enum Error {
    /// The request could not be constructed (for example an empty url).
    #[error("invalid request: {0}")]
    Construction(String),

    /// The transport failed. `reason` is whatever the transport reported.
    #[error("transport error: {reason}")]
    Transport {
        /// Exchange the failure belongs to, when it was streamed.
        id: Option<AsyncId>,
        /// Opaque, transport-supplied description.
        reason: String,
    },

    /// A bounded retry policy gave up.
    #[error("retry limit reached after {attempts} attempts (max_tries = {max_tries})")]
    RetryExhausted {
        /// Number of attempts made, including the first one.
        attempts: u32,
        /// Configured bound.
        max_tries: u32,
    },

    /// `advance` was called for an exchange the transport does not know.
    #[error("no in-flight exchange with id {0}")]
    HandleNotFound(AsyncId),

    /// Response body could not be decoded as JSON.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a transport failure not tied to a streamed exchange.
    pub fn transport(reason: impl Into<String>) -> Self {
        Error::Transport {
            id: None,
            reason: reason.into(),
        }
    }

    /// Transport failure for a streamed exchange.
    pub fn transport_for(id: AsyncId, reason: impl Into<String>) -> Self {
        Error::Transport {
            id: Some(id),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::transport(err.to_string())
    }
}
