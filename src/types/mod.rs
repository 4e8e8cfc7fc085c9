//! Core value types of the request/response model.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Request`] | Declarative description of one request |
//! | [`RequestOptions`] | Timeouts, proxy, TLS, streaming and custom options |
//! | [`Response`] | Fully assembled synchronous response |
//! | [`Outcome`] | What a dispatched request produced |
//! | [`AsyncHandle`] | Correlation token of a streamed exchange |
//! | [`AsyncEvent`] | Typed event delivered for a streamed exchange |
//!
//! Requests and responses are plain values: once built they are only read,
//! and hooks produce new values instead of mutating existing ones.

mod event;
mod options;
mod request;
mod response;

pub use event::{AsyncEvent, EventSink};
pub use options::{AsyncMode, RequestOptions, Timeout, TlsOptions};
pub use request::{Body, ElementStream, Headers, Params, Request};
pub use response::{MaybeRedirect, Outcome, Response};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Ordered `(name, value)` header pairs, the normalized header form.
pub type HeaderList = Vec<(String, String)>;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
}

impl Method {
    /// Upper-case method token as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            "HEAD" => Ok(Method::Head),
            other => Err(crate::Error::Construction(format!(
                "unsupported method: {}",
                other
            ))),
        }
    }
}

/// Opaque identifier of one in-flight streamed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AsyncId(Uuid);

impl AsyncId {
    /// Fresh random identifier.
    pub fn new() -> Self {
        AsyncId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AsyncId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AsyncId {
    fn from(id: Uuid) -> Self {
        AsyncId(id)
    }
}

impl fmt::Display for AsyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returned immediately when a request is streamed to a destination.
///
/// Every [`AsyncEvent`] of the exchange carries the same `id`. Pass the handle
/// to [`Client::advance`](crate::Client::advance) to pull the next event when
/// the request used [`AsyncMode::Once`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AsyncHandle {
    pub id: AsyncId,
}

impl AsyncHandle {
    pub fn new(id: AsyncId) -> Self {
        AsyncHandle { id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_round_trips_through_str() {
        for method in [
            Method::Get,
            Method::Post,
            Method::Put,
            Method::Patch,
            Method::Delete,
            Method::Options,
            Method::Head,
        ] {
            assert_eq!(method.as_str().parse::<Method>().unwrap(), method);
        }
        assert_eq!("patch".parse::<Method>().unwrap(), Method::Patch);
    }

    #[test]
    fn test_unknown_method() {
        assert!(matches!(
            "BREW".parse::<Method>(),
            Err(crate::Error::Construction(_))
        ));
    }

    #[test]
    fn test_async_ids_are_distinct() {
        assert_ne!(AsyncId::new(), AsyncId::new());
    }
}
