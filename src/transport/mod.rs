//! The transport seam.
//!
//! The pipeline decides *what* to send; a [`Transport`] does the sending.
//! Connection setup, pooling, TLS and DNS all live behind this trait.
//!
//! A dispatch produces one of four shapes ([`DispatchOutcome`]):
//!
//! | Shape | Meaning |
//! |-------|---------|
//! | `Complete` | status, headers and the full body are available |
//! | `Deferred` | status and headers now, body via [`Transport::fetch_body`] |
//! | `Redirect` | a redirect the transport was allowed to follow but did not |
//! | `Async` | a handle plus a feed of low-level [`TransportEvent`]s |
//!
//! Two implementations ship with the crate: [`HttpTransport`] (reqwest) and
//! [`MemoryTransport`] (scripted, for tests and offline use).

mod gate;
mod http;
mod memory;

pub use gate::{GateRegistry, PullGate};
pub use http::HttpTransport;
pub use memory::{MemoryTransport, Scripted};

use crate::error::Result;
use crate::types::{AsyncHandle, AsyncId, AsyncMode, HeaderList, Method, Timeout, TlsOptions};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Transport-level options derived from the request options.
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    pub connect_timeout: Option<Timeout>,
    pub recv_timeout: Option<Timeout>,
    pub tls: Option<TlsOptions>,
    pub follow_redirect: Option<bool>,
    pub max_redirect: Option<u32>,
    /// Already resolved against the environment.
    pub proxy: Option<String>,
    pub proxy_auth: Option<(String, String)>,
    /// `Some` when the caller asked for an asynchronous handle.
    pub stream: Option<AsyncMode>,
    pub passthrough: BTreeMap<String, Value>,
}

/// Body as handed to the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransportBody {
    #[default]
    Empty,
    Bytes(Bytes),
    File(PathBuf),
}

/// Everything the transport needs for one call.
#[derive(Debug, Clone)]
pub struct TransportCall {
    pub method: Method,
    /// Final url, params already merged.
    pub url: String,
    pub headers: HeaderList,
    pub body: TransportBody,
    pub options: TransportOptions,
}

/// Reference to a response body that still has to be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyRef(pub u64);

/// An open request whose body is being pushed element by element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(pub u64);

/// Low-level event of a streamed exchange, as the transport reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Status(u16),
    Headers(HeaderList),
    Chunk(Bytes),
    Done,
    Error(String),
    Redirect { to: String, headers: HeaderList },
}

impl TransportEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransportEvent::Done | TransportEvent::Error(_) | TransportEvent::Redirect { .. }
        )
    }
}

/// Result shape of a dispatch.
#[derive(Debug)]
pub enum DispatchOutcome {
    Complete {
        status: u16,
        headers: HeaderList,
        body: Bytes,
    },
    Deferred {
        status: u16,
        headers: HeaderList,
        body: BodyRef,
    },
    Redirect {
        status: u16,
        to: String,
        headers: HeaderList,
    },
    Async {
        handle: AsyncHandle,
        events: mpsc::Receiver<TransportEvent>,
    },
}

/// The external HTTP transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request whose body is fully known.
    async fn dispatch(&self, call: TransportCall) -> Result<DispatchOutcome>;

    /// Fetch the body behind a `Deferred` outcome.
    async fn fetch_body(&self, body: BodyRef) -> Result<Bytes>;

    /// Release one more event of a pull-gated exchange.
    ///
    /// Fails with [`Error::HandleNotFound`](crate::Error::HandleNotFound)
    /// when `id` is unknown or already terminated.
    async fn advance(&self, id: &AsyncId) -> Result<()>;

    /// Start a request whose body will be pushed with
    /// [`Transport::send_element`]. `call.body` is ignored.
    async fn open_stream(&self, call: TransportCall) -> Result<StreamHandle>;

    async fn send_element(&self, stream: &StreamHandle, element: Bytes) -> Result<()>;

    /// All elements were sent; wait for the response.
    async fn finish_stream(&self, stream: StreamHandle) -> Result<DispatchOutcome>;

    /// Give up on an upload. The request is cancelled and `stream` is forgotten.
    async fn abort_stream(&self, stream: StreamHandle) -> Result<()>;
}
