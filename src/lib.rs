//! # Hookwire: an extensible HTTP client
//!
//! Hookwire runs every request through a fixed pipeline of overridable
//! hooks before handing it to a transport, and runs every response back
//! through the matching response hooks. A specialized API client is just a
//! [`Hooks`] implementation that overrides the few steps it cares about.
//!
//! ## Overview
//!
//! A request goes through these steps:
//!
//! 1. **Request hooks** - params, url, headers, body and options are each
//!    transformed by their own hook
//! 2. **Query merge** - params are appended to the url's query string
//! 3. **Dispatch** - the processed request becomes a transport call
//! 4. **Response hooks** - status, headers and body are transformed, then
//!    the assembled response goes through a final hook that may replace it,
//!    or send the request again
//!
//! Streamed requests skip step 4's final hook: an async transformer relays
//! each transport event to the caller's destination as a typed
//! [`AsyncEvent`], applying the status, headers and chunk hooks on the way.
//!
//! ## Key Features
//!
//! - **Overridable hooks**: ten hooks, each with a default
//! - **Query merge**: existing query pairs are kept, params are appended
//! - **Streaming**: continuous push, or pull gated with [`Client::advance`]
//! - **Element-stream bodies**: request bodies produced lazily, element by element
//! - **Proxy resolution**: explicit option, then `HTTPS_PROXY`/`HTTP_PROXY`,
//!   honoring `NO_PROXY`
//! - **Retry**: [`client::RetryingHooks`] retries retryable statuses with
//!   exponential backoff, bounded by a per-request `max_tries`
//! - **Pluggable transport**: reqwest-backed [`transport::HttpTransport`], or
//!   the scripted [`transport::MemoryTransport`]
//!
//! ## Client Usage
//!
//! ```ignore
//! use hookwire::{Client, Headers, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new();
//!
//!     // GET http://example.com/get?foo=bar&baz=bong
//!     let outcome = client
//!         .get(
//!             "example.com/get",
//!             Headers::new(),
//!             [("foo", "bar"), ("baz", "bong")],
//!             RequestOptions::new(),
//!         )
//!         .await?;
//!
//!     let response = outcome.into_response().expect("synchronous response");
//!     println!("{} {}", response.status_code, response.text());
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming Usage
//!
//! ```ignore
//! use hookwire::{AsyncEvent, Client, Request, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new();
//!     let (sink, mut events) = client.event_channel();
//!
//!     let request = Request::get("example.com/stream")?
//!         .with_options(RequestOptions::new().stream_to(sink));
//!     let handle = client.request(request).await?.into_async().expect("handle");
//!
//!     for event in events.until_terminal(handle.id).await {
//!         if let AsyncEvent::Chunk { chunk, .. } = event {
//!             println!("{} bytes", chunk.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Request, response and event data model
//! - **[error]** - Error types and result handling
//! - **[client]** - Hook pipeline, dispatcher, async transformer, retry
//! - **[transport]** - Transport seam, pull gating, HTTP and in-memory transports
//! - **[protocol]** - Pure helpers: url schemes, headers, query merge, proxies, curl

pub mod client;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod types;

pub use client::{Client, DefaultHooks, Hooks};
pub use error::{Error, Result};
pub use types::{
    AsyncEvent, AsyncHandle, AsyncId, AsyncMode, Body, ElementStream, EventSink, HeaderList,
    Headers, MaybeRedirect, Method, Outcome, Params, Request, RequestOptions, Response, Timeout,
    TlsOptions,
};
