//! Hook-driven HTTP client.
//!
//! This module provides the request/response pipeline, enabling callers to:
//!
//! - **Override** any subset of the request and response hooks
//! - **Merge** query params into the url at dispatch time
//! - **Stream** responses as typed events, pushed or pull gated
//! - **Retry** on retryable statuses by layering [`RetryingHooks`]
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── fetch        - Client and the pipeline entry points
//! ├── hooks        - Hooks trait and its defaults
//! ├── dispatch     - processed request to transport call, result shapes
//! ├── transformer  - per-exchange event relay state machine
//! ├── subscription - event destination helpers
//! ├── retry        - response-driven retry, backoff helpers
//! └── config       - client configuration
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Runs requests through a hook set |
//! | [`Hooks`] | Overridable transformation points |
//! | [`Dispatcher`] | Talks to the [`Transport`](crate::transport::Transport) |
//! | [`AsyncTransformer`] | Relays one streamed exchange |
//! | [`EventStream`] | Receiving side of a `stream_to` destination |
//! | [`RetryingHooks`] | Hook set retrying retryable responses |
//! | [`ClientConfig`] | Client configuration options |
//!
//! # Examples
//!
//! ## Creating a Client
//!
//! ```
//! use hookwire::client::{Client, ClientConfig};
//!
//! // Default configuration
//! let client = Client::new();
//!
//! // Custom configuration
//! let config = ClientConfig {
//!     event_buffer: 8,
//!     ..Default::default()
//! };
//! let client = Client::with_config(config);
//! ```
//!
//! ## Retrying client
//!
//! ```
//! use hookwire::client::{Client, DefaultHooks, RetryingHooks};
//!
//! let client = Client::with_hooks(RetryingHooks::new(DefaultHooks));
//! ```

mod config;
mod dispatch;
mod fetch;
mod hooks;
mod retry;
mod subscription;
mod transformer;

pub use config::{ClientConfig, EnvLookup};
pub use dispatch::{transport_options, Dispatched, Dispatcher};
pub use fetch::Client;
pub use hooks::{DefaultHooks, Hooks, Resend};
pub use retry::{
    exponential_backoff, is_retryable_status, RetryingHooks, ATTEMPT, DEFAULT_MAX_TRIES,
    MAX_TRIES,
};
pub use subscription::{event_channel, EventStream};
pub use transformer::{AsyncTransformer, StreamState};
