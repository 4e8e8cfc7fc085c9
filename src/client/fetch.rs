//! The hook-driven client.
//!
//! Provides [`Client`], which runs every request through the [`Hooks`]
//! pipeline and hands the processed request to a [`Transport`].
//!
//! # Examples
//!
//! ## Simple GET request
//!
//! ```ignore
//! use hookwire::{Client, Headers, Params, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new();
//!     let outcome = client
//!         .get("example.com/get", Headers::new(), [("foo", "bar")], RequestOptions::new())
//!         .await?;
//!     if let Some(response) = outcome.into_response() {
//!         println!("Status: {}", response.status_code);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Derived client
//!
//! ```ignore
//! use hookwire::{Client, Hooks, HeaderList, Request};
//!
//! struct Authorized(String);
//!
//! impl Hooks for Authorized {
//!     fn process_request_headers(&self, request: &Request) -> HeaderList {
//!         let mut headers = hookwire::protocol::normalize_headers(request.headers());
//!         headers.push(("authorization".into(), format!("Bearer {}", self.0)));
//!         headers
//!     }
//! }
//!
//! let client = Client::with_hooks(Authorized("token".into()));
//! ```
//!
//! ## Streamed request
//!
//! ```ignore
//! use hookwire::{Client, Request, RequestOptions};
//!
//! let client = Client::new();
//! let (sink, mut events) = client.event_channel();
//! let request = Request::get("example.com/stream")?
//!     .with_options(RequestOptions::new().stream_to(sink).once());
//! let handle = client.request(request).await?.into_async().unwrap();
//!
//! // one event per advance
//! client.advance(&handle).await?;
//! let status = events.next().await;
//! ```

use super::config::ClientConfig;
use super::dispatch::{Dispatched, Dispatcher};
use super::hooks::{DefaultHooks, Hooks, Resend};
use super::subscription::{event_channel, EventStream};
use crate::error::Result;
use crate::protocol::merge_query;
use crate::transport::{HttpTransport, Transport};
use crate::types::{
    AsyncHandle, Body, EventSink, Headers, MaybeRedirect, Method, Outcome, Params, Request,
    RequestOptions, Response,
};
use async_trait::async_trait;
use std::sync::Arc;

/// HTTP client running requests through a hook set.
///
/// `Client` is cheap to clone; clones share the hooks, the transport and the
/// configuration.
///
/// # Features
///
/// - Overridable request/response hooks, defaults for the rest
/// - Query params merged into the url at dispatch time
/// - Synchronous responses or streamed events, optionally pull gated
/// - Element-stream request bodies
/// - Pluggable transport
pub struct Client<H = DefaultHooks> {
    hooks: Arc<H>,
    dispatcher: Arc<Dispatcher<H>>,
    config: Arc<ClientConfig>,
}

impl<H> Clone for Client<H> {
    fn clone(&self) -> Self {
        Client {
            hooks: self.hooks.clone(),
            dispatcher: self.dispatcher.clone(),
            config: self.config.clone(),
        }
    }
}

impl Client<DefaultHooks> {
    /// Create a client with default hooks and configuration over HTTP.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with default hooks and a custom configuration.
    pub fn with_config(config: ClientConfig) -> Self {
        Self::from_parts(DefaultHooks, Arc::new(HttpTransport::new()), config)
    }
}

impl Default for Client<DefaultHooks> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Hooks> Client<H> {
    /// Create a derived client over HTTP.
    pub fn with_hooks(hooks: H) -> Self {
        Self::from_parts(hooks, Arc::new(HttpTransport::new()), ClientConfig::default())
    }

    pub fn from_parts(hooks: H, transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        let hooks = Arc::new(hooks);
        let dispatcher = Dispatcher::new(transport, hooks.clone(), config.env.clone());
        Client {
            hooks,
            dispatcher: Arc::new(dispatcher),
            config: Arc::new(config),
        }
    }

    /// Swap the transport, keeping hooks and configuration.
    pub fn with_transport(self, transport: Arc<dyn Transport>) -> Self {
        let dispatcher = Dispatcher::new(transport, self.hooks.clone(), self.config.env.clone());
        Client {
            dispatcher: Arc::new(dispatcher),
            ..self
        }
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// A destination for `stream_to`, sized by `event_buffer`.
    pub fn event_channel(&self) -> (EventSink, EventStream) {
        event_channel(self.config.event_buffer)
    }

    /// Run `request` through the pipeline.
    ///
    /// Returns the outcome produced by [`Hooks::process_response`] for a
    /// synchronous response, the handle for a streamed one, or the redirect
    /// the transport declined to follow.
    pub async fn request(&self, request: Request) -> Result<Outcome> {
        let hooks = &self.hooks;

        let params = hooks.process_request_params(&request);
        let url = hooks.process_request_url(&request);
        let dispatch_url = merge_query(&url, &params);
        let headers = hooks.process_request_headers(&request);
        let body = hooks.process_request_body(&request);
        let options = hooks.process_request_options(&request);

        let processed = request
            .with_url(url)?
            .with_params(params)
            .with_headers(Headers::Pairs(headers))
            .with_body(body)
            .with_options(options);

        tracing::debug!(
            method = %processed.method(),
            url = %dispatch_url,
            streamed = processed.options().is_streamed(),
            "Dispatching request"
        );

        match self.dispatcher.dispatch(&processed, dispatch_url).await? {
            Dispatched::Complete {
                status,
                headers,
                body,
            } => {
                let response = Response {
                    status_code: hooks.process_response_status_code(status),
                    headers: hooks.process_response_headers(headers),
                    body: hooks.process_response_body(body),
                    request: processed,
                };
                tracing::debug!(status = response.status_code, "Response assembled");
                hooks.process_response(response, self).await
            }
            Dispatched::Redirect {
                status,
                to,
                headers,
            } => {
                tracing::debug!(status, to = %to, "Redirect not followed");
                Ok(Outcome::Redirect(MaybeRedirect {
                    status_code: hooks.process_response_status_code(status),
                    redirect_url: to,
                    headers: hooks.process_response_headers(headers),
                    request: processed,
                }))
            }
            Dispatched::Async(handle) => Ok(Outcome::Async(handle)),
        }
    }

    /// Like [`Client::request`], for callers that treat any failure as fatal.
    ///
    /// # Panics
    ///
    /// Panics with the error's message if the request fails.
    pub async fn request_or_panic(&self, request: Request) -> Outcome {
        match self.request(request).await {
            Ok(outcome) => outcome,
            Err(e) => panic!("request failed: {}", e),
        }
    }

    /// Release the next event of a pull-gated exchange.
    ///
    /// Fails with [`Error::HandleNotFound`](crate::Error::HandleNotFound) once
    /// the exchange has terminated or if the handle was never issued.
    pub async fn advance(&self, handle: &AsyncHandle) -> Result<()> {
        self.dispatcher.advance(&handle.id).await
    }

    pub async fn get(
        &self,
        url: impl Into<String>,
        headers: impl Into<Headers>,
        params: impl Into<Params>,
        options: RequestOptions,
    ) -> Result<Outcome> {
        self.bodiless(Method::Get, url, headers, params, options).await
    }

    pub async fn head(
        &self,
        url: impl Into<String>,
        headers: impl Into<Headers>,
        params: impl Into<Params>,
        options: RequestOptions,
    ) -> Result<Outcome> {
        self.bodiless(Method::Head, url, headers, params, options).await
    }

    pub async fn options(
        &self,
        url: impl Into<String>,
        headers: impl Into<Headers>,
        params: impl Into<Params>,
        options: RequestOptions,
    ) -> Result<Outcome> {
        self.bodiless(Method::Options, url, headers, params, options).await
    }

    pub async fn delete(
        &self,
        url: impl Into<String>,
        headers: impl Into<Headers>,
        params: impl Into<Params>,
        options: RequestOptions,
    ) -> Result<Outcome> {
        self.bodiless(Method::Delete, url, headers, params, options).await
    }

    pub async fn post(
        &self,
        url: impl Into<String>,
        body: impl Into<Body>,
        headers: impl Into<Headers>,
        params: impl Into<Params>,
        options: RequestOptions,
    ) -> Result<Outcome> {
        self.with_body(Method::Post, url, body, headers, params, options).await
    }

    pub async fn put(
        &self,
        url: impl Into<String>,
        body: impl Into<Body>,
        headers: impl Into<Headers>,
        params: impl Into<Params>,
        options: RequestOptions,
    ) -> Result<Outcome> {
        self.with_body(Method::Put, url, body, headers, params, options).await
    }

    pub async fn patch(
        &self,
        url: impl Into<String>,
        body: impl Into<Body>,
        headers: impl Into<Headers>,
        params: impl Into<Params>,
        options: RequestOptions,
    ) -> Result<Outcome> {
        self.with_body(Method::Patch, url, body, headers, params, options).await
    }

    async fn bodiless(
        &self,
        method: Method,
        url: impl Into<String>,
        headers: impl Into<Headers>,
        params: impl Into<Params>,
        options: RequestOptions,
    ) -> Result<Outcome> {
        self.with_body(method, url, Body::Empty, headers, params, options).await
    }

    async fn with_body(
        &self,
        method: Method,
        url: impl Into<String>,
        body: impl Into<Body>,
        headers: impl Into<Headers>,
        params: impl Into<Params>,
        options: RequestOptions,
    ) -> Result<Outcome> {
        let request = Request::new(method, url)?
            .with_body(body)
            .with_headers(headers)
            .with_params(params)
            .with_options(options);
        self.request(request).await
    }
}

#[async_trait]
impl<H: Hooks> Resend for Client<H> {
    async fn resend(&self, request: Request) -> Result<Outcome> {
        self.request(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryTransport, Scripted};
    use crate::Error;

    fn client(transport: MemoryTransport) -> (Client, Arc<MemoryTransport>) {
        let transport = Arc::new(transport);
        let client = Client::new().with_transport(transport.clone());
        (client, transport)
    }

    #[test]
    fn test_client_creation() {
        let client = Client::new();
        assert_eq!(client.config().event_buffer, 100);
    }

    #[tokio::test]
    async fn test_snapshot_is_the_processed_request() {
        let (client, _) = client(MemoryTransport::new().with_reply(Scripted::complete(200, "ok")));
        let response = client
            .get("example.com/x", [("a", "1")], [("q", "v")], RequestOptions::new())
            .await
            .unwrap()
            .into_response()
            .unwrap();

        assert_eq!(response.request.url(), "http://example.com/x");
        assert_eq!(response.request.params(), &Params::from([("q", "v")]));
        assert_eq!(
            response.request.headers(),
            &Headers::Pairs(vec![("a".into(), "1".into())])
        );
    }

    #[tokio::test]
    async fn test_convenience_methods_set_method() {
        let (client, transport) = client(
            MemoryTransport::new()
                .with_reply(Scripted::complete(204, ""))
                .with_reply(Scripted::complete(200, "")),
        );
        client
            .delete("example.com/1", Headers::new(), Params::new(), RequestOptions::new())
            .await
            .unwrap();
        client
            .patch("example.com/1", "x", Headers::new(), Params::new(), RequestOptions::new())
            .await
            .unwrap();

        let methods: Vec<_> = transport.calls().iter().map(|c| c.method).collect();
        assert_eq!(methods, vec![Method::Delete, Method::Patch]);
    }

    #[tokio::test]
    async fn test_empty_url_fails_before_dispatch() {
        let (client, transport) = client(MemoryTransport::new());
        let result = client
            .get("", Headers::new(), Params::new(), RequestOptions::new())
            .await;
        assert!(matches!(result, Err(Error::Construction(_))));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_initial_failure_is_an_error() {
        let (client, _) = client(MemoryTransport::new().with_reply(Scripted::Fail("refused".into())));
        let result = client.request(Request::get("example.com").unwrap()).await;
        assert!(matches!(result, Err(Error::Transport { .. })));
    }
}
