//! Turns a processed request into a transport call and normalizes what the
//! transport returns.
//!
//! # Result shapes
//!
//! - complete body: returned as is
//! - deferred body: fetched with [`Transport::fetch_body`]; a failed fetch
//!   fails the whole request
//! - unfollowed redirect: returned as a redirect
//! - async handle: an [`AsyncTransformer`] is spawned for it and the handle is
//!   returned at once
//!
//! Element-stream bodies are pushed one element at a time. The first failed
//! push aborts the upload and becomes the request's result; no response is
//! awaited in that case.
//!
//! Pulls of a gated exchange go through [`Dispatcher::advance`], which also
//! feeds the transformer's receive timer.

use super::config::EnvLookup;
use super::hooks::Hooks;
use super::transformer::AsyncTransformer;
use crate::error::{Error, Result};
use crate::protocol::constants::{headers as header_names, FORM_CONTENT_TYPE};
use crate::protocol::{encode_form, has_header, normalize_headers, resolve_proxy};
use crate::transport::{
    DispatchOutcome, GateRegistry, Transport, TransportBody, TransportCall, TransportOptions,
};
use crate::types::{AsyncHandle, AsyncId, AsyncMode, Body, HeaderList, Request, RequestOptions};
use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;

/// Raw result of a dispatch, before the response hooks run.
#[derive(Debug)]
pub enum Dispatched {
    Complete {
        status: u16,
        headers: HeaderList,
        body: Bytes,
    },
    Redirect {
        status: u16,
        to: String,
        headers: HeaderList,
    },
    Async(AsyncHandle),
}

/// Map request options onto transport options for `url`.
///
/// The proxy is resolved here (explicit option, then environment), and
/// `proxy_auth` is only carried along when a proxy was found.
pub fn transport_options(options: &RequestOptions, url: &str, env: &EnvLookup) -> TransportOptions {
    let lookup = |name: &str| env.get(name);
    let proxy = resolve_proxy(options.proxy.as_deref(), url, &lookup);
    let proxy_auth = proxy.as_ref().and(options.proxy_auth.clone());

    TransportOptions {
        connect_timeout: options.timeout,
        recv_timeout: options.recv_timeout,
        tls: options.tls_options.clone(),
        follow_redirect: options.follow_redirect,
        max_redirect: options.max_redirect,
        proxy,
        proxy_auth,
        stream: options.stream_to.as_ref().map(|_| options.async_mode),
        passthrough: options.transport.clone(),
    }
}

/// Sends processed requests through a [`Transport`].
pub struct Dispatcher<H> {
    transport: Arc<dyn Transport>,
    hooks: Arc<H>,
    env: EnvLookup,
    pulls: GateRegistry,
}

impl<H: Hooks> Dispatcher<H> {
    pub fn new(transport: Arc<dyn Transport>, hooks: Arc<H>, env: EnvLookup) -> Self {
        Dispatcher {
            transport,
            hooks,
            env,
            pulls: GateRegistry::new(),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Release one more event of the pull-gated exchange `id`.
    pub async fn advance(&self, id: &AsyncId) -> Result<()> {
        // Granted before the transport releases the event, so the transformer
        // never sees the event ahead of the pull.
        let _ = self.pulls.advance(id).await;
        self.transport.advance(id).await
    }

    /// Dispatch `request` to `url` (params already merged).
    pub async fn dispatch(&self, request: &Request, url: String) -> Result<Dispatched> {
        let options = request.options();
        let mut call = TransportCall {
            method: request.method(),
            headers: normalize_headers(request.headers()),
            options: transport_options(options, &url, &self.env),
            url,
            body: TransportBody::Empty,
        };

        let outcome = match request.body() {
            Body::Stream(elements) => {
                let stream = self.transport.open_stream(call).await?;
                let mut elements = elements.open();
                let mut sent = 0usize;
                while let Some(element) = elements.next().await {
                    if let Err(err) = self.transport.send_element(&stream, element).await {
                        tracing::warn!(sent, error = %err, "Aborting streamed request body");
                        if let Err(abort) = self.transport.abort_stream(stream).await {
                            tracing::debug!(error = %abort, "Upload already gone");
                        }
                        return Err(err);
                    }
                    sent += 1;
                }
                tracing::trace!(sent, "Streamed request body complete");
                self.transport.finish_stream(stream).await?
            }
            body => {
                call.body = self.transport_body(body, &mut call.headers);
                self.transport.dispatch(call).await?
            }
        };

        self.interpret(outcome, options).await
    }

    fn transport_body(&self, body: &Body, headers: &mut HeaderList) -> TransportBody {
        match body {
            Body::Empty => TransportBody::Empty,
            Body::Raw(bytes) => TransportBody::Bytes(bytes.clone()),
            Body::Form(pairs) => {
                if !has_header(headers, header_names::CONTENT_TYPE) {
                    headers.push((
                        header_names::CONTENT_TYPE.to_string(),
                        FORM_CONTENT_TYPE.to_string(),
                    ));
                }
                TransportBody::Bytes(Bytes::from(encode_form(pairs)))
            }
            Body::File(path) => TransportBody::File(path.clone()),
            // Streams never reach here; they go through `open_stream`.
            Body::Stream(_) => TransportBody::Empty,
        }
    }

    async fn interpret(&self, outcome: DispatchOutcome, options: &RequestOptions) -> Result<Dispatched> {
        match outcome {
            DispatchOutcome::Complete {
                status,
                headers,
                body,
            } => Ok(Dispatched::Complete {
                status,
                headers,
                body,
            }),
            DispatchOutcome::Deferred {
                status,
                headers,
                body,
            } => {
                let body = self.transport.fetch_body(body).await?;
                Ok(Dispatched::Complete {
                    status,
                    headers,
                    body,
                })
            }
            DispatchOutcome::Redirect {
                status,
                to,
                headers,
            } => Ok(Dispatched::Redirect {
                status,
                to,
                headers,
            }),
            DispatchOutcome::Async { handle, events } => {
                let destination = options.stream_to.clone().ok_or_else(|| {
                    Error::transport_for(
                        handle.id,
                        "transport streamed a request that asked for a synchronous result",
                    )
                })?;
                let recv_timeout = options.recv_timeout.and_then(|t| t.as_duration());
                let mut transformer =
                    AsyncTransformer::new(handle.id, self.hooks.clone(), events, destination)
                        .with_recv_timeout(recv_timeout);
                if options.async_mode == AsyncMode::Once && recv_timeout.is_some() {
                    let pulls = self.pulls.register(handle.id, AsyncMode::Once);
                    transformer = transformer.with_pull_gate(pulls);
                }
                transformer.spawn();
                Ok(Dispatched::Async(handle))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::subscription::event_channel;
    use crate::types::Timeout;

    #[test]
    fn test_option_mapping() {
        let (sink, _events) = event_channel(1);
        let options = RequestOptions::new()
            .with_timeout(100)
            .with_recv_timeout(Timeout::Infinite)
            .stream_to(sink)
            .once()
            .follow_redirects(Some(3))
            .with_transport_option("pool", "default");

        let mapped = transport_options(&options, "http://a.com", &EnvLookup::empty());
        assert_eq!(mapped.connect_timeout, Some(Timeout::Millis(100)));
        assert_eq!(mapped.recv_timeout, Some(Timeout::Infinite));
        assert_eq!(mapped.stream, Some(AsyncMode::Once));
        assert_eq!(mapped.follow_redirect, Some(true));
        assert_eq!(mapped.max_redirect, Some(3));
        assert_eq!(mapped.passthrough.get("pool"), Some(&serde_json::Value::from("default")));
    }

    #[test]
    fn test_sync_requests_are_not_streamed() {
        let mapped = transport_options(&RequestOptions::new().once(), "http://a.com", &EnvLookup::empty());
        assert_eq!(mapped.stream, None);
    }

    #[test]
    fn test_proxy_auth_requires_a_proxy() {
        let options = RequestOptions::new().with_proxy_auth("u", "p");
        let mapped = transport_options(&options, "https://a.com", &EnvLookup::empty());
        assert_eq!(mapped.proxy, None);
        assert_eq!(mapped.proxy_auth, None);

        let env = EnvLookup::from_pairs([("https_proxy", "http://p:1")]);
        let mapped = transport_options(&options, "https://a.com", &env);
        assert_eq!(mapped.proxy.as_deref(), Some("http://p:1"));
        assert_eq!(mapped.proxy_auth, Some(("u".to_string(), "p".to_string())));
    }
}
