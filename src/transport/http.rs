//! reqwest-backed transport.
//!
//! A reqwest client is built per call from [`TransportOptions`], so every
//! request gets exactly the timeouts, proxy, redirect policy and TLS settings
//! the pipeline resolved for it. Proxy detection by reqwest itself is turned
//! off; proxies come only from the options.
//!
//! Synchronous calls return the `Deferred` shape: status and headers as soon
//! as they arrive, the body on [`Transport::fetch_body`]. Streamed calls
//! return immediately and pump events from a spawned task.
//!
//! `http+unix://` urls are rejected; reqwest has no Unix socket connector.

use super::gate::{GateRegistry, PullGate};
use super::{
    BodyRef, DispatchOutcome, StreamHandle, Transport, TransportBody, TransportCall,
    TransportEvent, TransportOptions,
};
use crate::error::{Error, Result};
use crate::protocol::constants::{headers as header_names, schemes};
use crate::protocol::header_value;
use crate::types::{AsyncHandle, AsyncId, AsyncMode, HeaderList, Method};
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

/// Connect timeout used when the request does not set one.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(8);
/// Receive timeout used when the request does not set one.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(5);
/// Redirect bound when following is enabled without a maximum.
pub const DEFAULT_MAX_REDIRECT: u32 = 5;

const EVENT_FEED_CAPACITY: usize = 32;
const UPLOAD_CAPACITY: usize = 16;

type UploadSender = mpsc::Sender<std::result::Result<Bytes, std::io::Error>>;

struct PendingBody {
    response: reqwest::Response,
    recv_timeout: Option<Duration>,
}

struct Upload {
    sender: UploadSender,
    response: JoinHandle<reqwest::Result<reqwest::Response>>,
    options: TransportOptions,
}

/// Transport speaking real HTTP through reqwest.
#[derive(Default)]
pub struct HttpTransport {
    pending: Mutex<HashMap<u64, PendingBody>>,
    uploads: Mutex<HashMap<u64, Upload>>,
    gates: GateRegistry,
    next_ref: AtomicU64,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_ref(&self) -> u64 {
        self.next_ref.fetch_add(1, Ordering::SeqCst)
    }

    /// Build the request, without a body.
    fn prepare(&self, call: &TransportCall) -> Result<reqwest::RequestBuilder> {
        let unix = schemes::HTTP_UNIX.as_bytes();
        if call
            .url
            .as_bytes()
            .get(..unix.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(unix))
        {
            return Err(Error::transport("unix socket urls are not supported by HttpTransport"));
        }

        let client = build_client(&call.options)?;
        let mut builder = client.request(to_reqwest_method(call.method), &call.url);
        for (name, value) in &call.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        Ok(builder)
    }

    async fn with_body(
        builder: reqwest::RequestBuilder,
        body: &TransportBody,
    ) -> Result<reqwest::RequestBuilder> {
        Ok(match body {
            TransportBody::Empty => builder,
            TransportBody::Bytes(bytes) => builder.body(bytes.clone()),
            TransportBody::File(path) => {
                let contents = tokio::fs::read(path).await.map_err(|e| {
                    Error::transport(format!("cannot read {}: {}", path.display(), e))
                })?;
                builder.body(contents)
            }
        })
    }

    /// Turn a received response into the synchronous outcome shape.
    fn settle(&self, response: reqwest::Response, options: &TransportOptions) -> DispatchOutcome {
        let status = response.status().as_u16();
        let headers = header_list(&response);

        if let Some(to) = unfollowed_redirect(status, &headers, options) {
            return DispatchOutcome::Redirect {
                status,
                to,
                headers,
            };
        }

        let body_ref = self.next_ref();
        self.pending.lock().insert(
            body_ref,
            PendingBody {
                response,
                recv_timeout: recv_timeout(options),
            },
        );
        DispatchOutcome::Deferred {
            status,
            headers,
            body: BodyRef(body_ref),
        }
    }

    /// Start pumping events of a streamed exchange.
    fn spawn_exchange(
        &self,
        mode: AsyncMode,
        options: TransportOptions,
        response: BoxFuture<'static, Result<reqwest::Response>>,
    ) -> DispatchOutcome {
        let id = AsyncId::new();
        let (tx, rx) = mpsc::channel(EVENT_FEED_CAPACITY);
        let gate = self.gates.register(id, mode);

        tracing::debug!(%id, ?mode, "Starting streamed exchange");
        tokio::spawn(pump(gate, tx, options, response));

        DispatchOutcome::Async {
            handle: AsyncHandle::new(id),
            events: rx,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn dispatch(&self, call: TransportCall) -> Result<DispatchOutcome> {
        let builder = self.prepare(&call)?;
        let builder = Self::with_body(builder, &call.body).await?;

        match call.options.stream {
            Some(mode) => {
                let response = async move { builder.send().await.map_err(Error::from) }.boxed();
                Ok(self.spawn_exchange(mode, call.options, response))
            }
            None => {
                let response =
                    within(recv_timeout(&call.options), builder.send()).await?;
                Ok(self.settle(response, &call.options))
            }
        }
    }

    async fn fetch_body(&self, body: BodyRef) -> Result<Bytes> {
        let pending = self
            .pending
            .lock()
            .remove(&body.0)
            .ok_or_else(|| Error::transport(format!("unknown body reference {}", body.0)))?;
        within(pending.recv_timeout, pending.response.bytes()).await
    }

    async fn advance(&self, id: &AsyncId) -> Result<()> {
        self.gates.advance(id).await
    }

    async fn open_stream(&self, call: TransportCall) -> Result<StreamHandle> {
        let builder = self.prepare(&call)?;
        let (sender, rx) = mpsc::channel(UPLOAD_CAPACITY);
        let body = reqwest::Body::wrap_stream(ReceiverStream::new(rx));
        let response = tokio::spawn(builder.body(body).send());

        let handle = self.next_ref();
        self.uploads.lock().insert(
            handle,
            Upload {
                sender,
                response,
                options: call.options,
            },
        );
        Ok(StreamHandle(handle))
    }

    async fn send_element(&self, stream: &StreamHandle, element: Bytes) -> Result<()> {
        let sender = self
            .uploads
            .lock()
            .get(&stream.0)
            .map(|upload| upload.sender.clone())
            .ok_or_else(|| Error::transport(format!("unknown stream handle {}", stream.0)))?;
        sender
            .send(Ok(element))
            .await
            .map_err(|_| Error::transport("upload closed by the server"))
    }

    async fn finish_stream(&self, stream: StreamHandle) -> Result<DispatchOutcome> {
        let Upload {
            sender,
            response,
            options,
        } = self
            .uploads
            .lock()
            .remove(&stream.0)
            .ok_or_else(|| Error::transport(format!("unknown stream handle {}", stream.0)))?;
        // Closing the channel ends the request body.
        drop(sender);

        let response = async move {
            response
                .await
                .map_err(|e| Error::transport(format!("upload task failed: {}", e)))?
                .map_err(Error::from)
        }
        .boxed();

        match options.stream {
            Some(mode) => Ok(self.spawn_exchange(mode, options, response)),
            None => {
                let received = match recv_timeout(&options) {
                    Some(limit) => tokio::time::timeout(limit, response)
                        .await
                        .map_err(|_| Error::transport("recv timeout"))??,
                    None => response.await?,
                };
                Ok(self.settle(received, &options))
            }
        }
    }

    async fn abort_stream(&self, stream: StreamHandle) -> Result<()> {
        let upload = self
            .uploads
            .lock()
            .remove(&stream.0)
            .ok_or_else(|| Error::transport(format!("unknown stream handle {}", stream.0)))?;
        upload.response.abort();
        tracing::debug!(stream = stream.0, "Upload aborted");
        Ok(())
    }
}

async fn pump(
    mut gate: PullGate,
    feed: mpsc::Sender<TransportEvent>,
    options: TransportOptions,
    response: BoxFuture<'static, Result<reqwest::Response>>,
) {
    let response = match response.await {
        Ok(response) => response,
        Err(err) => {
            gate.deliver(&feed, TransportEvent::Error(err.to_string())).await;
            return;
        }
    };

    let status = response.status().as_u16();
    let headers = header_list(&response);
    if let Some(to) = unfollowed_redirect(status, &headers, &options) {
        gate.deliver(&feed, TransportEvent::Redirect { to, headers }).await;
        return;
    }

    if !gate.deliver(&feed, TransportEvent::Status(status)).await
        || !gate.deliver(&feed, TransportEvent::Headers(headers)).await
    {
        return;
    }

    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let event = match chunk {
            Ok(chunk) => TransportEvent::Chunk(chunk),
            Err(err) => TransportEvent::Error(err.to_string()),
        };
        if !gate.deliver(&feed, event).await {
            return;
        }
    }
    gate.deliver(&feed, TransportEvent::Done).await;
    tracing::trace!(id = %gate.id(), "Streamed exchange finished");
}

fn build_client(options: &TransportOptions) -> Result<reqwest::Client> {
    let connect_timeout = match options.connect_timeout {
        Some(timeout) => timeout.as_duration(),
        None => Some(DEFAULT_CONNECT_TIMEOUT),
    };

    let mut builder = reqwest::Client::builder();
    if let Some(limit) = connect_timeout {
        builder = builder.connect_timeout(limit);
    }

    builder = builder.redirect(match options.follow_redirect {
        Some(true) => reqwest::redirect::Policy::limited(
            options.max_redirect.unwrap_or(DEFAULT_MAX_REDIRECT) as usize,
        ),
        _ => reqwest::redirect::Policy::none(),
    });

    builder = match &options.proxy {
        Some(url) => {
            let mut proxy = reqwest::Proxy::all(url.as_str())?;
            if let Some((user, password)) = &options.proxy_auth {
                proxy = proxy.basic_auth(user, password);
            }
            builder.proxy(proxy)
        }
        None => builder.no_proxy(),
    };

    if let Some(tls) = &options.tls {
        if tls.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }
        for pem in &tls.root_certificates_pem {
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(pem)?);
        }
    }

    Ok(builder.build()?)
}

fn recv_timeout(options: &TransportOptions) -> Option<Duration> {
    match options.recv_timeout {
        Some(timeout) => timeout.as_duration(),
        None => Some(DEFAULT_RECV_TIMEOUT),
    }
}

async fn within<T>(
    limit: Option<Duration>,
    fut: impl Future<Output = reqwest::Result<T>>,
) -> Result<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::transport("recv timeout"))?
            .map_err(Error::from),
        None => fut.await.map_err(Error::from),
    }
}

/// Location of a redirect that was not followed although following was on.
fn unfollowed_redirect(
    status: u16,
    headers: &[(String, String)],
    options: &TransportOptions,
) -> Option<String> {
    if options.follow_redirect != Some(true) || !(300..400).contains(&status) {
        return None;
    }
    header_value(headers, header_names::LOCATION).map(str::to_string)
}

fn header_list(response: &reqwest::Response) -> HeaderList {
    response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Options => reqwest::Method::OPTIONS,
        Method::Head => reqwest::Method::HEAD,
    }
}
