//! Scripted in-memory transport.
//!
//! Replies are queued up front and consumed one per dispatch, in order. Every
//! call is recorded so tests can assert on exactly what the pipeline sent.
//!
//! ```
//! use hookwire::transport::{MemoryTransport, Scripted};
//!
//! let transport = MemoryTransport::new()
//!     .with_reply(Scripted::complete(429, ""))
//!     .with_reply(Scripted::complete(200, "ok"));
//! assert_eq!(transport.remaining(), 2);
//! ```

use super::gate::GateRegistry;
use super::{
    BodyRef, DispatchOutcome, StreamHandle, Transport, TransportCall, TransportEvent,
};
use crate::error::{Error, Result};
use crate::types::{AsyncHandle, AsyncId, AsyncMode, HeaderList};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// One scripted transport reply.
#[derive(Debug, Clone)]
pub enum Scripted {
    Complete {
        status: u16,
        headers: HeaderList,
        body: Bytes,
    },
    /// Body delivered through `fetch_body`; `Err` makes that fetch fail.
    Deferred {
        status: u16,
        headers: HeaderList,
        body: std::result::Result<Bytes, String>,
    },
    Redirect {
        status: u16,
        to: String,
        headers: HeaderList,
    },
    /// Raw event sequence for a streamed call.
    Events(Vec<TransportEvent>),
    /// Like `Events`, but the exchange stays open after the last event.
    Hang(Vec<TransportEvent>),
    /// The call itself fails before any status is known.
    Fail(String),
}

impl Scripted {
    pub fn complete(status: u16, body: impl Into<Bytes>) -> Self {
        Scripted::Complete {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Event sequence a successful streamed exchange produces.
    fn into_events(self) -> Result<Vec<TransportEvent>> {
        Ok(match self {
            Scripted::Events(events) | Scripted::Hang(events) => events,
            Scripted::Complete {
                status,
                headers,
                body,
            } => streamed(status, headers, Ok(body)),
            Scripted::Deferred {
                status,
                headers,
                body,
            } => streamed(status, headers, body),
            Scripted::Redirect { to, headers, .. } => vec![TransportEvent::Redirect { to, headers }],
            Scripted::Fail(reason) => return Err(Error::transport(reason)),
        })
    }
}

fn streamed(
    status: u16,
    headers: HeaderList,
    body: std::result::Result<Bytes, String>,
) -> Vec<TransportEvent> {
    let mut events = vec![TransportEvent::Status(status), TransportEvent::Headers(headers)];
    match body {
        Ok(body) => {
            if !body.is_empty() {
                events.push(TransportEvent::Chunk(body));
            }
            events.push(TransportEvent::Done);
        }
        Err(reason) => events.push(TransportEvent::Error(reason)),
    }
    events
}

#[derive(Debug)]
struct Upload {
    call: TransportCall,
    elements: Vec<Bytes>,
}

/// Transport answering from a queue of [`Scripted`] replies.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    replies: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<TransportCall>>,
    bodies: Mutex<HashMap<u64, std::result::Result<Bytes, String>>>,
    uploads: Mutex<HashMap<u64, Upload>>,
    uploaded: Mutex<Vec<Vec<Bytes>>>,
    aborted: Mutex<Vec<Vec<Bytes>>>,
    reject_element_at: Mutex<Option<usize>>,
    fetches: AtomicU64,
    next_ref: AtomicU64,
    gates: GateRegistry,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, reply: Scripted) -> Self {
        self.replies.lock().push_back(reply);
        self
    }

    pub fn push_reply(&self, reply: Scripted) {
        self.replies.lock().push_back(reply);
    }

    /// Reject the `index`-th pushed element (zero based) of every upload.
    pub fn reject_element_at(self, index: usize) -> Self {
        *self.reject_element_at.lock() = Some(index);
        self
    }

    /// Calls seen so far, in order. Streamed uploads appear once opened.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    /// Elements of every upload that reached `finish_stream`.
    pub fn uploaded(&self) -> Vec<Vec<Bytes>> {
        self.uploaded.lock().clone()
    }

    /// Elements accepted by uploads that were aborted.
    pub fn aborted_uploads(&self) -> Vec<Vec<Bytes>> {
        self.aborted.lock().clone()
    }

    /// Elements accepted so far by uploads still open.
    pub fn unfinished_uploads(&self) -> Vec<Vec<Bytes>> {
        self.uploads
            .lock()
            .values()
            .map(|upload| upload.elements.clone())
            .collect()
    }

    pub fn body_fetches(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().len()
    }

    pub fn gates(&self) -> &GateRegistry {
        &self.gates
    }

    fn next_reply(&self) -> Result<Scripted> {
        self.replies
            .lock()
            .pop_front()
            .ok_or_else(|| Error::transport("no scripted reply left"))
    }

    fn respond(&self, call: &TransportCall, reply: Scripted) -> Result<DispatchOutcome> {
        if let Some(mode) = call.options.stream {
            let hang = matches!(reply, Scripted::Hang(_));
            let events = reply.into_events()?;
            return Ok(self.spawn_exchange(mode, events, hang));
        }

        match reply {
            Scripted::Complete {
                status,
                headers,
                body,
            } => Ok(DispatchOutcome::Complete {
                status,
                headers,
                body,
            }),
            Scripted::Deferred {
                status,
                headers,
                body,
            } => {
                let body_ref = self.next_ref.fetch_add(1, Ordering::SeqCst);
                self.bodies.lock().insert(body_ref, body);
                Ok(DispatchOutcome::Deferred {
                    status,
                    headers,
                    body: BodyRef(body_ref),
                })
            }
            Scripted::Redirect {
                status,
                to,
                headers,
            } => Ok(DispatchOutcome::Redirect {
                status,
                to,
                headers,
            }),
            Scripted::Events(_) | Scripted::Hang(_) => Err(Error::transport(
                "scripted event sequence needs a streamed call",
            )),
            Scripted::Fail(reason) => Err(Error::transport(reason)),
        }
    }

    fn spawn_exchange(
        &self,
        mode: AsyncMode,
        events: Vec<TransportEvent>,
        hang: bool,
    ) -> DispatchOutcome {
        let id = AsyncId::new();
        let (tx, rx) = mpsc::channel(16);
        let mut gate = self.gates.register(id, mode);

        tokio::spawn(async move {
            for event in events {
                if !gate.deliver(&tx, event).await {
                    return;
                }
            }
            if hang {
                // Gate stays registered until the receiver goes away.
                tx.closed().await;
            }
            drop(gate);
        });

        DispatchOutcome::Async {
            handle: AsyncHandle::new(id),
            events: rx,
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn dispatch(&self, call: TransportCall) -> Result<DispatchOutcome> {
        self.calls.lock().push(call.clone());
        let reply = self.next_reply()?;
        self.respond(&call, reply)
    }

    async fn fetch_body(&self, body: BodyRef) -> Result<Bytes> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.bodies.lock().remove(&body.0) {
            Some(Ok(bytes)) => Ok(bytes),
            Some(Err(reason)) => Err(Error::transport(reason)),
            None => Err(Error::transport(format!("unknown body reference {}", body.0))),
        }
    }

    async fn advance(&self, id: &AsyncId) -> Result<()> {
        self.gates.advance(id).await
    }

    async fn open_stream(&self, call: TransportCall) -> Result<StreamHandle> {
        self.calls.lock().push(call.clone());
        let handle = self.next_ref.fetch_add(1, Ordering::SeqCst);
        self.uploads.lock().insert(
            handle,
            Upload {
                call,
                elements: Vec::new(),
            },
        );
        Ok(StreamHandle(handle))
    }

    async fn send_element(&self, stream: &StreamHandle, element: Bytes) -> Result<()> {
        let reject_at = *self.reject_element_at.lock();
        let mut uploads = self.uploads.lock();
        let upload = uploads
            .get_mut(&stream.0)
            .ok_or_else(|| Error::transport(format!("unknown stream handle {}", stream.0)))?;
        if reject_at == Some(upload.elements.len()) {
            return Err(Error::transport("element rejected by transport"));
        }
        upload.elements.push(element);
        Ok(())
    }

    async fn finish_stream(&self, stream: StreamHandle) -> Result<DispatchOutcome> {
        let upload = self
            .uploads
            .lock()
            .remove(&stream.0)
            .ok_or_else(|| Error::transport(format!("unknown stream handle {}", stream.0)))?;
        self.uploaded.lock().push(upload.elements);
        let reply = self.next_reply()?;
        self.respond(&upload.call, reply)
    }

    async fn abort_stream(&self, stream: StreamHandle) -> Result<()> {
        let upload = self
            .uploads
            .lock()
            .remove(&stream.0)
            .ok_or_else(|| Error::transport(format!("unknown stream handle {}", stream.0)))?;
        self.aborted.lock().push(upload.elements);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{TransportBody, TransportOptions};
    use crate::types::Method;

    fn call(stream: Option<AsyncMode>) -> TransportCall {
        TransportCall {
            method: Method::Get,
            url: "http://example.com".into(),
            headers: Vec::new(),
            body: TransportBody::Empty,
            options: TransportOptions {
                stream,
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_replies_are_consumed_in_order() {
        let transport = MemoryTransport::new()
            .with_reply(Scripted::complete(201, "a"))
            .with_reply(Scripted::Fail("boom".into()));

        match transport.dispatch(call(None)).await.unwrap() {
            DispatchOutcome::Complete { status, body, .. } => {
                assert_eq!(status, 201);
                assert_eq!(body, Bytes::from("a"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(transport.dispatch(call(None)).await.is_err());
        assert!(transport.dispatch(call(None)).await.is_err());
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_deferred_body_is_fetched_once() {
        let transport = MemoryTransport::new().with_reply(Scripted::Deferred {
            status: 200,
            headers: vec![],
            body: Ok(Bytes::from("late")),
        });
        let body_ref = match transport.dispatch(call(None)).await.unwrap() {
            DispatchOutcome::Deferred { body, .. } => body,
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert_eq!(transport.fetch_body(body_ref).await.unwrap(), Bytes::from("late"));
        assert!(transport.fetch_body(body_ref).await.is_err());
    }

    #[tokio::test]
    async fn test_complete_reply_streams_as_events() {
        let transport = MemoryTransport::new().with_reply(Scripted::complete(200, "hi"));
        let mut events = match transport
            .dispatch(call(Some(AsyncMode::Continuous)))
            .await
            .unwrap()
        {
            DispatchOutcome::Async { events, .. } => events,
            other => panic!("unexpected outcome: {:?}", other),
        };
        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            seen.push(event);
        }
        assert_eq!(
            seen,
            vec![
                TransportEvent::Status(200),
                TransportEvent::Headers(vec![]),
                TransportEvent::Chunk(Bytes::from("hi")),
                TransportEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_rejected_element() {
        let transport = MemoryTransport::new().reject_element_at(1);
        let handle = transport.open_stream(call(None)).await.unwrap();
        transport.send_element(&handle, Bytes::from("0")).await.unwrap();
        assert!(transport.send_element(&handle, Bytes::from("1")).await.is_err());
        assert_eq!(transport.unfinished_uploads(), vec![vec![Bytes::from("0")]]);

        transport.abort_stream(handle).await.unwrap();
        assert!(transport.unfinished_uploads().is_empty());
        assert_eq!(transport.aborted_uploads(), vec![vec![Bytes::from("0")]]);
        assert!(transport.abort_stream(handle).await.is_err());
    }
}
