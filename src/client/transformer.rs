//! Per-exchange relay from transport events to typed events.
//!
//! One [`AsyncTransformer`] owns one streamed exchange. It reads the
//! transport's low-level events in order, runs the response hooks on each
//! payload and forwards an [`AsyncEvent`] to the destination.
//!
//! # State Machine
//!
//! ```text
//! AwaitingStatus --status--> AwaitingHeaders --headers--> Streaming --chunk--> Streaming
//!       |                          |                          |
//!       +------ error / redirect --+-------- done / error / redirect --> Terminated
//! ```
//!
//! An event arriving in a state that does not accept it ends the exchange
//! with an error event, as does a feed that closes without a terminal event.
//! So the destination always sees at most one terminal event per id, and
//! nothing after it.
//!
//! If the destination goes away, the transformer stops quietly. Dropping
//! the transport feed then stops the transport side as well.
//!
//! # Receive timeout
//!
//! With a receive timeout set, each wait for the next event is bounded. For
//! a pull-gated exchange, waits after the first event are only timed once
//! the consumer has pulled: the transformer shares a [`PullGate`] with
//! [`Client::advance`](super::Client::advance) and starts the timer when it
//! consumes a permit, so a consumer that simply has not advanced yet never
//! trips the timeout.

use super::hooks::Hooks;
use crate::transport::{PullGate, TransportEvent};
use crate::types::{AsyncId, AsyncEvent, EventSink};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Position of an exchange in its event sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    AwaitingStatus,
    AwaitingHeaders,
    Streaming,
    Terminated,
}

/// Worker relaying one exchange. See the module docs.
pub struct AsyncTransformer<H> {
    id: AsyncId,
    hooks: Arc<H>,
    feed: mpsc::Receiver<TransportEvent>,
    destination: EventSink,
    recv_timeout: Option<Duration>,
    pulls: Option<PullGate>,
    state: StreamState,
}

impl<H: Hooks> AsyncTransformer<H> {
    pub fn new(
        id: AsyncId,
        hooks: Arc<H>,
        feed: mpsc::Receiver<TransportEvent>,
        destination: EventSink,
    ) -> Self {
        AsyncTransformer {
            id,
            hooks,
            feed,
            destination,
            recv_timeout: None,
            pulls: None,
            state: StreamState::AwaitingStatus,
        }
    }

    /// Fail the exchange if no event arrives within `limit`.
    pub fn with_recv_timeout(mut self, limit: Option<Duration>) -> Self {
        self.recv_timeout = limit;
        self
    }

    /// Time waits only after a permit of `pulls` has been consumed.
    pub fn with_pull_gate(mut self, pulls: PullGate) -> Self {
        self.pulls = Some(pulls);
        self
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Run on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        tracing::debug!(id = %self.id, "Async transformer started");

        while self.state != StreamState::Terminated {
            let next = self.next_event().await;
            let event = next.unwrap_or_else(|| {
                TransportEvent::Error("transport closed the event feed".to_string())
            });

            let out = self.transform(event);
            tracing::trace!(id = %self.id, state = ?self.state, "Relaying event");
            if self.destination.send(out).await.is_err() {
                tracing::debug!(id = %self.id, "Destination closed, dropping exchange");
                self.state = StreamState::Terminated;
            }
        }

        tracing::debug!(id = %self.id, "Async transformer finished");
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        let limit = match self.recv_timeout {
            Some(limit) => limit,
            None => return self.feed.recv().await,
        };

        if self.state != StreamState::AwaitingStatus {
            if let Some(pulls) = &self.pulls {
                let feed = &mut self.feed;
                let pulled = tokio::select! {
                    biased;
                    pulled = pulls.permit() => Ok(pulled),
                    next = feed.recv() => Err(next),
                };
                match pulled {
                    Ok(true) => {}
                    Ok(false) => return self.feed.recv().await,
                    // Already released before anyone pulled.
                    Err(next) => return next,
                }
            }
        }

        match tokio::time::timeout(limit, self.feed.recv()).await {
            Ok(next) => next,
            Err(_) => Some(TransportEvent::Error("recv timeout".to_string())),
        }
    }

    /// Apply one transport event: advance the state, return the event to
    /// forward.
    pub fn transform(&mut self, event: TransportEvent) -> AsyncEvent {
        let id = self.id;
        match (self.state, event) {
            (StreamState::Terminated, _) => {
                AsyncEvent::Error {
                    id,
                    reason: "event after exchange terminated".to_string(),
                }
            }
            (_, TransportEvent::Error(reason)) => {
                self.state = StreamState::Terminated;
                AsyncEvent::Error { id, reason }
            }
            (_, TransportEvent::Redirect { to, headers }) => {
                self.state = StreamState::Terminated;
                AsyncEvent::Redirect {
                    id,
                    to,
                    headers: self.hooks.process_response_headers(headers),
                }
            }
            (StreamState::AwaitingStatus, TransportEvent::Status(code)) => {
                self.state = StreamState::AwaitingHeaders;
                AsyncEvent::Status {
                    id,
                    code: self.hooks.process_response_status_code(code),
                }
            }
            (StreamState::AwaitingHeaders, TransportEvent::Headers(headers)) => {
                self.state = StreamState::Streaming;
                AsyncEvent::Headers {
                    id,
                    headers: self.hooks.process_response_headers(headers),
                }
            }
            (StreamState::Streaming, TransportEvent::Chunk(chunk)) => AsyncEvent::Chunk {
                id,
                chunk: self.hooks.process_response_chunk(chunk),
            },
            (StreamState::Streaming, TransportEvent::Done) => {
                self.state = StreamState::Terminated;
                AsyncEvent::End { id }
            }
            (state, event) => {
                self.state = StreamState::Terminated;
                AsyncEvent::Error {
                    id,
                    reason: format!("unexpected {} while {:?}", event_name(&event), state),
                }
            }
        }
    }
}

fn event_name(event: &TransportEvent) -> &'static str {
    match event {
        TransportEvent::Status(_) => "status",
        TransportEvent::Headers(_) => "headers",
        TransportEvent::Chunk(_) => "chunk",
        TransportEvent::Done => "completion",
        TransportEvent::Error(_) => "error",
        TransportEvent::Redirect { .. } => "redirect",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DefaultHooks;
    use bytes::Bytes;

    struct Shouting;

    impl Hooks for Shouting {
        fn process_response_status_code(&self, code: u16) -> u16 {
            code + 1
        }

        fn process_response_chunk(&self, chunk: Bytes) -> Bytes {
            Bytes::from(String::from_utf8_lossy(&chunk).to_uppercase())
        }
    }

    fn transformer<H: Hooks>(hooks: H) -> (AsyncTransformer<H>, mpsc::Sender<TransportEvent>, mpsc::Receiver<AsyncEvent>) {
        let (feed_tx, feed_rx) = mpsc::channel(8);
        let (dest_tx, dest_rx) = mpsc::channel(8);
        (
            AsyncTransformer::new(AsyncId::new(), Arc::new(hooks), feed_rx, dest_tx),
            feed_tx,
            dest_rx,
        )
    }

    #[test]
    fn test_happy_path_states() {
        let (mut t, _feed, _dest) = transformer(DefaultHooks);
        let id = t.id;
        assert_eq!(t.transform(TransportEvent::Status(200)), AsyncEvent::Status { id, code: 200 });
        assert_eq!(t.state(), StreamState::AwaitingHeaders);
        assert_eq!(
            t.transform(TransportEvent::Headers(vec![])),
            AsyncEvent::Headers { id, headers: vec![] }
        );
        assert_eq!(t.state(), StreamState::Streaming);
        t.transform(TransportEvent::Chunk(Bytes::from("a")));
        assert_eq!(t.state(), StreamState::Streaming);
        assert_eq!(t.transform(TransportEvent::Done), AsyncEvent::End { id });
        assert_eq!(t.state(), StreamState::Terminated);
    }

    #[test]
    fn test_hooks_apply_to_payloads() {
        let (mut t, _feed, _dest) = transformer(Shouting);
        let id = t.id;
        assert_eq!(t.transform(TransportEvent::Status(200)), AsyncEvent::Status { id, code: 201 });
        t.transform(TransportEvent::Headers(vec![]));
        assert_eq!(
            t.transform(TransportEvent::Chunk(Bytes::from("abc"))),
            AsyncEvent::Chunk { id, chunk: Bytes::from("ABC") }
        );
    }

    #[test]
    fn test_chunk_before_headers_terminates() {
        let (mut t, _feed, _dest) = transformer(DefaultHooks);
        t.transform(TransportEvent::Status(200));
        let event = t.transform(TransportEvent::Chunk(Bytes::from("x")));
        assert!(matches!(event, AsyncEvent::Error { .. }));
        assert_eq!(t.state(), StreamState::Terminated);
    }

    #[test]
    fn test_redirect_from_first_state() {
        let (mut t, _feed, _dest) = transformer(DefaultHooks);
        let event = t.transform(TransportEvent::Redirect {
            to: "http://b/".into(),
            headers: vec![("location".into(), "http://b/".into())],
        });
        assert!(matches!(event, AsyncEvent::Redirect { ref to, .. } if to == "http://b/"));
        assert_eq!(t.state(), StreamState::Terminated);
    }

    #[tokio::test]
    async fn test_closed_feed_yields_single_error() {
        let (t, feed, mut dest) = transformer(DefaultHooks);
        let id = t.id;
        feed.send(TransportEvent::Status(200)).await.unwrap();
        drop(feed);
        t.run().await;

        assert_eq!(dest.recv().await, Some(AsyncEvent::Status { id, code: 200 }));
        assert!(matches!(dest.recv().await, Some(AsyncEvent::Error { .. })));
        assert_eq!(dest.recv().await, None);
    }

    #[tokio::test]
    async fn test_nothing_after_terminal() {
        let (t, feed, mut dest) = transformer(DefaultHooks);
        for event in [
            TransportEvent::Status(200),
            TransportEvent::Error("reset".into()),
            TransportEvent::Headers(vec![]),
        ] {
            feed.send(event).await.unwrap();
        }
        t.run().await;

        let mut events = Vec::new();
        while let Some(event) = dest.recv().await {
            events.push(event);
        }
        assert_eq!(events.len(), 2);
        assert!(events[1].is_terminal());
    }

    #[tokio::test]
    async fn test_recv_timeout() {
        let (t, _feed, mut dest) = transformer(DefaultHooks);
        let t = t.with_recv_timeout(Some(Duration::from_millis(20)));
        t.run().await;
        assert!(matches!(
            dest.recv().await,
            Some(AsyncEvent::Error { reason, .. }) if reason == "recv timeout"
        ));
    }

    #[tokio::test]
    async fn test_recv_timer_waits_for_a_pull() {
        let (t, feed, mut dest) = transformer(DefaultHooks);
        let id = t.id;
        let pulls = crate::transport::GateRegistry::new();
        let t = t
            .with_recv_timeout(Some(Duration::from_millis(20)))
            .with_pull_gate(pulls.register(id, crate::types::AsyncMode::Once));
        let task = t.spawn();

        feed.send(TransportEvent::Status(200)).await.unwrap();
        assert_eq!(dest.recv().await, Some(AsyncEvent::Status { id, code: 200 }));
        let quiet = Duration::from_millis(100);
        assert!(tokio::time::timeout(quiet, dest.recv()).await.is_err());

        pulls.advance(&id).await.unwrap();
        assert!(matches!(
            dest.recv().await,
            Some(AsyncEvent::Error { reason, .. }) if reason == "recv timeout"
        ));
        task.await.unwrap();
        assert!(!pulls.contains(&id));
        drop(feed);
    }

    #[tokio::test]
    async fn test_closed_destination_stops_quietly() {
        let (t, feed, dest) = transformer(DefaultHooks);
        drop(dest);
        feed.send(TransportEvent::Status(200)).await.unwrap();
        let handle = t.spawn();
        handle.await.unwrap();
        assert!(feed.is_closed());
    }
}
