//! Receiving side of a streamed exchange.
//!
//! A request is streamed by setting `stream_to` to an [`EventSink`]. The
//! matching receiver can be used directly, or wrapped in an [`EventStream`]
//! which adds a few conveniences and implements [`Stream`].
//!
//! # Examples
//!
//! ```ignore
//! use hookwire::{Client, Request, RequestOptions};
//!
//! let client = Client::new();
//! let (sink, mut events) = client.event_channel();
//! let request = Request::get("http://example.com/stream")?
//!     .with_options(RequestOptions::new().stream_to(sink));
//! let handle = client.request(request).await?.into_async().unwrap();
//!
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event);
//!     if event.is_terminal() {
//!         break;
//!     }
//! }
//! ```

use crate::types::{AsyncEvent, AsyncId, EventSink};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Create a destination and the stream reading from it.
pub fn event_channel(capacity: usize) -> (EventSink, EventStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (tx, EventStream::new(rx))
}

/// Stream of [`AsyncEvent`]s arriving at a destination.
///
/// Several exchanges may share one destination; events of the same id always
/// arrive in order, events of different ids may interleave.
pub struct EventStream {
    receiver: mpsc::Receiver<AsyncEvent>,
}

impl EventStream {
    pub fn new(receiver: mpsc::Receiver<AsyncEvent>) -> Self {
        EventStream { receiver }
    }

    /// Next event, or `None` once every sender is gone.
    pub async fn next(&mut self) -> Option<AsyncEvent> {
        self.receiver.recv().await
    }

    /// Collect events of `id` up to and including its terminal event.
    ///
    /// Events of other exchanges received meanwhile are dropped.
    pub async fn until_terminal(&mut self, id: AsyncId) -> Vec<AsyncEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.receiver.recv().await {
            if event.id() != id {
                continue;
            }
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }

    /// Stop accepting events. Streams still delivering see a closed
    /// destination and stop.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

impl Stream for EventStream {
    type Item = AsyncEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_until_terminal_filters_by_id() {
        let (tx, mut events) = event_channel(8);
        let mine = AsyncId::new();
        let other = AsyncId::new();

        tx.send(AsyncEvent::Status { id: other, code: 500 }).await.unwrap();
        tx.send(AsyncEvent::Status { id: mine, code: 200 }).await.unwrap();
        tx.send(AsyncEvent::End { id: mine }).await.unwrap();
        tx.send(AsyncEvent::End { id: other }).await.unwrap();

        let seen = events.until_terminal(mine).await;
        assert_eq!(
            seen,
            vec![AsyncEvent::Status { id: mine, code: 200 }, AsyncEvent::End { id: mine }]
        );
        assert_eq!(events.next().await, Some(AsyncEvent::End { id: other }));
    }

    #[tokio::test]
    async fn test_stream_impl() {
        let (tx, events) = event_channel(4);
        let id = AsyncId::new();
        tx.send(AsyncEvent::End { id }).await.unwrap();
        drop(tx);
        let all: Vec<_> = StreamExt::collect(events).await;
        assert_eq!(all, vec![AsyncEvent::End { id }]);
    }
}
