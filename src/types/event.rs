//! Typed events of a streamed exchange.

use super::{AsyncId, HeaderList};
use bytes::Bytes;
use tokio::sync::mpsc;

/// Destination a streamed exchange delivers its events to.
pub type EventSink = mpsc::Sender<AsyncEvent>;

/// One high-level event of a streamed exchange.
///
/// For a given `id` the destination sees `Status`, `Headers`, zero or more
/// `Chunk`s and then exactly one terminal event (`End`, `Redirect` or
/// `Error`). A redirect or error may also arrive before the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsyncEvent {
    /// Status line received.
    Status { id: AsyncId, code: u16 },
    /// Response headers received.
    Headers { id: AsyncId, headers: HeaderList },
    /// Body fragment, in transmission order.
    Chunk { id: AsyncId, chunk: Bytes },
    /// The transport declined to follow a redirect.
    Redirect {
        id: AsyncId,
        to: String,
        headers: HeaderList,
    },
    /// The exchange completed.
    End { id: AsyncId },
    /// The exchange failed.
    Error { id: AsyncId, reason: String },
}

impl AsyncEvent {
    pub fn id(&self) -> AsyncId {
        match self {
            AsyncEvent::Status { id, .. }
            | AsyncEvent::Headers { id, .. }
            | AsyncEvent::Chunk { id, .. }
            | AsyncEvent::Redirect { id, .. }
            | AsyncEvent::End { id }
            | AsyncEvent::Error { id, .. } => *id,
        }
    }

    /// Whether no further events follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AsyncEvent::End { .. } | AsyncEvent::Redirect { .. } | AsyncEvent::Error { .. }
        )
    }
}
