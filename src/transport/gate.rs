//! Pull gating for streamed exchanges.
//!
//! Each in-flight exchange registers a permit counter under its id. A
//! transport's event pump calls [`PullGate::deliver`] for every event; in
//! [`AsyncMode::Once`] every event after the first consumes one permit, and
//! each [`GateRegistry::advance`] adds exactly one. Permits accumulate, so
//! two advances issued back to back release two events.
//!
//! The id is unregistered just before the terminal event goes out, so an
//! `advance` issued after the consumer has seen the terminal event fails
//! with `HandleNotFound`.

use super::TransportEvent;
use crate::error::{Error, Result};
use crate::types::{AsyncId, AsyncMode};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

#[derive(Debug)]
struct Entry {
    permits: Arc<Semaphore>,
    mode: AsyncMode,
}

/// Live exchanges and their permit counters.
#[derive(Debug, Clone, Default)]
pub struct GateRegistry {
    entries: Arc<Mutex<HashMap<AsyncId, Entry>>>,
}

impl GateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` and return the gate its event pump waits on.
    pub fn register(&self, id: AsyncId, mode: AsyncMode) -> PullGate {
        let permits = Arc::new(Semaphore::new(0));
        self.entries.lock().insert(
            id,
            Entry {
                permits: permits.clone(),
                mode,
            },
        );
        PullGate {
            id,
            registry: self.clone(),
            permits: match mode {
                AsyncMode::Once => Some(permits),
                AsyncMode::Continuous => None,
            },
            delivered: 0,
        }
    }

    /// Grant `id` one more event.
    ///
    /// Continuous exchanges never wait, so nothing is recorded for them.
    pub async fn advance(&self, id: &AsyncId) -> Result<()> {
        let entries = self.entries.lock();
        let entry = entries.get(id).ok_or(Error::HandleNotFound(*id))?;
        if entry.permits.is_closed() {
            return Err(Error::HandleNotFound(*id));
        }
        if entry.mode == AsyncMode::Once {
            entry.permits.add_permits(1);
        }
        Ok(())
    }

    pub fn contains(&self, id: &AsyncId) -> bool {
        self.entries.lock().contains_key(id)
    }

    fn release(&self, id: &AsyncId) {
        if let Some(entry) = self.entries.lock().remove(id) {
            entry.permits.close();
        }
    }
}

/// Event-side half of a registered exchange.
#[derive(Debug)]
pub struct PullGate {
    id: AsyncId,
    registry: GateRegistry,
    permits: Option<Arc<Semaphore>>,
    delivered: usize,
}

impl PullGate {
    pub fn id(&self) -> AsyncId {
        self.id
    }

    /// Consume one permit, waiting for an `advance` if none is pending.
    ///
    /// Returns at once for continuous exchanges, and `false` once the gate
    /// has been released.
    pub async fn permit(&self) -> bool {
        match &self.permits {
            Some(permits) => match permits.acquire().await {
                Ok(permit) => {
                    permit.forget();
                    true
                }
                Err(_) => false,
            },
            None => true,
        }
    }

    /// Wait until the next event may be emitted. The first one is free.
    ///
    /// Returns `false` if the exchange can no longer make progress.
    pub async fn ready(&mut self) -> bool {
        self.delivered == 0 || self.permit().await
    }

    /// Gate, then forward `event` to `feed`.
    ///
    /// Returns `false` when nothing more should be sent: the event was
    /// terminal or the feed is gone.
    pub async fn deliver(
        &mut self,
        feed: &mpsc::Sender<TransportEvent>,
        event: TransportEvent,
    ) -> bool {
        if !self.ready().await {
            return false;
        }
        let terminal = event.is_terminal();
        if terminal {
            self.registry.release(&self.id);
        }
        self.delivered += 1;
        if feed.send(event).await.is_err() {
            tracing::debug!(id = %self.id, "Event feed closed, stopping exchange");
            return false;
        }
        !terminal
    }
}

impl Drop for PullGate {
    fn drop(&mut self) {
        self.registry.release(&self.id);
    }
}
