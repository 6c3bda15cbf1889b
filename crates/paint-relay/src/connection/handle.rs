//! Registry-side end of a connection's outgoing queue

use crate::error::EnqueueError;
use crate::protocol::Payload;
use std::fmt;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Unique identity of an accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a new random connection ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Write side of a connection's bounded outgoing queue
///
/// Owned by the registry once the connection is registered. The connection's
/// outbound pump holds the only reader; once this handle is closed and the
/// queued payloads are drained, the reader observes the end of the queue.
pub struct ConnectionHandle {
    id: ConnectionId,
    outbox: Option<mpsc::Sender<Payload>>,
}

impl ConnectionHandle {
    /// Create a handle together with the reader of its queue
    pub(crate) fn channel(id: ConnectionId, capacity: usize) -> (Self, mpsc::Receiver<Payload>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = Self {
            id,
            outbox: Some(tx),
        };
        (handle, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Try to queue a payload without waiting
    ///
    /// A full queue means the consumer is not keeping up. Deciding what to do
    /// about that is the caller's job; this never unregisters anything.
    pub fn enqueue(&self, payload: Payload) -> Result<(), EnqueueError> {
        let outbox = self.outbox.as_ref().ok_or(EnqueueError::Closed)?;
        outbox.try_send(payload).map_err(|e| match e {
            TrySendError::Full(_) => EnqueueError::Full,
            TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }

    /// Close the queue; payloads already queued are still delivered
    ///
    /// Returns `true` only for the call that actually closed it.
    pub fn close(&mut self) -> bool {
        self.outbox.take().is_some()
    }

    /// Whether the queue was closed or its reader is gone
    pub fn is_closed(&self) -> bool {
        self.outbox.as_ref().map_or(true, mpsc::Sender::is_closed)
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
