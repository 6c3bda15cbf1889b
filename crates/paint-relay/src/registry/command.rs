//! Requests served by the registry control loop

use crate::connection::{ConnectionHandle, ConnectionId};
use crate::protocol::Payload;
use tokio::sync::oneshot;

/// A single request to the registry
///
/// All kinds share one channel, so the loop sees them in arrival order.
#[derive(Debug)]
pub(crate) enum Command {
    Register(ConnectionHandle),
    Unregister(ConnectionId),
    Broadcast {
        origin: Option<ConnectionId>,
        payload: Payload,
    },
    Members(oneshot::Sender<Vec<ConnectionId>>),
}

impl Command {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Register(_) => "register",
            Self::Unregister(_) => "unregister",
            Self::Broadcast { .. } => "broadcast",
            Self::Members(_) => "members",
        }
    }
}
