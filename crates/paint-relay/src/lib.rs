//! # paint-relay
//!
//! WebSocket relay for a shared canvas: every message a client sends is
//! fanned out to all connected clients.
//!
//! A single [`Registry`] task owns the set of live connections. Each accepted
//! socket gets a bounded outgoing queue and two pumps; a client that cannot
//! keep up with its queue is dropped instead of slowing everyone else down.

pub mod connection;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;

pub use connection::{accept_connection, Connection, ConnectionHandle, ConnectionId, ConnectionTasks};
pub use error::{EnqueueError, RelayError, RelayResult};
pub use protocol::{DisconnectReason, Payload, PayloadKind};
pub use registry::{Registry, RegistryLoop};
pub use server::{create_app, create_router, run, run_server, run_until, RelayState};
