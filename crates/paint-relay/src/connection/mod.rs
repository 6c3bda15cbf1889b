//! Connection management
//!
//! Per-client queue handles and the pumps that move frames between a client
//! and the registry.

mod connection;
mod handle;
mod pumps;

pub use connection::{accept_connection, Connection, ConnectionTasks};
pub use handle::{ConnectionHandle, ConnectionId};
