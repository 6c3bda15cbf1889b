//! Individual client connection
//!
//! Wraps one accepted transport, owns its outgoing queue and runs the two pumps.

use super::pumps::{inbound_pump, outbound_pump};
use super::{ConnectionHandle, ConnectionId};
use crate::error::RelayResult;
use crate::protocol::{DisconnectReason, Payload};
use crate::registry::Registry;
use axum::extract::ws::Message;
use futures_util::{Sink, Stream, StreamExt};
use paint_common::RelayConfig;
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A connection that has been accepted but whose pumps are not running yet
pub struct Connection<T> {
    id: ConnectionId,
    registry: Registry,
    transport: T,
    /// Queue handle, until it is handed to the registry
    handle: Option<ConnectionHandle>,
    outbox: mpsc::Receiver<Payload>,
    config: RelayConfig,
}

/// Join handles of a started connection's pumps
#[derive(Debug)]
pub struct ConnectionTasks {
    pub inbound: JoinHandle<DisconnectReason>,
    pub outbound: JoinHandle<DisconnectReason>,
}

impl<T, E> Connection<T>
where
    T: Stream<Item = Result<Message, E>> + Sink<Message> + Send + 'static,
    E: Display + Send + 'static,
    <T as Sink<Message>>::Error: Display + Send,
{
    /// Wrap a transport; nothing runs until [`Connection::start`]
    pub fn new(registry: Registry, transport: T, config: RelayConfig) -> Self {
        let id = ConnectionId::new();
        let (handle, outbox) = ConnectionHandle::channel(id, config.queue_capacity);

        Self {
            id,
            registry,
            transport,
            handle: Some(handle),
            outbox,
            config,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Hand the outgoing queue to the registry so broadcasts reach this connection
    ///
    /// Calling it again after success is a no-op.
    pub async fn register(&mut self) -> RelayResult<()> {
        if let Some(handle) = self.handle.take() {
            self.registry.register(handle).await?;
        }
        Ok(())
    }

    /// Spawn the inbound and outbound pumps
    ///
    /// The pumps share a token: when the outbound pump stops, the inbound pump
    /// stops reading and forwarding. An unregistered connection starts with a
    /// closed queue, so its outbound pump closes the transport straight away.
    pub fn start(self) -> ConnectionTasks {
        let Self {
            id,
            registry,
            transport,
            handle,
            outbox,
            config,
        } = self;
        drop(handle);

        let (sink, stream) = transport.split();
        let closing = CancellationToken::new();

        let inbound = tokio::spawn({
            let registry = registry.clone();
            let config = config.clone();
            let closing = closing.clone();
            async move {
                let reason = inbound_pump(id, stream, registry, config, closing).await;
                log_exit(id, "inbound", &reason);
                reason
            }
        });

        let outbound = tokio::spawn(async move {
            let reason = outbound_pump(id, sink, outbox, registry, config, closing).await;
            log_exit(id, "outbound", &reason);
            reason
        });

        ConnectionTasks { inbound, outbound }
    }
}

fn log_exit(id: ConnectionId, pump: &'static str, reason: &DisconnectReason) {
    if reason.is_failure() {
        tracing::warn!(connection_id = %id, pump = pump, reason = %reason, "Pump stopped");
    } else {
        tracing::debug!(connection_id = %id, pump = pump, reason = %reason, "Pump stopped");
    }
}

impl<T> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("registered", &self.handle.is_none())
            .finish()
    }
}

/// Register a freshly accepted transport and start relaying for it
///
/// Errors only if the registry is no longer running; the transport is dropped then.
pub async fn accept_connection<T, E>(
    registry: &Registry,
    transport: T,
    config: &RelayConfig,
) -> RelayResult<ConnectionTasks>
where
    T: Stream<Item = Result<Message, E>> + Sink<Message> + Send + 'static,
    E: Display + Send + 'static,
    <T as Sink<Message>>::Error: Display + Send,
{
    let mut connection = Connection::new(registry.clone(), transport, config.clone());
    connection.register().await?;

    tracing::info!(connection_id = %connection.id(), "Connection accepted");

    Ok(connection.start())
}
