//! Connection registry
//!
//! A single task owns the membership set. Everything else talks to it through
//! [`Registry`], a cheap cloneable handle that only sends commands, so the set
//! is never shared and never locked.

use super::command::Command;
use crate::connection::{ConnectionHandle, ConnectionId};
use crate::error::{EnqueueError, RelayError, RelayResult};
use crate::protocol::Payload;
use paint_common::RelayConfig;
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to a running registry
#[derive(Clone)]
pub struct Registry {
    commands: mpsc::Sender<Command>,
    shutdown: CancellationToken,
}

impl Registry {
    /// Create a registry handle and the control loop that serves it
    ///
    /// The loop does nothing until [`RegistryLoop::run`] is polled.
    pub fn new(config: &RelayConfig) -> (Self, RegistryLoop) {
        let (tx, rx) = mpsc::channel(config.intake_capacity);
        let shutdown = CancellationToken::new();

        let registry = Self {
            commands: tx,
            shutdown: shutdown.clone(),
        };
        let control_loop = RegistryLoop {
            commands: rx,
            shutdown,
            members: HashMap::new(),
            echo_to_sender: config.echo_to_sender,
        };

        (registry, control_loop)
    }

    /// Create a registry and spawn its control loop
    pub fn start(config: &RelayConfig) -> (Self, JoinHandle<()>) {
        let (registry, control_loop) = Self::new(config);
        let task = tokio::spawn(control_loop.run());

        tracing::info!(
            echo_to_sender = config.echo_to_sender,
            intake_capacity = config.intake_capacity,
            "Registry started"
        );

        (registry, task)
    }

    /// Add a connection to the broadcast set
    pub async fn register(&self, handle: ConnectionHandle) -> RelayResult<()> {
        self.send(Command::Register(handle)).await
    }

    /// Remove a connection and close its outgoing queue
    ///
    /// Unknown or already removed connections are ignored.
    pub async fn unregister(&self, id: ConnectionId) -> RelayResult<()> {
        self.send(Command::Unregister(id)).await
    }

    /// Deliver a payload to every registered connection
    pub async fn broadcast(&self, payload: Payload) -> RelayResult<()> {
        self.send(Command::Broadcast {
            origin: None,
            payload,
        })
        .await
    }

    /// Deliver a payload that a connection sent
    ///
    /// The origin is skipped unless echo to sender is enabled.
    pub async fn broadcast_from(&self, origin: ConnectionId, payload: Payload) -> RelayResult<()> {
        self.send(Command::Broadcast {
            origin: Some(origin),
            payload,
        })
        .await
    }

    /// Snapshot of the current members, taken in order with other requests
    pub async fn members(&self) -> RelayResult<Vec<ConnectionId>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Members(tx)).await?;
        rx.await.map_err(|_| RelayError::RegistryClosed)
    }

    /// Number of registered connections
    pub async fn connection_count(&self) -> RelayResult<usize> {
        Ok(self.members().await?.len())
    }

    /// Ask the control loop to drain pending requests and stop
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Whether shutdown has been requested
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    async fn send(&self, command: Command) -> RelayResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RelayError::RegistryClosed)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}

/// The registry's control loop and the state it alone mutates
pub struct RegistryLoop {
    commands: mpsc::Receiver<Command>,
    shutdown: CancellationToken,
    members: HashMap<ConnectionId, ConnectionHandle>,
    echo_to_sender: bool,
}

impl RegistryLoop {
    /// Serve requests until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => {
                        tracing::debug!("All registry handles dropped");
                        break;
                    }
                },
                () = self.shutdown.cancelled() => {
                    self.drain().await;
                    break;
                }
            }
        }

        self.close_all();
        tracing::info!("Registry stopped");
    }

    /// Refuse new requests and serve the ones already queued
    async fn drain(&mut self) {
        self.commands.close();

        let mut drained = 0usize;
        while let Some(command) = self.commands.recv().await {
            self.handle(command);
            drained += 1;
        }

        tracing::info!(drained = drained, "Registry draining on shutdown");
    }

    fn handle(&mut self, command: Command) {
        tracing::trace!(command = command.name(), "Registry command");

        match command {
            Command::Register(handle) => self.register(handle),
            Command::Unregister(id) => self.unregister(id),
            Command::Broadcast { origin, payload } => self.broadcast(origin, &payload),
            Command::Members(reply) => {
                // The requester may have given up; nothing to do then.
                let _ = reply.send(self.members.keys().copied().collect());
            }
        }
    }

    fn register(&mut self, handle: ConnectionHandle) {
        let id = handle.id();
        if let Some(mut previous) = self.members.insert(id, handle) {
            previous.close();
            tracing::warn!(connection_id = %id, "Connection registered twice, replaced");
        }

        tracing::debug!(
            connection_id = %id,
            members = self.members.len(),
            "Connection registered"
        );
    }

    fn unregister(&mut self, id: ConnectionId) {
        if let Some(mut handle) = self.members.remove(&id) {
            handle.close();
            tracing::debug!(
                connection_id = %id,
                members = self.members.len(),
                "Connection unregistered"
            );
        }
    }

    fn broadcast(&mut self, origin: Option<ConnectionId>, payload: &Payload) {
        let mut delivered = 0usize;
        let mut dead = Vec::new();

        for (id, handle) in &self.members {
            if !self.echo_to_sender && origin == Some(*id) {
                continue;
            }

            match handle.enqueue(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(EnqueueError::Full) => {
                    tracing::warn!(
                        connection_id = %id,
                        "Outgoing queue full, dropping unresponsive connection"
                    );
                    dead.push(*id);
                }
                Err(EnqueueError::Closed) => {
                    tracing::debug!(connection_id = %id, "Outgoing queue already closed");
                    dead.push(*id);
                }
            }
        }

        tracing::debug!(
            origin = ?origin.map(|id| id.to_string()),
            kind = %payload.kind(),
            size = payload.len(),
            delivered = delivered,
            dropped = dead.len(),
            "Broadcast"
        );

        for id in dead {
            self.unregister(id);
        }
    }

    fn close_all(&mut self) {
        let count = self.members.len();
        for (_, mut handle) in self.members.drain() {
            handle.close();
        }

        if count > 0 {
            tracing::info!(count = count, "Closed remaining connections");
        }
    }
}
