//! Inbound and outbound pumps
//!
//! Each connection runs one of each. The inbound pump forwards client frames to
//! the registry; the outbound pump drains the connection's queue to the client
//! and keeps probing it with pings. When the outbound pump stops it cancels the
//! connection's token, which stops the inbound pump too.

use super::ConnectionId;
use crate::protocol::{DisconnectReason, Payload};
use crate::registry::Registry;
use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use paint_common::RelayConfig;
use std::fmt::Display;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, timeout_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Read frames until the peer goes away or the writer stops, then unregister
pub(crate) async fn inbound_pump<R, E>(
    id: ConnectionId,
    mut stream: R,
    registry: Registry,
    config: RelayConfig,
    closing: CancellationToken,
) -> DisconnectReason
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let reason = read_frames(id, &mut stream, &registry, &config, &closing).await;

    if registry.unregister(id).await.is_err() {
        tracing::debug!(connection_id = %id, "Registry gone before unregister");
    }
    drop(stream);

    reason
}

async fn read_frames<R, E>(
    id: ConnectionId,
    stream: &mut R,
    registry: &Registry,
    config: &RelayConfig,
    closing: &CancellationToken,
) -> DisconnectReason
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    // Only pongs move the deadline; data frames do not count as liveness.
    let mut deadline = Instant::now() + config.liveness_timeout;

    loop {
        let next = tokio::select! {
            biased;
            () = closing.cancelled() => return DisconnectReason::WriterStopped,
            next = timeout_at(deadline, stream.next()) => next,
        };

        let frame = match next {
            Err(_) => return DisconnectReason::LivenessTimeout,
            Ok(None) => return DisconnectReason::PeerClosed,
            Ok(Some(Err(e))) => return DisconnectReason::ReadError(e.to_string()),
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Message::Pong(_) => {
                deadline = Instant::now() + config.liveness_timeout;
                tracing::trace!(connection_id = %id, "Pong received");
            }
            Message::Ping(_) => {
                tracing::trace!(connection_id = %id, "Ping received");
            }
            Message::Close(_) => return DisconnectReason::PeerClosed,
            data => {
                let Some(payload) = Payload::from_message(data) else {
                    continue;
                };

                if payload.len() > config.max_message_size {
                    return DisconnectReason::MessageTooLarge {
                        size: payload.len(),
                        limit: config.max_message_size,
                    };
                }

                let forwarded = tokio::select! {
                    biased;
                    () = closing.cancelled() => return DisconnectReason::WriterStopped,
                    forwarded = timeout_at(deadline, registry.broadcast_from(id, payload)) => {
                        forwarded
                    }
                };

                match forwarded {
                    Err(_) => return DisconnectReason::LivenessTimeout,
                    Ok(Err(_)) => return DisconnectReason::RegistryClosed,
                    Ok(Ok(())) => {}
                }
            }
        }
    }
}

/// Write queued payloads and periodic pings until something fails
///
/// Cancels `closing` on every exit path.
pub(crate) async fn outbound_pump<W>(
    id: ConnectionId,
    mut sink: W,
    mut outbox: mpsc::Receiver<Payload>,
    registry: Registry,
    config: RelayConfig,
    closing: CancellationToken,
) -> DisconnectReason
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    let _closing = closing.drop_guard();

    let mut probe = interval_at(
        Instant::now() + config.probe_interval,
        config.probe_interval,
    );
    probe.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let reason = loop {
        tokio::select! {
            next = outbox.recv() => match next {
                Some(payload) => {
                    let frame = payload.to_message();
                    if let Err(reason) = write_frame(&mut sink, frame, config.write_timeout).await {
                        break reason;
                    }
                }
                None => {
                    // Best effort: the peer may already be unreachable.
                    let _ = write_frame(&mut sink, Message::Close(None), config.write_timeout).await;
                    break DisconnectReason::QueueClosed;
                }
            },
            _ = probe.tick() => {
                tracing::trace!(connection_id = %id, "Sending ping");
                let frame = Message::Ping(Vec::new());
                if let Err(reason) = write_frame(&mut sink, frame, config.write_timeout).await {
                    break reason;
                }
            }
        }
    };

    if reason.is_failure() && registry.unregister(id).await.is_err() {
        tracing::debug!(connection_id = %id, "Registry gone before unregister");
    }

    outbox.close();
    match timeout(config.write_timeout, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::trace!(connection_id = %id, error = %e, "Closing transport failed");
        }
        Err(_) => tracing::trace!(connection_id = %id, "Closing transport timed out"),
    }

    reason
}

async fn write_frame<W>(
    sink: &mut W,
    frame: Message,
    deadline: Duration,
) -> Result<(), DisconnectReason>
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    match timeout(deadline, sink.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(DisconnectReason::WriteError(e.to_string())),
        Err(_) => Err(DisconnectReason::WriteTimeout),
    }
}
