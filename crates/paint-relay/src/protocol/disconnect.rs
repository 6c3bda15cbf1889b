//! Why a connection pump stopped

use std::fmt;

/// Terminal condition observed by an inbound or outbound pump
///
/// Every variant ends the pump; none is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Peer sent a close frame or the stream ended
    PeerClosed,
    /// No pong arrived within the liveness deadline
    LivenessTimeout,
    /// Inbound frame exceeded the configured limit
    MessageTooLarge { size: usize, limit: usize },
    /// Transport reported a read error
    ReadError(String),
    /// Transport reported a write error
    WriteError(String),
    /// A write did not complete within the write deadline
    WriteTimeout,
    /// The registry closed this connection's outgoing queue
    QueueClosed,
    /// The registry is no longer running
    RegistryClosed,
    /// The outbound pump of the same connection stopped first
    WriterStopped,
}

impl DisconnectReason {
    /// Whether this termination is abnormal and worth a warning
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !matches!(
            self,
            Self::PeerClosed | Self::QueueClosed | Self::RegistryClosed | Self::WriterStopped
        )
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => f.write_str("peer closed the connection"),
            Self::LivenessTimeout => f.write_str("liveness deadline expired"),
            Self::MessageTooLarge { size, limit } => {
                write!(f, "message of {size} bytes exceeds limit of {limit}")
            }
            Self::ReadError(e) => write!(f, "read failed: {e}"),
            Self::WriteError(e) => write!(f, "write failed: {e}"),
            Self::WriteTimeout => f.write_str("write deadline expired"),
            Self::QueueClosed => f.write_str("outgoing queue closed"),
            Self::RegistryClosed => f.write_str("registry stopped"),
            Self::WriterStopped => f.write_str("outbound side stopped"),
        }
    }
}
