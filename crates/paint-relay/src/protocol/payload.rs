//! Relayed payloads
//!
//! A payload is whatever a client sent in one data frame. The relay never looks
//! inside; it only keeps the frame kind so binary stays binary.

use axum::extract::ws::Message;
use std::fmt;
use std::sync::Arc;

/// Frame kind of a relayed payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Text,
    Binary,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Binary => f.write_str("binary"),
        }
    }
}

/// An opaque message fanned out to every connection
///
/// Cloning is cheap: the bytes are shared between all recipients' queues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(Arc<str>),
    Binary(Arc<[u8]>),
}

impl Payload {
    /// Build a text payload
    pub fn text(text: impl Into<Arc<str>>) -> Self {
        Self::Text(text.into())
    }

    /// Build a binary payload
    pub fn binary(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Binary(bytes.into())
    }

    /// Extract the payload from a data frame
    ///
    /// Control frames (ping, pong, close) carry no payload and yield `None`.
    pub fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::Text(text) => Some(Self::text(text)),
            Message::Binary(bytes) => Some(Self::binary(bytes)),
            Message::Ping(_) | Message::Pong(_) | Message::Close(_) => None,
        }
    }

    /// Convert into a frame ready to be written to a client
    pub fn to_message(&self) -> Message {
        match self {
            Self::Text(text) => Message::Text(text.to_string()),
            Self::Binary(bytes) => Message::Binary(bytes.to_vec()),
        }
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Text(_) => PayloadKind::Text,
            Self::Binary(_) => PayloadKind::Binary,
        }
    }
}
