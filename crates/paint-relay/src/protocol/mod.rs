//! Relay protocol definitions
//!
//! Payloads carried between clients and the reasons a connection ends.

mod disconnect;
mod payload;

pub use disconnect::DisconnectReason;
pub use payload::{Payload, PayloadKind};
