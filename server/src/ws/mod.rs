//! Operator UI bridge over WebSocket.
//!
//! Each UI connection gets a client-list snapshot, then every `UiEvent` as a
//! JSON text message. Operator commands come back as JSON text and are
//! forwarded to the dispatcher.

pub mod actor;
pub mod handler;
pub mod protocol;
