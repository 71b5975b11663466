//! Envelope codec shared by both transports.
//!
//! A frame is one JSON object `{"event": <name>, "data": <payload>}`. Over
//! WebSocket each text frame carries one envelope; the polling transport
//! posts one envelope per request and receives arrays of them.

use crate::error::{RealtimeError, RealtimeErrorExt};
use leadhub_kernel::domain::events::{ClientEvent, ServerEvent};
use serde::{Deserialize, Serialize};

/// Response body of `POST {path}/poll`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct SessionOpened {
    /// Polling session id.
    pub sid: String,
}

/// Serializes any envelope to its JSON text form.
///
/// # Errors
/// Returns [`RealtimeError::Decode`] if a payload cannot be represented as JSON.
pub fn encode<E: Serialize>(event: &E) -> Result<String, RealtimeError> {
    serde_json::to_string(event).context("Encoding envelope")
}

/// Parses a frame sent by a dashboard client.
///
/// # Errors
/// Returns [`RealtimeError::Decode`] for invalid JSON, an unknown event name
/// or a payload that does not match the event's schema.
pub fn decode_client(raw: &str) -> Result<ClientEvent, RealtimeError> {
    serde_json::from_str(raw).context("Decoding client envelope")
}

/// Parses a frame sent by the relay.
///
/// # Errors
/// Same conditions as [`decode_client`].
pub fn decode_server(raw: &str) -> Result<ServerEvent, RealtimeError> {
    serde_json::from_str(raw).context("Decoding server envelope")
}
