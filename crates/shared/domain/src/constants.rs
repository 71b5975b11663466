//! Wire-level names shared by the relay and its clients.

/// The single broadcast group every dashboard connection joins.
pub const LEADS_ROOM: &str = "leads";

/// Sender id stamped on greeting and echo messages.
pub const SYSTEM_SENDER: &str = "system";

/// Prefix prepended to echoed chat messages.
pub const ECHO_PREFIX: &str = "Echo: ";

/// Default greeting sent privately to every new connection.
pub const DEFAULT_GREETING: &str = "Welcome to Lead Dashboard WebSocket!";

/// Lead source used when a record does not carry one.
pub const DEFAULT_LEAD_SOURCE: &str = "whatsapp";

/// `OpenAPI` tag for system endpoints.
pub const SYSTEM_TAG: &str = "system";

/// `OpenAPI` tag for socket endpoints.
pub const SOCKET_TAG: &str = "socket";

/// Event names emitted by dashboard clients.
pub mod inbound {
    pub const LEAD_CREATED: &str = "lead:created";
    pub const LEAD_UPDATED: &str = "lead:updated";
    pub const MESSAGE_NEW: &str = "message:new";
    pub const LEAD_STATUS_CHANGED: &str = "lead:status-changed";
    pub const MESSAGE: &str = "message";
}

/// Event names emitted by the relay.
pub mod outbound {
    pub const LEAD_NEW: &str = "lead:new";
    pub const LEAD_UPDATE: &str = "lead:update";
    pub const MESSAGE_RECEIVED: &str = "message:received";
    pub const LEAD_STATUS: &str = "lead:status";
    pub const MESSAGE: &str = "message";
}
