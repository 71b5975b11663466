//! The socket event contract.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`.
//! [`ClientEvent`] covers what dashboards send, [`ServerEvent`] what the
//! relay sends back. Both are closed: a frame with an unknown name or a
//! payload of the wrong shape does not deserialize.

use crate::constants::{inbound, outbound};
use crate::leads::{ChatMessage, Lead, LeadMessage, StatusChange, SystemMessage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Events emitted by dashboard clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "lead:created")]
    LeadCreated(Lead),
    #[serde(rename = "lead:updated")]
    LeadUpdated(Lead),
    #[serde(rename = "message:new")]
    MessageNew(LeadMessage),
    #[serde(rename = "lead:status-changed")]
    LeadStatusChanged(StatusChange),
    #[serde(rename = "message")]
    Message(ChatMessage),
}

impl ClientEvent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LeadCreated(_) => inbound::LEAD_CREATED,
            Self::LeadUpdated(_) => inbound::LEAD_UPDATED,
            Self::MessageNew(_) => inbound::MESSAGE_NEW,
            Self::LeadStatusChanged(_) => inbound::LEAD_STATUS_CHANGED,
            Self::Message(_) => inbound::MESSAGE,
        }
    }
}

/// Events emitted by the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "lead:new")]
    LeadNew(Lead),
    #[serde(rename = "lead:update")]
    LeadUpdate(Lead),
    #[serde(rename = "message:received")]
    MessageReceived(LeadMessage),
    #[serde(rename = "lead:status")]
    LeadStatus(StatusChange),
    #[serde(rename = "message")]
    Message(SystemMessage),
}

impl ServerEvent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.kind().name()
    }

    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::LeadNew(_) => EventKind::LeadNew,
            Self::LeadUpdate(_) => EventKind::LeadUpdate,
            Self::MessageReceived(_) => EventKind::MessageReceived,
            Self::LeadStatus(_) => EventKind::LeadStatus,
            Self::Message(_) => EventKind::Message,
        }
    }
}

/// Discriminant of a [`ServerEvent`], used to key listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    LeadNew,
    LeadUpdate,
    MessageReceived,
    LeadStatus,
    Message,
}

impl EventKind {
    pub const ALL: [Self; 5] =
        [Self::LeadNew, Self::LeadUpdate, Self::MessageReceived, Self::LeadStatus, Self::Message];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LeadNew => outbound::LEAD_NEW,
            Self::LeadUpdate => outbound::LEAD_UPDATE,
            Self::MessageReceived => outbound::MESSAGE_RECEIVED,
            Self::LeadStatus => outbound::LEAD_STATUS,
            Self::Message => outbound::MESSAGE,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
