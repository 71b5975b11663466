//! Lead records and message payloads as they travel over the socket.
//!
//! Field names follow the dashboard's camelCase JSON. Decoding then encoding
//! a payload yields the same JSON: unknown fields are kept in `extra`,
//! optional fields use [`Field`] and timestamps keep their original text.

use crate::constants::DEFAULT_LEAD_SOURCE;
use crate::wire::{Field, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Pipeline stage of a lead.
///
/// Values other than the known stages are carried verbatim in
/// [`LeadStatus::Other`]; matching on the wire is exact.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    ProposalSent,
    ClosedWon,
    ClosedLost,
    Other(String),
}

impl LeadStatus {
    pub const ALL: [Self; 6] = [
        Self::New,
        Self::Contacted,
        Self::Qualified,
        Self::ProposalSent,
        Self::ClosedWon,
        Self::ClosedLost,
    ];

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "NEW",
            Self::Contacted => "CONTACTED",
            Self::Qualified => "QUALIFIED",
            Self::ProposalSent => "PROPOSAL_SENT",
            Self::ClosedWon => "CLOSED_WON",
            Self::ClosedLost => "CLOSED_LOST",
            Self::Other(raw) => raw.as_str(),
        }
    }

    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for LeadStatus {
    fn from(raw: String) -> Self {
        Self::ALL.into_iter().find(|status| status.as_str() == raw).unwrap_or(Self::Other(raw))
    }
}

impl From<LeadStatus> for String {
    fn from(status: LeadStatus) -> Self {
        match status {
            LeadStatus::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses user input: known stages only, case-insensitive.
impl std::str::FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown lead status '{s}'"))
    }
}

/// A prospective customer, identified primarily by phone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub name: Field<String>,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub email: Field<String>,
    pub status: LeadStatus,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub source: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub notes: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub last_contact: Field<Timestamp>,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub message_count: Field<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Lead {
    /// A fresh `NEW` lead as the dashboard stores it on first contact.
    #[must_use]
    pub fn new(id: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Field::Absent,
            phone: phone.into(),
            email: Field::Absent,
            status: LeadStatus::New,
            source: Field::Value(DEFAULT_LEAD_SOURCE.to_owned()),
            notes: Field::Absent,
            last_contact: Field::Absent,
            created_at: Timestamp::now(),
            message_count: Field::Value(0),
            extra: Map::new(),
        }
    }
}

/// Direction of a WhatsApp message relative to the business.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageDirection {
    Incoming,
    Outgoing,
    Other(String),
}

impl MessageDirection {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Incoming => "INCOMING",
            Self::Outgoing => "OUTGOING",
            Self::Other(raw) => raw.as_str(),
        }
    }
}

impl From<String> for MessageDirection {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "INCOMING" => Self::Incoming,
            "OUTGOING" => Self::Outgoing,
            _ => Self::Other(raw),
        }
    }
}

impl From<MessageDirection> for String {
    fn from(direction: MessageDirection) -> Self {
        match direction {
            MessageDirection::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

/// A WhatsApp message attached to a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadMessage {
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub id: Field<String>,
    pub lead_id: String,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub message: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub direction: Field<MessageDirection>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub media_url: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub media_type: Field<String>,
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LeadMessage {
    #[must_use]
    pub fn incoming(lead_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Field::Absent,
            lead_id: lead_id.into(),
            message: Field::Value(text.into()),
            direction: Field::Value(MessageDirection::Incoming),
            media_url: Field::Absent,
            media_type: Field::Absent,
            timestamp: Timestamp::now(),
            extra: Map::new(),
        }
    }
}

/// Status transition of a single lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub lead_id: String,
    pub status: LeadStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StatusChange {
    #[must_use]
    pub fn new(lead_id: impl Into<String>, status: LeadStatus) -> Self {
        Self { lead_id: lead_id.into(), status, extra: Map::new() }
    }
}

/// Free-form chat line sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub text: String,
    pub sender_id: String,
}

/// Chat line authored by the relay itself (greeting or echo).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMessage {
    pub text: String,
    pub sender_id: String,
    pub timestamp: Timestamp,
}

impl SystemMessage {
    /// A message from `sender` stamped with the current time.
    #[must_use]
    pub fn now(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self { text: text.into(), sender_id: sender.into(), timestamp: Timestamp::now() }
    }
}
