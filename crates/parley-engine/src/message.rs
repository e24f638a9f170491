//! Chat message and roster types.
//!
//! Field names on the wire follow the chat backend's JSON records
//! (`_id`, `connectionRequest`, `sender`, `message`, `createdAt`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix used for identifiers assigned on this side before the server
/// has seen the message.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier, server- or client-assigned.
    #[serde(rename = "_id")]
    pub id: String,
    /// Conversation this message belongs to.
    #[serde(rename = "connectionRequest")]
    pub conversation_id: String,
    /// Identifier of the sending user.
    pub sender: String,
    /// Message text.
    #[serde(rename = "message")]
    pub body: String,
    /// Creation timestamp.
    #[serde(rename = "createdAt", default = "epoch")]
    pub created_at: DateTime<Utc>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl Message {
    /// Create a locally-synthesized message for an optimistic insert.
    pub fn local(
        conversation_id: impl Into<String>,
        sender: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("{LOCAL_ID_PREFIX}{}", Uuid::new_v4()),
            conversation_id: conversation_id.into(),
            sender: sender.into(),
            body: body.into(),
            created_at: Utc::now(),
        }
    }

    /// Whether this message was created locally and never confirmed.
    pub fn is_local(&self) -> bool {
        self.id.starts_with(LOCAL_ID_PREFIX)
    }
}

/// A user known to the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: String,
    pub name: String,
}

/// Users available for display-name resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    /// Create a roster from entries.
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self { entries }
    }

    /// Parse a roster from a JSON array of `{id, name}` objects.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Resolve a user id to a display name, falling back to the id.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|u| u.id == id)
            .map_or(id, |u| u.name.as_str())
    }

    /// Number of known users.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the roster has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
