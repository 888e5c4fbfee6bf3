//! Collection protocol message types
//!
//! Messages exchanged with the collection server as JSON text frames.
//! Requests carry a client-assigned correlation id; live events carry the
//! server-assigned subscription id instead.

use serde::{Deserialize, Serialize};

use super::EventKind;
use crate::models::TaskPayload;

/// Correlation id for request/response pairing
pub type RequestId = u64;

/// One record in a snapshot response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub key: String,
    #[serde(flatten)]
    pub payload: TaskPayload,
}

/// Messages sent to the collection server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Handshake: identify ourselves and name the collection to open
    Hello {
        client_id: String,
        collection: String,
    },

    /// One-shot full read of the collection
    Snapshot { request: RequestId },

    /// Open a live feed for one event kind
    Subscribe { request: RequestId, kind: EventKind },

    /// Close a live feed
    Unsubscribe { subscription: u64 },

    /// Create a record under a server-generated key
    Create {
        request: RequestId,
        payload: TaskPayload,
    },

    /// Set the completed flag on one record
    Update {
        request: RequestId,
        key: String,
        completed: bool,
    },

    /// Delete one record
    Remove { request: RequestId, key: String },
}

/// Messages received from the collection server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Handshake response
    Welcome { server_id: String },

    /// Snapshot contents
    SnapshotData {
        request: RequestId,
        entries: Vec<SnapshotEntry>,
    },

    /// Feed opened
    Subscribed { request: RequestId, subscription: u64 },

    /// Record created
    Created { request: RequestId, key: String },

    /// Write acknowledged (update/remove)
    Done { request: RequestId },

    /// A change on a live feed; `payload` is absent for removals
    Event {
        subscription: u64,
        kind: EventKind,
        key: String,
        #[serde(default)]
        payload: Option<TaskPayload>,
    },

    /// Request refused, or a connection-level fault when `request` is absent
    Error {
        #[serde(default)]
        request: Option<RequestId>,
        message: String,
    },
}

impl ClientMessage {
    /// Encode message to a JSON text frame
    pub fn encode(&self) -> String {
        serde_json::to_string(self).expect("JSON encoding failed")
    }
}

impl ServerMessage {
    /// Decode message from a JSON text frame
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The correlation id this message answers, if it answers one
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            ServerMessage::SnapshotData { request, .. }
            | ServerMessage::Subscribed { request, .. }
            | ServerMessage::Created { request, .. }
            | ServerMessage::Done { request } => Some(*request),
            ServerMessage::Error { request, .. } => *request,
            ServerMessage::Welcome { .. } | ServerMessage::Event { .. } => None,
        }
    }
}
