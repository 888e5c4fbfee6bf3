//! Data models for taskmirror
//!
//! A task is the sole entity: an opaque server-assigned key, its text, and a
//! completed flag. `TaskPayload` is the shape that crosses the wire and is
//! stored remotely, i.e. a task minus its key.

use serde::{Deserialize, Serialize};

/// A task record in the local mirror
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    /// Opaque key assigned by the remote store at creation, immutable
    pub id: String,
    /// User-entered text, set at creation and never edited
    pub text: String,
    /// Completion flag, toggled by user action
    pub completed: bool,
}

impl Task {
    /// Build a task from a remote key and its payload
    pub fn from_entry(id: impl Into<String>, payload: TaskPayload) -> Self {
        Self {
            id: id.into(),
            text: payload.text,
            completed: payload.completed,
        }
    }

    /// The wire shape of this task (everything but the key)
    pub fn payload(&self) -> TaskPayload {
        TaskPayload {
            text: self.text.clone(),
            completed: self.completed,
        }
    }
}

/// The stored/transmitted form of a task, addressed by its key
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskPayload {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

impl TaskPayload {
    /// Payload for a freshly created task (not yet completed)
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            completed: false,
        }
    }
}
