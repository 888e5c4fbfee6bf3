//! Remote mutation commands
//!
//! The command layer only issues remote mutations; it never touches the
//! local mirror and relies on the reconciler's event feed to reflect each
//! outcome. Failures are returned to the caller, which logs them and moves
//! on; nothing is retried.

use tracing::debug;

use crate::error::RemoteResult;
use crate::models::{Task, TaskPayload};
use crate::remote::RemoteCollection;

/// Create a task with a fresh server-assigned key; returns the key
///
/// Empty text is accepted; the store performs no validation.
pub async fn create_task<C: RemoteCollection>(
    remote: &C,
    text: impl Into<String>,
) -> RemoteResult<String> {
    let key = remote.create(TaskPayload::new(text)).await?;
    debug!(%key, "task created");
    Ok(key)
}

/// Flip a task's completed flag
///
/// Trusts the completed value the caller saw at render time rather than
/// re-reading it, so a concurrent remote change between render and click
/// can lose an update.
pub async fn toggle_complete<C: RemoteCollection>(
    remote: &C,
    id: &str,
    completed: bool,
) -> RemoteResult<()> {
    remote.set_completed(id, !completed).await?;
    debug!(id, completed = !completed, "task toggled");
    Ok(())
}

/// Delete a task, but only while it is still active
///
/// A completed task is never deleted: the call issues no mutation and
/// returns `Ok(false)` with no user-visible feedback. Returns `Ok(true)`
/// when the delete was issued.
pub async fn delete_task<C: RemoteCollection>(remote: &C, task: &Task) -> RemoteResult<bool> {
    if task.completed {
        debug!(id = %task.id, "delete refused for completed task");
        return Ok(false);
    }

    remote.remove(&task.id).await?;
    debug!(id = %task.id, "task deleted");
    Ok(true)
}
