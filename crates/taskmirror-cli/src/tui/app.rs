//! Application state for the TUI

use std::sync::Arc;
use std::time::{Duration, Instant};

use taskmirror_core::{commands, RemoteCollection, Task};
use tokio::sync::mpsc;
use tracing::warn;

use crate::filter::{self, TaskFilter};

/// Input mode for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Normal navigation mode
    Normal,
    /// Editing the new-task text
    Editing,
}

/// Outcome of a spawned remote command
///
/// Only successes arrive here. A failed command is logged and the view is
/// left exactly as it was, so the user can try again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Created { key: String },
    Deleted { key: String },
}

/// TUI application state
pub struct App {
    /// Whether the app should quit
    pub should_quit: bool,
    /// Current input mode
    pub input_mode: InputMode,
    /// Text for the task being composed
    pub input: String,
    /// Cursor position in the input
    pub cursor: usize,
    /// Which completion states the list shows
    pub filter: TaskFilter,
    /// Selection index into the visible subsequence
    pub selected: usize,
    /// At most one task awaiting delete confirmation
    pub pending_delete: Option<Task>,
    /// Status message to display
    pub status_message: Option<String>,
    /// When the status message was set
    status_message_time: Option<Instant>,
}

impl App {
    pub fn new() -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            input: String::new(),
            cursor: 0,
            filter: TaskFilter::default(),
            selected: 0,
            pending_delete: None,
            status_message: None,
            status_message_time: None,
        }
    }

    /// Set a status message that auto-clears after a few seconds
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_message_time = Some(Instant::now());
    }

    /// Clear the status message if it has been shown long enough
    pub fn check_status_timeout(&mut self) {
        if let Some(time) = self.status_message_time {
            if time.elapsed() > Duration::from_secs(3) {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    pub fn enter_input_mode(&mut self) {
        self.input_mode = InputMode::Editing;
    }

    /// Leave editing without submitting; the typed text is kept
    pub fn exit_input_mode(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn insert_char(&mut self, c: char) {
        self.input.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn delete_char(&mut self) {
        if self.cursor > 0 {
            let prev = self.prev_boundary();
            self.input.remove(prev);
            self.cursor = prev;
        }
    }

    pub fn cursor_left(&mut self) {
        if self.cursor > 0 {
            self.cursor = self.prev_boundary();
        }
    }

    pub fn cursor_right(&mut self) {
        if let Some(c) = self.input[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    fn prev_boundary(&self) -> usize {
        self.input[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self, visible_len: usize) {
        if self.selected + 1 < visible_len {
            self.selected += 1;
        }
    }

    /// Keep the selection inside the visible list after it shrinks
    pub fn clamp_selection(&mut self, visible_len: usize) {
        if visible_len == 0 {
            self.selected = 0;
        } else if self.selected >= visible_len {
            self.selected = visible_len - 1;
        }
    }

    pub fn cycle_filter(&mut self) {
        self.filter = self.filter.next();
    }

    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
    }

    /// The task the selection currently points at, if any
    pub fn selected_task<'a>(&self, tasks: &'a [Task]) -> Option<&'a Task> {
        filter::visible(self.filter, tasks)
            .get(self.selected)
            .copied()
    }

    /// Ask for confirmation before deleting; a second request replaces the
    /// first
    pub fn request_delete(&mut self, task: Task) {
        self.pending_delete = Some(task);
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Fold a completed command back into the view state
    pub fn apply_outcome(&mut self, outcome: CommandOutcome) {
        match outcome {
            CommandOutcome::Created { .. } => {
                self.input.clear();
                self.cursor = 0;
                self.set_status("Task added");
            }
            CommandOutcome::Deleted { key } => {
                if self.pending_delete.as_ref().is_some_and(|t| t.id == key) {
                    self.pending_delete = None;
                }
                self.set_status("Task deleted");
            }
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// Issue a create off the UI loop; the input box is cleared only once the
/// success outcome comes back
pub fn spawn_create<C: RemoteCollection + 'static>(
    remote: Arc<C>,
    text: String,
    outcome_tx: mpsc::UnboundedSender<CommandOutcome>,
) {
    tokio::spawn(async move {
        match commands::create_task(remote.as_ref(), text).await {
            Ok(key) => {
                let _ = outcome_tx.send(CommandOutcome::Created { key });
            }
            Err(e) => warn!(error = %e, "failed to add task"),
        }
    });
}

/// Flip a task's completed flag; the list updates via the change feed
pub fn spawn_toggle<C: RemoteCollection + 'static>(
    remote: Arc<C>,
    id: String,
    completed: bool,
) {
    tokio::spawn(async move {
        if let Err(e) = commands::toggle_complete(remote.as_ref(), &id, completed).await {
            warn!(error = %e, id, "failed to toggle task");
        }
    });
}

/// Issue a confirmed delete; the confirmation overlay is dismissed only
/// once the success outcome comes back
pub fn spawn_delete<C: RemoteCollection + 'static>(
    remote: Arc<C>,
    task: Task,
    outcome_tx: mpsc::UnboundedSender<CommandOutcome>,
) {
    tokio::spawn(async move {
        match commands::delete_task(remote.as_ref(), &task).await {
            Ok(true) => {
                let _ = outcome_tx.send(CommandOutcome::Deleted { key: task.id });
            }
            // Refused: the task completed in the meantime, nothing changes
            Ok(false) => {}
            Err(e) => warn!(error = %e, id = %task.id, "failed to delete task"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, completed: bool) -> Task {
        Task {
            id: id.to_string(),
            text: format!("task {}", id),
            completed,
        }
    }

    #[test]
    fn test_input_editing() {
        let mut app = App::new();
        app.insert_char('h');
        app.insert_char('i');
        assert_eq!(app.input, "hi");
        assert_eq!(app.cursor, 2);

        app.cursor_left();
        app.insert_char('e');
        assert_eq!(app.input, "hei");

        app.cursor_right();
        app.delete_char();
        assert_eq!(app.input, "he");
    }

    #[test]
    fn test_input_editing_multibyte() {
        let mut app = App::new();
        app.insert_char('é');
        app.insert_char('x');
        app.cursor_left();
        app.cursor_left();
        assert_eq!(app.cursor, 0);

        app.cursor_right();
        app.delete_char();
        assert_eq!(app.input, "x");
    }

    #[test]
    fn test_exit_input_mode_keeps_text() {
        let mut app = App::new();
        app.enter_input_mode();
        app.insert_char('a');
        app.exit_input_mode();

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.input, "a");
    }

    #[test]
    fn test_selection_bounds() {
        let mut app = App::new();
        app.move_up();
        assert_eq!(app.selected, 0);

        app.move_down(3);
        app.move_down(3);
        app.move_down(3);
        assert_eq!(app.selected, 2);

        app.clamp_selection(1);
        assert_eq!(app.selected, 0);

        app.clamp_selection(0);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_selected_task_follows_filter() {
        let mut app = App::new();
        let tasks = vec![task("a", false), task("b", true), task("c", false)];

        // Default filter hides the completed task
        app.selected = 1;
        assert_eq!(app.selected_task(&tasks).unwrap().id, "c");

        app.set_filter(TaskFilter::Completed);
        app.clamp_selection(filter::count(app.filter, &tasks));
        assert_eq!(app.selected_task(&tasks).unwrap().id, "b");
    }

    #[test]
    fn test_selected_task_none_when_empty() {
        let app = App::new();
        assert!(app.selected_task(&[]).is_none());
    }

    #[test]
    fn test_pending_delete_last_intent_wins() {
        let mut app = App::new();
        app.request_delete(task("a", false));
        app.request_delete(task("b", false));

        assert_eq!(app.pending_delete.as_ref().unwrap().id, "b");

        app.cancel_delete();
        assert!(app.pending_delete.is_none());
    }

    #[test]
    fn test_created_outcome_clears_input() {
        let mut app = App::new();
        app.input = "new task".to_string();
        app.cursor = 8;

        app.apply_outcome(CommandOutcome::Created {
            key: "task-1".to_string(),
        });

        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert_eq!(app.status_message.as_deref(), Some("Task added"));
    }

    #[test]
    fn test_deleted_outcome_dismisses_matching_confirmation() {
        let mut app = App::new();
        app.request_delete(task("a", false));

        app.apply_outcome(CommandOutcome::Deleted {
            key: "a".to_string(),
        });
        assert!(app.pending_delete.is_none());
    }

    #[test]
    fn test_deleted_outcome_keeps_unrelated_confirmation() {
        let mut app = App::new();
        app.request_delete(task("b", false));

        app.apply_outcome(CommandOutcome::Deleted {
            key: "a".to_string(),
        });
        assert_eq!(app.pending_delete.as_ref().unwrap().id, "b");
    }

    #[test]
    fn test_status_message_times_out() {
        let mut app = App::new();
        app.set_status("hello");
        app.check_status_timeout();
        assert!(app.status_message.is_some());

        app.status_message_time = Some(Instant::now() - Duration::from_secs(4));
        app.check_status_timeout();
        assert!(app.status_message.is_none());
    }
}
