//! taskmirror TUI
//!
//! Single-page live view of the task collection.
//!
//! ## Layout
//!
//! Top to bottom:
//! - Input box for composing a new task
//! - Filter line (All / Active / Completed, with counts)
//! - Task list for the current filter
//! - Status line
//!
//! ## Navigation
//!
//! - j/k or ↑/↓: Move selection up/down
//! - Space/Enter: Toggle the selected task
//! - Tab or f: Cycle the filter (1/2/3 jump directly)
//! - a or i: Compose a new task
//! - d: Delete the selected task (asks for confirmation)
//! - q: Quit

mod app;
mod ui;

use std::fs::File;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use taskmirror_core::{Config, Reconciler, RemoteCollection};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::filter::{self, TaskFilter};

use app::{App, CommandOutcome, InputMode};

/// Run the TUI application
pub async fn run<C: RemoteCollection + 'static>(remote: Arc<C>, config: &Config) -> Result<()> {
    // Initialize TUI logging (file-based, only if TASKMIRROR_LOG is set)
    init_tui_logging(config);

    // Attach before touching the terminal so a connection failure surfaces
    // as a plain error message
    let mut reconciler = Reconciler::attach(remote.as_ref()).await?;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = App::new();
    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

    let result = run_app(
        &mut terminal,
        &mut app,
        &mut reconciler,
        &remote,
        outcome_tx,
        outcome_rx,
    )
    .await;

    // Cancel the live subscriptions before the view goes away
    drop(reconciler);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

async fn run_app<B: Backend, C: RemoteCollection + 'static>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    reconciler: &mut Reconciler,
    remote: &Arc<C>,
    outcome_tx: mpsc::UnboundedSender<CommandOutcome>,
    mut outcome_rx: mpsc::UnboundedReceiver<CommandOutcome>,
) -> Result<()> {
    // Once every change feed has closed there is nothing left to await there
    let mut feeds_open = true;

    loop {
        // Check for status message timeout
        app.check_status_timeout();

        // Draw UI
        terminal.draw(|frame| ui::draw(frame, app, reconciler.tasks()))?;

        tokio::select! {
            biased;

            // Fold remote changes into the mirror as they arrive
            change = reconciler.next_change(), if feeds_open => {
                match change {
                    Some(event) => {
                        reconciler.apply(event);
                        app.clamp_selection(filter::count(app.filter, reconciler.tasks()));
                    }
                    None => {
                        feeds_open = false;
                        warn!("all change feeds closed; mirror is frozen");
                        app.set_status("Connection to collection server lost");
                    }
                }
            }

            // Successful commands report back here
            outcome = outcome_rx.recv() => {
                if let Some(outcome) = outcome {
                    app.apply_outcome(outcome);
                }
            }

            // Poll for terminal events
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                // Check for terminal events (non-blocking)
                if event::poll(Duration::from_millis(0))? {
                    if let Event::Key(key) = event::read()? {
                        // Only handle key press events (not release)
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        handle_key(app, reconciler, remote, &outcome_tx, key);
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_key<C: RemoteCollection + 'static>(
    app: &mut App,
    reconciler: &Reconciler,
    remote: &Arc<C>,
    outcome_tx: &mpsc::UnboundedSender<CommandOutcome>,
    key: KeyEvent,
) {
    // The confirmation overlay captures every key while a delete is pending
    if app.pending_delete.is_some() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                if let Some(task) = app.pending_delete.clone() {
                    app::spawn_delete(Arc::clone(remote), task, outcome_tx.clone());
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                app.cancel_delete();
            }
            _ => {}
        }
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, reconciler, remote, key),
        InputMode::Editing => handle_editing_mode(app, remote, outcome_tx, key),
    }
}

/// Handle key events in normal mode
fn handle_normal_mode<C: RemoteCollection + 'static>(
    app: &mut App,
    reconciler: &Reconciler,
    remote: &Arc<C>,
    key: KeyEvent,
) {
    match key.code {
        // Quit
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }

        // Compose a new task
        KeyCode::Char('a') | KeyCode::Char('i') => {
            app.enter_input_mode();
        }

        // Navigation
        KeyCode::Char('k') | KeyCode::Up => {
            app.move_up();
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.move_down(filter::count(app.filter, reconciler.tasks()));
        }

        // Toggle the selected task, trusting its rendered completed value
        KeyCode::Char(' ') | KeyCode::Enter => {
            if let Some(task) = app.selected_task(reconciler.tasks()) {
                app::spawn_toggle(Arc::clone(remote), task.id.clone(), task.completed);
            }
        }

        // Ask before deleting
        KeyCode::Char('d') => {
            if let Some(task) = app.selected_task(reconciler.tasks()) {
                let task = task.clone();
                app.request_delete(task);
            }
        }

        // Filter switching
        KeyCode::Tab | KeyCode::Char('f') => {
            app.cycle_filter();
            app.clamp_selection(filter::count(app.filter, reconciler.tasks()));
        }
        KeyCode::Char('1') => {
            app.set_filter(TaskFilter::All);
            app.clamp_selection(filter::count(app.filter, reconciler.tasks()));
        }
        KeyCode::Char('2') => {
            app.set_filter(TaskFilter::Active);
            app.clamp_selection(filter::count(app.filter, reconciler.tasks()));
        }
        KeyCode::Char('3') => {
            app.set_filter(TaskFilter::Completed);
            app.clamp_selection(filter::count(app.filter, reconciler.tasks()));
        }

        _ => {}
    }
}

/// Handle key events while composing a new task
fn handle_editing_mode<C: RemoteCollection + 'static>(
    app: &mut App,
    remote: &Arc<C>,
    outcome_tx: &mpsc::UnboundedSender<CommandOutcome>,
    key: KeyEvent,
) {
    match key.code {
        // Back to normal mode; typed text is kept
        KeyCode::Esc => {
            app.exit_input_mode();
        }
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.exit_input_mode();
        }

        // Submit as typed; empty text is accepted, the store does not validate
        KeyCode::Enter => {
            app::spawn_create(Arc::clone(remote), app.input.clone(), outcome_tx.clone());
        }

        // Text input
        KeyCode::Char(c) => {
            app.insert_char(c);
        }
        KeyCode::Backspace => {
            app.delete_char();
        }
        KeyCode::Left => {
            app.cursor_left();
        }
        KeyCode::Right => {
            app.cursor_right();
        }

        _ => {}
    }
}

/// Initialize logging for TUI mode
///
/// Only initializes if the TASKMIRROR_LOG environment variable is set.
/// Logs to file (config.log_file or the default log path).
fn init_tui_logging(config: &Config) {
    // Only log if TASKMIRROR_LOG is set
    let Ok(log_level) = std::env::var("TASKMIRROR_LOG") else {
        return;
    };

    let log_path = config
        .log_file
        .clone()
        .unwrap_or_else(Config::default_log_path);

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!(
        "taskmirror_core={},taskmirror_cli={}",
        log_level, log_level
    ));

    // Initialize file-based logging (ignore error if already initialized)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("TUI logging initialized to {:?}", log_path);
}
