//! Output formatting for CLI
//!
//! Provides consistent output formatting across the one-shot commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use taskmirror_core::Task;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single task
    pub fn print_task(&self, task: &Task) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:        {}", task.id);
                println!("Text:      {}", task.text);
                println!("Completed: {}", if task.completed { "yes" } else { "no" });
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(task).unwrap());
            }
            OutputFormat::Quiet => {
                println!("{}", task.id);
            }
        }
    }

    /// Print a list of tasks
    pub fn print_tasks(&self, tasks: &[&Task]) {
        match self.format {
            OutputFormat::Human => {
                if tasks.is_empty() {
                    println!("No tasks found.");
                    return;
                }
                for task in tasks {
                    let mark = if task.completed { "x" } else { " " };
                    println!("[{}] {} | {}", mark, task.id, truncate(&task.text, 60));
                }
                println!("\n{} task(s)", tasks.len());
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&tasks).unwrap());
            }
            OutputFormat::Quiet => {
                for task in tasks {
                    println!("{}", task.id);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Truncate a string to max length in bytes, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }

    // Back off to a char boundary; task text is arbitrary UTF-8
    let mut cut = max_len - 3;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &s[..cut])
}
