//! One-shot command handlers
//!
//! Each handler opens the collection, performs a single operation, and
//! prints through the shared [`Output`] helper.

use std::path::PathBuf;

use anyhow::{bail, Result};
use taskmirror_core::{commands, Config, RemoteCollection, Task};

use crate::filter::{self, TaskFilter};
use crate::output::{Output, OutputFormat};
use crate::ConfigCommands;

/// Add a new task
pub async fn add<C: RemoteCollection>(remote: &C, text: &str, output: &Output) -> Result<()> {
    let key = commands::create_task(remote, text).await?;
    if output.is_quiet() {
        println!("{}", key);
    } else {
        output.success(&format!("Added task {}", key));
    }
    Ok(())
}

/// List tasks matching the filter
pub async fn list<C: RemoteCollection>(
    remote: &C,
    task_filter: TaskFilter,
    output: &Output,
) -> Result<()> {
    let tasks = fetch_tasks(remote).await?;
    output.print_tasks(&filter::visible(task_filter, &tasks));
    Ok(())
}

/// Show one task
pub async fn show<C: RemoteCollection>(remote: &C, id: &str, output: &Output) -> Result<()> {
    let task = find_task(remote, id).await?;
    output.print_task(&task);
    Ok(())
}

/// Toggle a task's completed flag
pub async fn toggle<C: RemoteCollection>(remote: &C, id: &str, output: &Output) -> Result<()> {
    let task = find_task(remote, id).await?;
    commands::toggle_complete(remote, &task.id, task.completed).await?;
    let state = if task.completed { "active" } else { "completed" };
    output.success(&format!("Marked '{}' as {}", task.text, state));
    Ok(())
}

/// Delete a task
///
/// Deleting a completed task is a silent no-op: no mutation is issued and
/// nothing is printed.
pub async fn delete<C: RemoteCollection>(remote: &C, id: &str, output: &Output) -> Result<()> {
    let task = find_task(remote, id).await?;
    if commands::delete_task(remote, &task).await? {
        output.success(&format!("Deleted '{}'", task.text));
    }
    Ok(())
}

/// Show or update configuration
pub fn config(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command.unwrap_or(ConfigCommands::Show) {
        ConfigCommands::Show => {
            let config = Config::load()?;
            match output.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&config).unwrap());
                }
                _ => {
                    println!(
                        "server_url = {}",
                        config.server_url.as_deref().unwrap_or("(not set)")
                    );
                    println!("collection = {}", config.collection);
                    if let Some(ref path) = config.log_file {
                        println!("log_file   = {}", path.display());
                    }
                }
            }
        }
        ConfigCommands::Path => {
            println!("{}", Config::config_file_path().display());
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load()?;
            match key.as_str() {
                "server_url" => {
                    config.server_url = if value.is_empty() { None } else { Some(value) };
                }
                "collection" => {
                    if value.is_empty() {
                        bail!("collection name cannot be empty");
                    }
                    config.collection = value;
                }
                "log_file" => {
                    config.log_file = if value.is_empty() {
                        None
                    } else {
                        Some(PathBuf::from(value))
                    };
                }
                other => bail!(
                    "Unknown config key: {} (expected server_url, collection, or log_file)",
                    other
                ),
            }
            config.save()?;
            output.success("Configuration updated");
        }
    }
    Ok(())
}

async fn fetch_tasks<C: RemoteCollection>(remote: &C) -> Result<Vec<Task>> {
    let entries = remote.snapshot().await?;
    Ok(entries
        .into_iter()
        .map(|(key, payload)| Task::from_entry(key, payload))
        .collect())
}

/// Resolve a task by full key or unambiguous prefix
async fn find_task<C: RemoteCollection>(remote: &C, id: &str) -> Result<Task> {
    let tasks = fetch_tasks(remote).await?;
    let mut matches = tasks.into_iter().filter(|task| task.id.starts_with(id));

    let Some(task) = matches.next() else {
        bail!("No task found with id '{}'", id);
    };
    if matches.next().is_some() {
        bail!("Task id '{}' is ambiguous, give more characters", id);
    }
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskmirror_core::{MemoryCollection, TaskPayload};

    #[tokio::test]
    async fn test_find_task_by_prefix() {
        let collection = MemoryCollection::with_entries(vec![
            ("alpha-1".to_string(), TaskPayload::new("one")),
            ("beta-2".to_string(), TaskPayload::new("two")),
        ]);

        let task = find_task(&collection, "beta").await.unwrap();
        assert_eq!(task.id, "beta-2");
    }

    #[tokio::test]
    async fn test_find_task_rejects_ambiguous_prefix() {
        let collection = MemoryCollection::with_entries(vec![
            ("task-11".to_string(), TaskPayload::new("one")),
            ("task-12".to_string(), TaskPayload::new("two")),
        ]);

        assert!(find_task(&collection, "task-1").await.is_err());
        assert!(find_task(&collection, "task-11").await.is_ok());
    }

    #[tokio::test]
    async fn test_find_task_missing() {
        let collection = MemoryCollection::new();
        assert!(find_task(&collection, "nope").await.is_err());
    }
}
