//! taskmirror Core Library
//!
//! This crate provides the core functionality for taskmirror, a task list
//! whose state lives in a remote realtime collection and is mirrored into
//! local view state by an event subscription.
//!
//! # Architecture
//!
//! - **Remote collection**: the external store owns the data; this crate
//!   only consumes its contract (snapshot, per-event-kind subscriptions,
//!   keyed writes)
//! - **Reconciler**: folds the remote event feeds into a local ordered list
//!   without ever refetching
//! - **Commands**: issue remote mutations and rely on the event feed to
//!   reflect the outcome; they never touch the local list directly
//!
//! # Quick Start
//!
//! ```text
//! let remote = MemoryCollection::new();
//! let mut reconciler = Reconciler::attach(&remote).await?;
//!
//! commands::create_task(&remote, "Buy milk").await?;
//!
//! while let Some(event) = reconciler.next_change().await {
//!     reconciler.apply(event);
//! }
//! ```
//!
//! # Modules
//!
//! - `remote`: the collection contract plus the wire and in-memory clients
//! - `reconciler`: local mirror of the remote collection
//! - `commands`: remote mutation commands (create, toggle, delete)
//! - `models`: task record and wire payload
//! - `config`: application configuration

pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod reconciler;
pub mod remote;

pub use config::Config;
pub use error::{RemoteError, RemoteResult};
pub use models::{Task, TaskPayload};
pub use reconciler::{Mirror, Reconciler};
pub use remote::{ChangeEvent, EventKind, MemoryCollection, RemoteCollection, Subscription, WsCollection};
