//! Remote operation error handling
//!
//! Every failure talking to the collection server lands here. Callers log
//! the failed operation and carry on; nothing is retried and nothing is
//! surfaced to the user interface beyond "the intended change did not
//! happen".

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors that can occur against the remote collection
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Could not reach the collection server
    #[error("failed to connect to collection server: {0}")]
    Connect(#[source] tungstenite::Error),

    /// Server did not complete the handshake in time
    #[error("timed out waiting for collection server '{url}'. Check that the server is running.")]
    HandshakeTimeout { url: String },

    /// Connection is gone; in-flight requests will never resolve
    #[error("connection to collection server closed")]
    Closed,

    /// Transport-level failure on an established connection
    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    /// Server answered with something the protocol does not allow here
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Server refused the request
    #[error("server rejected request: {message}")]
    Rejected { message: String },

    /// Malformed message payload
    #[error("invalid message payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type for remote collection operations
pub type RemoteResult<T> = Result<T, RemoteError>;
