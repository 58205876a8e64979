use std::time::Duration;
use thiserror::Error;

/// Error type returned by an [`Expander`](crate::expander::Expander).
pub type ExpandError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Malformed start node: {0}")]
    MalformedNode(String),

    #[error("Expansion of {node} failed: {source}")]
    Expansion {
        node: String,
        #[source]
        source: ExpandError,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    #[error("Worker {id} panicked")]
    WorkerPanicked { id: usize },

    #[error("Traversal cancelled")]
    Cancelled,

    #[error("Traversal timed out after {0:?}")]
    TimedOut(Duration),
}

pub type Result<T> = std::result::Result<T, ScanError>;
