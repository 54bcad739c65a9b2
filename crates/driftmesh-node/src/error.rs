//! Node layer error types.

use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("node is shutting down")]
    ShuttingDown,
}
