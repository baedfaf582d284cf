//! Errors raised while scheduling jobs.

use groundcontrol_relay::{IdError, NodeType};
use thiserror::Error;

/// Errors that may occur before a job is handed to the queue.
///
/// Failures of the work itself never surface here.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("node not found: {0}")]
    NotFound(String),

    #[error("node {id} is not a {expected}")]
    WrongType { id: String, expected: NodeType },

    #[error("{0}")]
    Duplicate(String),

    #[error(transparent)]
    Relay(#[from] IdError),
}
