//! Error types for the job queue.

use groundcontrol_relay::PaginationError;
use thiserror::Error;

/// Errors that may occur while interacting with the job queue.
///
/// Work failures are not represented here: they only show up as a job
/// ending in `FAILED`.
#[derive(Debug, Error)]
pub enum JobQueueError {
    #[error("the job dispatcher is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Pagination(#[from] PaginationError),
}
