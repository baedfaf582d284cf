//! Error types for id decoding and pagination.

use thiserror::Error;

/// Errors raised while decoding a global id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("malformed identifier `{id}`: {reason}")]
    Malformed { id: String, reason: &'static str },
}

impl IdError {
    pub(crate) fn malformed(id: &str, reason: &'static str) -> Self {
        Self::Malformed {
            id: id.to_owned(),
            reason,
        }
    }
}

/// Errors raised by [`paginate`](crate::paginate) for invalid connection arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("invalid argument: \"{argument}\" must be a non-negative integer")]
    InvalidArgument { argument: &'static str },
}
