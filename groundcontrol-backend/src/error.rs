use axum::{http::StatusCode, response::IntoResponse, Json};
use groundcontrol_job_queue::JobQueueError;
use groundcontrol_jobs::JobError;
use groundcontrol_relay::{IdError, PaginationError};
use serde_json::json;
use thiserror::Error;

/// Top-level API error shared by all route handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Job(#[from] JobError),
    #[error(transparent)]
    JobQueue(#[from] JobQueueError),
    #[error(transparent)]
    Id(#[from] IdError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Job(JobError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Job(JobError::Duplicate(_)) => StatusCode::CONFLICT,
            ApiError::Job(JobError::WrongType { .. } | JobError::Relay(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::JobQueue(JobQueueError::Pagination(PaginationError::InvalidArgument {
                ..
            })) => StatusCode::BAD_REQUEST,
            ApiError::JobQueue(JobQueueError::AlreadyRunning) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Id(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundcontrol_relay::NodeType;

    #[test]
    fn maps_errors_to_status_codes() {
        assert_eq!(
            ApiError::from(JobError::NotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(JobError::Duplicate("x".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(JobError::WrongType {
                id: "x".into(),
                expected: NodeType::Project
            })
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(JobQueueError::Pagination(
                PaginationError::InvalidArgument { argument: "first" }
            ))
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(groundcontrol_relay::from_id("!!").unwrap_err()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
