use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::handlers::utils::path_param;
use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RunTaskRequest {
    pub command: String,
}

/// POST /workspaces/{id}/run
/// Queue a shell command to run in the workspace directory.
pub async fn run_task(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): Path<HashMap<String, String>>,
    Json(body): Json<RunTaskRequest>,
) -> Result<Json<Value>, ApiError> {
    let id = path_param(&path, "id")?;
    let command = body.command.trim();
    if command.is_empty() {
        return Err(ApiError::bad_request("command must not be empty"));
    }

    let job = state.workspace_jobs.run_task(id, command)?;
    Ok(Json(json!(job)))
}
