use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::Json;
use serde_json::{json, Value};

use crate::handlers::utils::path_param;
use crate::{error::ApiError, state::AppState};

/// POST /workspaces/{id}/pull
pub async fn pull_workspace(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): Path<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let id = path_param(&path, "id")?;
    let jobs = state.workspace_jobs.pull_workspace(id)?;
    Ok(Json(json!({ "jobs": jobs })))
}
