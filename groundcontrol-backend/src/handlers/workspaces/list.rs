use std::sync::Arc;

use axum::extract::Extension;
use axum::Json;
use serde_json::{json, Value};

use crate::{error::ApiError, state::AppState};

/// GET /workspaces
/// List workspaces sorted by slug.
pub async fn list_workspaces(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let workspaces = state.nodes.workspaces();
    Ok(Json(json!({ "items": workspaces })))
}
