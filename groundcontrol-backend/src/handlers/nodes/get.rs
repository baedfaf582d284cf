use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::Json;
use groundcontrol_relay::from_id;
use serde_json::{json, Value};

use crate::handlers::utils::path_param;
use crate::{error::ApiError, state::AppState};

/// GET /nodes/{id}
/// Resolve any global id to the entity it names.
pub async fn get_node(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): Path<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let id = path_param(&path, "id")?;
    from_id(id)?;

    let node = state
        .nodes
        .get(id)
        .ok_or_else(|| ApiError::not_found(format!("node {id}")))?;

    Ok(Json(json!(node)))
}
