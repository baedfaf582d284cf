use std::sync::Arc;

use axum::extract::Extension;
use axum::Json;
use serde_json::{json, Value};

use crate::{error::ApiError, state::AppState};

/// GET /viewer
/// Return the user making requests. The server only knows the local user.
pub async fn get_viewer(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!({
        "id": state.viewer.id,
        "name": state.viewer.name,
    })))
}
