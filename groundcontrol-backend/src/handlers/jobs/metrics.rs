use std::sync::Arc;

use axum::extract::Extension;
use axum::Json;
use serde_json::{json, Value};

use crate::{error::ApiError, state::AppState};

/// GET /jobs/metrics
pub async fn get_metrics(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let metrics = state.jobs.metrics();
    Ok(Json(json!({
        "queued": metrics.queued,
        "running": metrics.running,
        "done": metrics.done,
        "failed": metrics.failed,
        "total": metrics.total(),
    })))
}
