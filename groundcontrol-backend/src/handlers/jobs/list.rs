use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{rejection::QueryRejection, Extension, Query};
use axum::Json;
use serde_json::{json, Value};

use crate::handlers::utils::{connection_args_from_params, job_filter_from_params};
use crate::{error::ApiError, state::AppState};

/// GET /jobs
/// List jobs newest first as a relay connection.
///
/// Query parameters: `status` (comma separated), `ownerId`, `first`, `last`,
/// `after` and `before`.
pub async fn list_jobs(
    Extension(state): Extension<Arc<AppState>>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let params = query.ok().map(|value| value.0).unwrap_or_default();
    let filter = job_filter_from_params(&params)?;
    let args = connection_args_from_params(&params)?;

    let connection = state.jobs.find(&filter, &args)?;

    Ok(Json(json!(connection)))
}
