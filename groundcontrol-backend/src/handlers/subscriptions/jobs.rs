use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{rejection::QueryRejection, Extension, Query};
use axum::response::sse::{Event as SseEvent, Sse};
use futures::Stream;
use groundcontrol_model::Topic;

use crate::handlers::subscriptions::event_stream;
use crate::handlers::utils::job_filter_from_params;
use crate::{error::ApiError, state::AppState};

/// GET /subscriptions/jobs
/// Stream `JOB_UPSERTED` events, optionally filtered by `status` and `ownerId`.
pub async fn subscribe_jobs(
    Extension(state): Extension<Arc<AppState>>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, axum::Error>>>, ApiError> {
    let params = query.ok().map(|value| value.0).unwrap_or_default();
    let filter = job_filter_from_params(&params)?;

    let subscription = state
        .hub
        .subscribe_filtered(Topic::JobUpserted, filter.into_event_filter());

    Ok(event_stream(subscription, state.shutdown.clone()))
}

/// GET /subscriptions/jobs/metrics
pub async fn subscribe_job_metrics(
    Extension(state): Extension<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<SseEvent, axum::Error>>> {
    let subscription = state.hub.subscribe(Topic::JobMetricsUpdated);
    event_stream(subscription, state.shutdown.clone())
}
