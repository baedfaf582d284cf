use std::sync::Arc;

use axum::{
    extract::Extension,
    response::IntoResponse,
    routing::{get, post},
    Router,
};

use crate::{handlers, state::AppState};

/// Build the axum router with every API route nested under `/api`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/viewer", get(handlers::viewer::get_viewer))
        .route("/jobs", get(handlers::jobs::list::list_jobs))
        .route("/jobs/metrics", get(handlers::jobs::metrics::get_metrics))
        .route("/nodes/{id}", get(handlers::nodes::get::get_node))
        .route("/workspaces", get(handlers::workspaces::list::list_workspaces))
        .route(
            "/workspaces/{id}/clone",
            post(handlers::workspaces::clone::clone_workspace),
        )
        .route(
            "/workspaces/{id}/pull",
            post(handlers::workspaces::pull::pull_workspace),
        )
        .route(
            "/workspaces/{id}/run",
            post(handlers::workspaces::run::run_task),
        )
        .route(
            "/projects/{id}/clone",
            post(handlers::projects::clone::clone_project),
        )
        .route(
            "/projects/{id}/pull",
            post(handlers::projects::pull::pull_project),
        )
        .route(
            "/subscriptions/jobs",
            get(handlers::subscriptions::jobs::subscribe_jobs),
        )
        .route(
            "/subscriptions/jobs/metrics",
            get(handlers::subscriptions::jobs::subscribe_job_metrics),
        )
        .route(
            "/subscriptions/nodes/{id}",
            get(handlers::subscriptions::nodes::subscribe_node),
        )
        .layer(Extension(state));

    Router::new().nest("/api", router)
}

async fn health_handler() -> impl IntoResponse {
    (axum::http::StatusCode::OK, "OK")
}
