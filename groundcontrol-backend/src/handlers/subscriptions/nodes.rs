use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::response::sse::{Event as SseEvent, Sse};
use futures::Stream;
use groundcontrol_model::{node_filter, Topic};
use groundcontrol_relay::{from_id, NodeType};

use crate::handlers::subscriptions::event_stream;
use crate::handlers::utils::path_param;
use crate::{error::ApiError, state::AppState};

/// GET /subscriptions/nodes/{id}
/// Stream updates of a single project or workspace.
pub async fn subscribe_node(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): Path<HashMap<String, String>>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, axum::Error>>>, ApiError> {
    let id = path_param(&path, "id")?;

    let topic = match from_id(id)?.0 {
        NodeType::Project => Topic::ProjectUpdated,
        NodeType::Workspace => Topic::WorkspaceUpdated,
        other => {
            return Err(ApiError::bad_request(format!(
                "cannot subscribe to {other} nodes"
            )))
        }
    };

    if state.nodes.get(id).is_none() {
        return Err(ApiError::not_found(format!("node {id}")));
    }

    let subscription = state.hub.subscribe_filtered(topic, node_filter(id));
    Ok(event_stream(subscription, state.shutdown.clone()))
}
