//! Server-sent event streams backed by hub subscriptions.

pub mod jobs;
pub mod nodes;

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use groundcontrol_model::{Event, Topic};
use groundcontrol_pubsub::Subscription;
use tokio_util::sync::CancellationToken;

/// Forward a subscription to the client until it disconnects or the server
/// shuts down. Each SSE event is named after its topic and carries the
/// event as JSON.
pub(crate) fn event_stream(
    subscription: Subscription<Topic, Event>,
    shutdown: CancellationToken,
) -> Sse<impl Stream<Item = Result<SseEvent, axum::Error>>> {
    let subscriber_id = subscription.id();
    tracing::debug!(subscriber_id, topic = %subscription.topic(), "event stream opened");

    let stream = subscription
        .into_stream()
        .take_until(shutdown.cancelled_owned())
        .map(|event| {
            SseEvent::default()
                .event(event.topic().as_str())
                .json_data(&event)
        });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
