mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Response, StatusCode};
use groundcontrol_model::{Topic, Workspace};
use groundcontrol_relay::{to_id, NodeType};
use http_body_util::BodyExt;

use common::{encode, send, setup};

/// Read body frames until one carries an SSE event and return its text.
async fn next_event(res: &mut Response<Body>) -> String {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let frame = res
                .body_mut()
                .frame()
                .await
                .expect("stream ended")
                .expect("body error");
            if let Ok(data) = frame.into_data() {
                let text = String::from_utf8(data.to_vec()).unwrap();
                if text.contains("data:") {
                    return text;
                }
            }
        }
    })
    .await
    .expect("no event received")
}

#[tokio::test]
async fn job_stream_delivers_matching_upserts() {
    let ctx = setup(false);

    let mut res = send(
        &ctx.app,
        Method::GET,
        "/api/subscriptions/jobs?ownerId=wanted",
        None,
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );
    assert_eq!(ctx.state.hub.listener_count(&Topic::JobUpserted), 1);

    ctx.state.jobs.submit("ignored", "other", || async { Ok(()) });
    let job = ctx.state.jobs.submit("kept", "wanted", || async { Ok(()) });

    let text = next_event(&mut res).await;
    assert!(text.contains("JOB_UPSERTED"), "{text}");
    assert!(text.contains(&job.id), "{text}");
    assert!(!text.contains("ignored"), "{text}");
}

#[tokio::test]
async fn node_stream_follows_project_flags() {
    let ctx = setup(false);
    let project_id = to_id(NodeType::Project, ["tools", "github.com/org/cli", "main"]);

    let mut res = send(
        &ctx.app,
        Method::GET,
        &format!("/api/subscriptions/nodes/{}", encode(&project_id)),
        None,
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    ctx.state.workspace_jobs.clone_project(&project_id).unwrap();

    let text = next_event(&mut res).await;
    assert!(text.contains("PROJECT_UPDATED"), "{text}");
    assert!(text.contains("\"isCloning\":true"), "{text}");
}

#[tokio::test]
async fn node_stream_rejects_unsupported_ids() {
    let ctx = setup(false);

    let job_id = to_id(NodeType::Job, ["1"]);
    let res = send(
        &ctx.app,
        Method::GET,
        &format!("/api/subscriptions/nodes/{}", encode(&job_id)),
        None,
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let missing = Workspace::id_for("missing");
    let res = send(
        &ctx.app,
        Method::GET,
        &format!("/api/subscriptions/nodes/{}", encode(&missing)),
        None,
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn streams_end_on_shutdown() {
    let ctx = setup(false);

    let mut res = send(&ctx.app, Method::GET, "/api/subscriptions/jobs/metrics", None).await;
    assert_eq!(res.status(), StatusCode::OK);

    ctx.state.shutdown.cancel();

    let end = tokio::time::timeout(Duration::from_secs(5), res.body_mut().frame())
        .await
        .expect("stream did not end");
    assert!(end.is_none());
}
