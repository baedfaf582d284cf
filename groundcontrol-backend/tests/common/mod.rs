#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, Response},
    Router,
};
use groundcontrol_backend::{build_router, state::AppState};
use groundcontrol_config::{Config, ProjectConfig, WorkspaceConfig};
use groundcontrol_jobs::{Git, TaskRunner};
use groundcontrol_model::{Job, JobStatus};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::util::ServiceExt;

/// Git double that creates the destination directory instead of cloning.
#[derive(Default)]
pub struct FakeGit {
    pub clones: Mutex<Vec<String>>,
    pub pulls: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl Git for FakeGit {
    async fn clone_branch(&self, repository: &str, branch: &str, dest: &Path) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(dest).await?;
        self.clones
            .lock()
            .unwrap()
            .push(format!("{repository}@{branch}"));
        Ok(())
    }

    async fn pull(&self, dir: &Path) -> anyhow::Result<()> {
        self.pulls.lock().unwrap().push(dir.to_path_buf());
        Ok(())
    }
}

/// Task runner double that records commands. `fail` makes every command fail.
#[derive(Default)]
pub struct FakeRunner {
    pub commands: Mutex<Vec<String>>,
    pub fail: bool,
}

#[async_trait]
impl TaskRunner for FakeRunner {
    async fn run(&self, command: &str, _dir: &Path) -> anyhow::Result<()> {
        self.commands.lock().unwrap().push(command.to_owned());
        if self.fail {
            anyhow::bail!("command exited with status 1");
        }
        Ok(())
    }
}

pub struct TestContext {
    pub state: Arc<AppState>,
    pub app: Router,
    pub git: Arc<FakeGit>,
    pub runner: Arc<FakeRunner>,
    pub _root: TempDir,
}

pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.workspaces_root = root.to_path_buf();
    config.workspaces = vec![
        WorkspaceConfig {
            slug: "tools".into(),
            name: "Tools".into(),
            description: Some("Internal tools".into()),
            projects: vec![
                ProjectConfig {
                    repository: "github.com/org/cli".into(),
                    branch: "main".into(),
                    description: None,
                },
                ProjectConfig {
                    repository: "github.com/org/lib".into(),
                    branch: "master".into(),
                    description: None,
                },
            ],
        },
        WorkspaceConfig {
            slug: "apps".into(),
            name: "Apps".into(),
            description: None,
            projects: vec![],
        },
    ];
    config
}

/// Build the state and router. The job dispatcher only runs when
/// `start_dispatcher` is set, so jobs otherwise stay queued.
pub fn setup(start_dispatcher: bool) -> TestContext {
    setup_with_runner(start_dispatcher, FakeRunner::default())
}

pub fn setup_with_runner(start_dispatcher: bool, runner: FakeRunner) -> TestContext {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    let git = Arc::new(FakeGit::default());
    let runner = Arc::new(runner);

    let state = Arc::new(AppState::new(&config, git.clone(), runner.clone()));
    if start_dispatcher {
        let jobs = state.jobs.clone();
        let token = state.shutdown.clone();
        tokio::spawn(async move { jobs.work(token).await });
    }
    let app = build_router(state.clone());

    TestContext {
        state,
        app,
        git,
        runner,
        _root: root,
    }
}

/// Percent-encode a base64 id or cursor for use in a path or query string.
pub fn encode(id: &str) -> String {
    id.replace('+', "%2B")
        .replace('/', "%2F")
        .replace('=', "%3D")
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(req).await.unwrap()
}

pub async fn json_body(res: Response<Body>) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Wait until the job reaches a terminal status.
pub async fn wait_for_terminal(state: &AppState, job_id: &str) -> Job {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(job) = state.jobs.get(job_id) {
                if job.status.is_terminal() {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("job did not finish in time")
}

pub fn assert_status(job: &Job, status: JobStatus) {
    assert_eq!(job.status, status, "job {} ({})", job.id, job.name);
}
