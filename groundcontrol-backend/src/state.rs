use std::sync::Arc;

use groundcontrol_config::Config;
use groundcontrol_job_queue::JobManager;
use groundcontrol_jobs::{Git, GitCli, ShellRunner, TaskRunner, WorkspaceJobs};
use groundcontrol_model::{Hub, NodeRegistry, User};
use tokio_util::sync::CancellationToken;

use crate::bootstrap::register_workspaces;

/// Shared application state passed to every route handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub nodes: Arc<NodeRegistry>,
    pub hub: Hub,
    pub jobs: JobManager,
    pub workspace_jobs: WorkspaceJobs,
    pub viewer: User,
    /// Cancelled when the server begins shutting down. Ends open event streams
    /// and stops the job dispatcher.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Build the state with the `git` executable and `sh` as collaborators.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config, Arc::new(GitCli::default()), Arc::new(ShellRunner))
    }

    /// Build a fully initialised state container from its constituent parts.
    pub fn new(config: &Config, git: Arc<dyn Git>, tasks: Arc<dyn TaskRunner>) -> Self {
        let nodes = Arc::new(NodeRegistry::new());
        let hub = Hub::with_capacity(config.jobs.subscriber_buffer);

        register_workspaces(&nodes, &config.workspaces);

        let jobs = JobManager::new(Arc::clone(&nodes), hub.clone(), config.jobs.concurrency);
        let workspace_jobs =
            WorkspaceJobs::new(jobs.clone(), git, tasks, config.workspaces_root.clone());
        workspace_jobs.refresh_cloned();

        Self {
            nodes,
            hub,
            jobs,
            workspace_jobs,
            viewer: User::local(),
            shutdown: CancellationToken::new(),
        }
    }
}
