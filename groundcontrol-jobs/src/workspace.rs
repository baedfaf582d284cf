//! Jobs acting on workspaces and their projects.

use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use groundcontrol_job_queue::JobManager;
use groundcontrol_model::{from_id, publish, Event, Job, Node, NodeType, Project, Workspace};
use tracing::{debug, info};

use crate::error::JobError;
use crate::git::Git;
use crate::task::TaskRunner;

/// Schedules clone, pull and task jobs.
///
/// A project can only have one clone and one pull in flight. The matching
/// `is_cloning`/`is_pulling` flag is set when the job is submitted and cleared
/// (with project and workspace update events) before the job reaches its
/// terminal status.
#[derive(Clone)]
pub struct WorkspaceJobs {
    manager: JobManager,
    git: Arc<dyn Git>,
    tasks: Arc<dyn TaskRunner>,
    workspaces_root: PathBuf,
    update_lock: Arc<Mutex<()>>,
}

impl fmt::Debug for WorkspaceJobs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceJobs")
            .field("manager", &self.manager)
            .field("workspaces_root", &self.workspaces_root)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum Flag {
    Cloning,
    Pulling,
}

impl Flag {
    fn get(self, project: &Project) -> bool {
        match self {
            Self::Cloning => project.is_cloning,
            Self::Pulling => project.is_pulling,
        }
    }

    fn set(self, project: &mut Project, value: bool) {
        match self {
            Self::Cloning => project.is_cloning = value,
            Self::Pulling => project.is_pulling = value,
        }
    }
}

impl WorkspaceJobs {
    pub fn new(
        manager: JobManager,
        git: Arc<dyn Git>,
        tasks: Arc<dyn TaskRunner>,
        workspaces_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            manager,
            git,
            tasks,
            workspaces_root: workspaces_root.into(),
            update_lock: Arc::new(Mutex::new(())),
        }
    }

    #[inline]
    pub fn manager(&self) -> &JobManager {
        &self.manager
    }

    #[inline]
    pub fn workspaces_root(&self) -> &Path {
        &self.workspaces_root
    }

    /// Resolve `id` to a project, checking its type first.
    pub fn project(&self, id: &str) -> Result<Project, JobError> {
        match self.resolve(id, NodeType::Project)? {
            Node::Project(project) => Ok(project),
            _ => Err(wrong_type(id, NodeType::Project)),
        }
    }

    /// Resolve `id` to a workspace, checking its type first.
    pub fn workspace(&self, id: &str) -> Result<Workspace, JobError> {
        match self.resolve(id, NodeType::Workspace)? {
            Node::Workspace(workspace) => Ok(workspace),
            _ => Err(wrong_type(id, NodeType::Workspace)),
        }
    }

    fn resolve(&self, id: &str, expected: NodeType) -> Result<Node, JobError> {
        let (node_type, _) = from_id(id)?;
        if node_type != expected {
            return Err(wrong_type(id, expected));
        }
        self.manager
            .nodes()
            .get(id)
            .ok_or_else(|| JobError::NotFound(id.to_owned()))
    }

    fn workspace_of(&self, project: &Project) -> Result<Workspace, JobError> {
        self.manager
            .nodes()
            .workspace(&project.workspace_id)
            .ok_or_else(|| JobError::NotFound(project.workspace_id.clone()))
    }

    /// Where `project` is checked out.
    pub fn project_path(&self, project: &Project, workspace: &Workspace) -> PathBuf {
        project.local_path(&self.workspaces_root, &workspace.slug)
    }

    pub fn is_cloned(&self, project: &Project, workspace: &Workspace) -> bool {
        self.project_path(project, workspace).exists()
    }

    /// Apply `change` to the stored project and announce the result.
    fn update_project<F>(&self, project_id: &str, change: F) -> Result<Project, JobError>
    where
        F: FnOnce(&mut Project) -> Result<(), JobError>,
    {
        let _guard = self.update_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut project = self.project(project_id)?;
        change(&mut project)?;
        self.manager.nodes().store(project.clone());

        let hub = self.manager.hub();
        publish(hub, Event::ProjectUpdated(project.clone()));
        if let Some(workspace) = self.manager.nodes().workspace(&project.workspace_id) {
            publish(hub, Event::WorkspaceUpdated(workspace));
        }
        Ok(project)
    }

    /// Raise `flag`, failing with [`JobError::Duplicate`] if it is already set.
    fn set_flag(&self, project_id: &str, flag: Flag) -> Result<Project, JobError> {
        let project = self.update_project(project_id, |project| {
            if flag.get(project) {
                let verb = match flag {
                    Flag::Cloning => "cloned",
                    Flag::Pulling => "pulled",
                };
                return Err(JobError::Duplicate(format!(
                    "project {project_id} is already being {verb}"
                )));
            }
            flag.set(project, true);
            Ok(())
        })?;
        debug!(project_id, ?flag, "project flag raised");
        Ok(project)
    }

    /// Run `work` and lower `flag` afterwards, whether `work` succeeds,
    /// fails or panics. A panic is resumed once the flag is down.
    async fn with_flag<Fut>(&self, project_id: &str, flag: Flag, work: Fut) -> anyhow::Result<()>
    where
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let outcome = AssertUnwindSafe(work).catch_unwind().await;
        let cloned = matches!((flag, &outcome), (Flag::Cloning, Ok(Ok(()))));

        self.update_project(project_id, |project| {
            flag.set(project, false);
            if cloned {
                project.is_cloned = true;
            }
            Ok(())
        })?;
        debug!(project_id, ?flag, cloned, "project flag lowered");

        match outcome {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Record which projects already have a checkout on disk.
    pub fn refresh_cloned(&self) {
        let _guard = self.update_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let nodes = self.manager.nodes();

        for workspace in nodes.workspaces() {
            for project_id in &workspace.project_ids {
                let Some(mut project) = nodes.project(project_id) else {
                    continue;
                };
                let cloned = self.is_cloned(&project, &workspace);
                if project.is_cloned != cloned {
                    project.is_cloned = cloned;
                    nodes.store(project);
                }
            }
        }
    }

    /// Queue a clone of the project's branch into its local path.
    pub fn clone_project(&self, project_id: &str) -> Result<Job, JobError> {
        let project = self.project(project_id)?;
        let workspace = self.workspace_of(&project)?;
        let project = self.set_flag(&project.id, Flag::Cloning)?;

        let dest = self.project_path(&project, &workspace);
        let name = format!(
            "Clone \"{}@{}\" into workspace \"{}\"",
            project.repository, project.branch, workspace.name
        );

        let this = self.clone();
        let owner_id = project.id.clone();
        let job = self.manager.submit(name, owner_id, move || async move {
            let clone = this
                .git
                .clone_branch(&project.repository, &project.branch, &dest);
            this.with_flag(&project.id, Flag::Cloning, clone).await
        });

        info!(job_id = %job.id, project_id, "clone submitted");
        Ok(job)
    }

    /// Queue a pull of the project's local checkout.
    pub fn pull_project(&self, project_id: &str) -> Result<Job, JobError> {
        let project = self.project(project_id)?;
        let workspace = self.workspace_of(&project)?;
        let project = self.set_flag(&project.id, Flag::Pulling)?;

        let dir = self.project_path(&project, &workspace);
        let name = format!("Pull \"{}@{}\"", project.repository, project.branch);

        let this = self.clone();
        let owner_id = project.id.clone();
        let job = self.manager.submit(name, owner_id, move || async move {
            let pull = this.git.pull(&dir);
            this.with_flag(&project.id, Flag::Pulling, pull).await
        });

        info!(job_id = %job.id, project_id, "pull submitted");
        Ok(job)
    }

    /// Clone every project of the workspace that is neither cloned nor cloning.
    pub fn clone_workspace(&self, workspace_id: &str) -> Result<Vec<Job>, JobError> {
        let workspace = self.workspace(workspace_id)?;
        let mut jobs = Vec::new();

        for project_id in &workspace.project_ids {
            let project = self.project(project_id)?;
            if project.is_cloning || self.is_cloned(&project, &workspace) {
                continue;
            }
            match self.clone_project(project_id) {
                Ok(job) => jobs.push(job),
                Err(JobError::Duplicate(_)) => {}
                Err(err) => return Err(err),
            }
        }

        Ok(jobs)
    }

    /// Pull every cloned project of the workspace that is not already pulling.
    pub fn pull_workspace(&self, workspace_id: &str) -> Result<Vec<Job>, JobError> {
        let workspace = self.workspace(workspace_id)?;
        let mut jobs = Vec::new();

        for project_id in &workspace.project_ids {
            let project = self.project(project_id)?;
            if project.is_pulling || !self.is_cloned(&project, &workspace) {
                continue;
            }
            match self.pull_project(project_id) {
                Ok(job) => jobs.push(job),
                Err(JobError::Duplicate(_)) => {}
                Err(err) => return Err(err),
            }
        }

        Ok(jobs)
    }

    /// Queue `command` to run in the workspace directory.
    pub fn run_task(&self, workspace_id: &str, command: &str) -> Result<Job, JobError> {
        let workspace = self.workspace(workspace_id)?;
        let dir = self.workspaces_root.join(&workspace.slug);
        let name = format!("Run \"{command}\" in workspace \"{}\"", workspace.name);

        let tasks = Arc::clone(&self.tasks);
        let command = command.to_owned();
        let job = self.manager.submit(name, workspace.id.clone(), move || async move {
            tasks.run(&command, &dir).await
        });

        info!(job_id = %job.id, workspace_id, "task submitted");
        Ok(job)
    }
}

fn wrong_type(id: &str, expected: NodeType) -> JobError {
    JobError::WrongType {
        id: id.to_owned(),
        expected,
    }
}
