//! Concrete jobs for Ground Control workspaces.
//!
//! [`WorkspaceJobs`] turns requests such as "clone this project" into jobs
//! on the [`JobManager`](groundcontrol_job_queue::JobManager). The external
//! tools it drives sit behind the [`Git`] and [`TaskRunner`] traits so they
//! can be swapped out in tests.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use groundcontrol_job_queue::JobManager;
//! use groundcontrol_jobs::{GitCli, ShellRunner, WorkspaceJobs};
//! use groundcontrol_model::{Hub, NodeRegistry};
//!
//! let manager = JobManager::new(Arc::new(NodeRegistry::new()), Hub::new(), 2);
//! let jobs = WorkspaceJobs::new(
//!     manager,
//!     Arc::new(GitCli::default()),
//!     Arc::new(ShellRunner),
//!     "/srv/groundcontrol/workspaces",
//! );
//! # let _ = jobs;
//! ```

mod error;
mod git;
mod task;
mod workspace;

pub use error::JobError;
pub use git::{Git, GitCli};
pub use task::{ShellRunner, TaskRunner};
pub use workspace::WorkspaceJobs;
