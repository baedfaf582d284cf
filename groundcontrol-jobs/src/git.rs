//! Git operations used by clone and pull jobs.

use std::path::Path;

use anyhow::{bail, Context};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Source control backend.
#[async_trait]
pub trait Git: Send + Sync {
    /// Clone `branch` of `repository` into `dest`.
    async fn clone_branch(&self, repository: &str, branch: &str, dest: &Path) -> anyhow::Result<()>;

    /// Fast-forward the checkout in `dir`.
    async fn pull(&self, dir: &Path) -> anyhow::Result<()>;
}

/// [`Git`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: "git".to_owned(),
        }
    }
}

impl GitCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str], dir: Option<&Path>) -> anyhow::Result<()> {
        let mut command = Command::new(&self.program);
        command.args(args).kill_on_drop(true);
        if let Some(dir) = dir {
            command.current_dir(dir);
        }

        debug!(program = %self.program, ?args, "running git");
        let output = command
            .output()
            .await
            .with_context(|| format!("failed to spawn {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git {} exited with {}: {}", args.join(" "), output.status, stderr.trim());
        }
        Ok(())
    }
}

#[async_trait]
impl Git for GitCli {
    async fn clone_branch(&self, repository: &str, branch: &str, dest: &Path) -> anyhow::Result<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let dest = dest.to_string_lossy();
        self.run(
            &["clone", "--branch", branch, "--single-branch", repository, &*dest],
            None,
        )
        .await
    }

    async fn pull(&self, dir: &Path) -> anyhow::Result<()> {
        self.run(&["pull", "--ff-only"], Some(dir)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let git = GitCli::new("groundcontrol-no-such-git");
        let dir = tempfile::tempdir().unwrap();
        let err = git.pull(dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("failed to spawn"));
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error() {
        let git = GitCli::new("false");
        let dir = tempfile::tempdir().unwrap();
        let err = git.pull(dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }
}
