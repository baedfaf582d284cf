//! Shell commands run inside a workspace.

use std::path::Path;

use anyhow::{bail, Context};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// Run `command` with `dir` as working directory. A non-zero exit is an error.
    async fn run(&self, command: &str, dir: &Path) -> anyhow::Result<()>;
}

/// [`TaskRunner`] that hands the command to `sh -c`.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

#[async_trait]
impl TaskRunner for ShellRunner {
    async fn run(&self, command: &str, dir: &Path) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;

        debug!(command, dir = %dir.display(), "running task");
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(dir)
            .kill_on_drop(true)
            .output()
            .await
            .context("failed to spawn sh")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("`{command}` exited with {}: {}", output.status, stderr.trim());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_in_the_given_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("ws");

        ShellRunner.run("touch marker", &nested).await.unwrap();
        assert!(nested.join("marker").exists());
    }

    #[tokio::test]
    async fn non_zero_exit_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = ShellRunner
            .run("echo broken >&2; exit 3", dir.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}
