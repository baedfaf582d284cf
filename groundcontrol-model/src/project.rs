use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use groundcontrol_relay::{to_id, NodeType};

use crate::workspace::Workspace;

/// A repository branch tracked inside a workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub workspace_id: String,
    pub repository: String,
    pub branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether a checkout exists under the workspaces root.
    pub is_cloned: bool,
    pub is_cloning: bool,
    pub is_pulling: bool,
}

impl Project {
    pub fn new(
        workspace: &Workspace,
        repository: impl Into<String>,
        branch: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        let repository = repository.into();
        let branch = branch.into();
        Self {
            id: to_id(
                NodeType::Project,
                [workspace.slug.as_str(), repository.as_str(), branch.as_str()],
            ),
            workspace_id: workspace.id.clone(),
            repository,
            branch,
            description,
            is_cloned: false,
            is_cloning: false,
            is_pulling: false,
        }
    }

    /// `owner` and `name` taken from the last two segments of the repository URL.
    ///
    /// Both `https://host/owner/name.git` and `git@host:owner/name` forms are handled.
    pub fn repository_owner_and_name(&self) -> (&str, &str) {
        let trimmed = self.repository.trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
        let mut segments = trimmed.rsplit(|c| c == '/' || c == ':');
        let name = segments.next().unwrap_or(trimmed);
        let owner = segments.next().unwrap_or("");
        (owner, name)
    }

    /// Where the project is checked out: `<root>/<workspace slug>/<owner>/<name>`.
    pub fn local_path(&self, workspaces_root: &Path, workspace_slug: &str) -> PathBuf {
        let (owner, name) = self.repository_owner_and_name();
        let mut path = workspaces_root.join(workspace_slug);
        if !owner.is_empty() {
            path.push(owner);
        }
        path.push(name);
        path
    }
}
