//! Seed the node registry from configuration.

use groundcontrol_config::WorkspaceConfig;
use groundcontrol_model::{NodeRegistry, Project, User, Workspace};

/// Register the local user and every configured workspace with its projects.
///
/// Returns the registered workspaces in configuration order.
pub fn register_workspaces(nodes: &NodeRegistry, workspaces: &[WorkspaceConfig]) -> Vec<Workspace> {
    nodes.store(User::local());

    workspaces
        .iter()
        .map(|ws_cfg| {
            let mut workspace =
                Workspace::new(&ws_cfg.slug, &ws_cfg.name, ws_cfg.description.clone());

            for project_cfg in &ws_cfg.projects {
                let project = Project::new(
                    &workspace,
                    &project_cfg.repository,
                    &project_cfg.branch,
                    project_cfg.description.clone(),
                );
                workspace.project_ids.push(project.id.clone());
                nodes.store(project);
            }

            nodes.store(workspace.clone());
            tracing::info!(
                workspace = %workspace.slug,
                projects = workspace.project_ids.len(),
                "workspace registered"
            );
            workspace
        })
        .collect()
}
