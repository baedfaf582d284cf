//! Lookup of any entity by its global id.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::job::Job;
use crate::project::Project;
use crate::user::User;
use crate::workspace::Workspace;

/// Every entity addressable through a global id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Node {
    Workspace(Workspace),
    Project(Project),
    Job(Job),
    User(User),
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Self::Workspace(w) => &w.id,
            Self::Project(p) => &p.id,
            Self::Job(j) => &j.id,
            Self::User(u) => &u.id,
        }
    }
}

impl From<Workspace> for Node {
    fn from(value: Workspace) -> Self {
        Self::Workspace(value)
    }
}

impl From<Project> for Node {
    fn from(value: Project) -> Self {
        Self::Project(value)
    }
}

impl From<Job> for Node {
    fn from(value: Job) -> Self {
        Self::Job(value)
    }
}

impl From<User> for Node {
    fn from(value: User) -> Self {
        Self::User(value)
    }
}

/// Process-wide id to entity map.
///
/// Entries hold snapshots: whoever mutates an entity stores the new version
/// with [`NodeRegistry::set`].
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: RwLock<HashMap<String, Node>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a node. Absence is a normal outcome.
    pub fn get(&self, id: &str) -> Option<Node> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Insert or replace the node stored under `id`.
    pub fn set(&self, id: impl Into<String>, node: impl Into<Node>) {
        self.nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.into(), node.into());
    }

    /// Store `node` under its own id.
    pub fn store(&self, node: impl Into<Node>) {
        let node = node.into();
        self.set(node.id().to_owned(), node);
    }

    pub fn workspace(&self, id: &str) -> Option<Workspace> {
        match self.get(id)? {
            Node::Workspace(workspace) => Some(workspace),
            _ => None,
        }
    }

    pub fn project(&self, id: &str) -> Option<Project> {
        match self.get(id)? {
            Node::Project(project) => Some(project),
            _ => None,
        }
    }

    /// Every registered workspace, ordered by slug.
    pub fn workspaces(&self) -> Vec<Workspace> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        let mut workspaces: Vec<Workspace> = nodes
            .values()
            .filter_map(|node| match node {
                Node::Workspace(workspace) => Some(workspace.clone()),
                _ => None,
            })
            .collect();
        workspaces.sort_by(|a, b| a.slug.cmp(&b.slug));
        workspaces
    }

    pub fn len(&self) -> usize {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
