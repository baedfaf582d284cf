use serde::{Deserialize, Serialize};

use groundcontrol_relay::{to_id, NodeType};

/// A named group of projects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub project_ids: Vec<String>,
}

impl Workspace {
    pub fn new(slug: impl Into<String>, name: impl Into<String>, description: Option<String>) -> Self {
        let slug = slug.into();
        Self {
            id: Self::id_for(&slug),
            slug,
            name: name.into(),
            description,
            project_ids: Vec::new(),
        }
    }

    #[inline]
    pub fn id_for(slug: &str) -> String {
        to_id(NodeType::Workspace, [slug])
    }
}
