use serde::{Deserialize, Serialize};

use groundcontrol_relay::{to_id, NodeType};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
}

impl User {
    /// The single user of a local instance.
    pub fn local() -> Self {
        Self {
            id: to_id(NodeType::User, ["local"]),
            name: "Local User".to_owned(),
        }
    }
}
