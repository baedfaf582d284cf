//! Global node identifiers.
//!
//! An id is the base64 encoding of `TYPE:part:part...`. It is a transparent
//! encoding, not a capability token: anyone can decode it.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::IdError;

/// Separator between the type tag and the id segments.
///
/// Segments must not contain it, otherwise decoding splits them apart.
pub const DELIMITER: char = ':';

/// Entity kinds addressable by a global id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Workspace,
    Project,
    Job,
    User,
}

impl NodeType {
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Workspace => "WORKSPACE",
            Self::Project => "PROJECT",
            Self::Job => "JOB",
            Self::User => "USER",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WORKSPACE" => Ok(Self::Workspace),
            "PROJECT" => Ok(Self::Project),
            "JOB" => Ok(Self::Job),
            "USER" => Ok(Self::User),
            _ => Err(()),
        }
    }
}

/// Encode a node type and its segments into a global id.
pub fn to_id<I, S>(node_type: NodeType, parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut joined = String::from(node_type.as_str());
    for part in parts {
        joined.push(DELIMITER);
        joined.push_str(part.as_ref());
    }
    STANDARD.encode(joined.as_bytes())
}

/// Decode a global id back into its node type and segments.
pub fn from_id(id: &str) -> Result<(NodeType, Vec<String>), IdError> {
    let bytes = STANDARD
        .decode(id)
        .map_err(|_| IdError::malformed(id, "not valid base64"))?;
    let decoded =
        String::from_utf8(bytes).map_err(|_| IdError::malformed(id, "not valid UTF-8"))?;

    let mut segments = decoded.split(DELIMITER);
    let node_type = segments
        .next()
        .filter(|tag| !tag.is_empty())
        .ok_or_else(|| IdError::malformed(id, "missing type segment"))?
        .parse::<NodeType>()
        .map_err(|_| IdError::malformed(id, "unknown node type"))?;

    Ok((node_type, segments.map(str::to_owned).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_type_and_parts() {
        let cases: Vec<(NodeType, Vec<&str>)> = vec![
            (NodeType::Workspace, vec!["my-workspace"]),
            (
                NodeType::Project,
                vec!["my-workspace", "https//github.com/org/repo", "main"],
            ),
            (NodeType::Job, vec!["0"]),
            (NodeType::Job, vec!["42"]),
            (NodeType::User, vec![]),
            (NodeType::User, vec!["", "ünïcødé"]),
        ];

        for (node_type, parts) in cases {
            let id = to_id(node_type, &parts);
            let (decoded_type, decoded_parts) = from_id(&id).expect("decode");
            assert_eq!(decoded_type, node_type);
            assert_eq!(decoded_parts, parts);
        }
    }

    #[test]
    fn encodes_as_base64_of_joined_segments() {
        assert_eq!(to_id(NodeType::Job, ["7"]), STANDARD.encode("JOB:7"));
    }

    #[test]
    fn distinct_inputs_produce_distinct_ids() {
        assert_ne!(to_id(NodeType::Job, ["1"]), to_id(NodeType::Job, ["2"]));
        assert_ne!(to_id(NodeType::Job, ["1"]), to_id(NodeType::User, ["1"]));
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = from_id("%%% not base64 %%%").unwrap_err();
        assert!(matches!(err, IdError::Malformed { .. }));
    }

    #[test]
    fn rejects_unknown_type() {
        let id = STANDARD.encode("TEAPOT:1");
        assert!(from_id(&id).is_err());
    }

    #[test]
    fn rejects_empty_id() {
        assert!(from_id("").is_err());
    }

    #[test]
    fn delimiter_in_part_splits_on_decode() {
        let id = to_id(NodeType::Project, ["a:b"]);
        let (_, parts) = from_id(&id).unwrap();
        assert_eq!(parts, vec!["a", "b"]);
    }
}
