//! Relay-compatible building blocks shared by every Ground Control crate.
//!
//! Two concerns live here:
//!
//! - [`to_id`] / [`from_id`] mint and resolve global, type-tagged node ids.
//! - [`paginate`] windows an ordered collection into a [`Connection`] using
//!   item ids as cursors, so that cursors stay valid while the collection grows.
//!
//! # Example
//!
//! ```rust
//! use groundcontrol_relay::{from_id, paginate, to_id, ConnectionArgs, NodeType};
//!
//! let ids: Vec<String> = (0..5).map(|n| to_id(NodeType::Job, [n.to_string()])).collect();
//! let (node_type, parts) = from_id(&ids[3]).unwrap();
//! assert_eq!(node_type, NodeType::Job);
//! assert_eq!(parts, vec!["3".to_string()]);
//!
//! let page = paginate(&ids, &ConnectionArgs::default().first(2), |id| id.as_str()).unwrap();
//! assert_eq!(page.edges.len(), 2);
//! assert!(page.page_info.has_next_page);
//! ```

mod connection;
mod error;
mod id;

pub use connection::{paginate, Connection, ConnectionArgs, Edge, PageInfo};
pub use error::{IdError, PaginationError};
pub use id::{from_id, to_id, NodeType, DELIMITER};
