//! Domain model shared by the queue, the job implementations and the API.
//!
//! # Contents
//!
//! - [`Workspace`], [`Project`], [`User`] and [`Job`] entities
//! - [`Node`], the sum of every addressable entity, and [`NodeRegistry`]
//! - [`Event`] and [`Topic`], the payloads carried by the [`Hub`]

mod event;
mod job;
mod node;
mod project;
mod user;
mod workspace;

pub use event::{node_filter, publish, Event, Hub, Topic};
pub use job::{Job, JobFilter, JobMetrics, JobStatus};
pub use node::{Node, NodeRegistry};
pub use project::Project;
pub use user::User;
pub use workspace::Workspace;

pub use groundcontrol_relay::{from_id, to_id, NodeType};
