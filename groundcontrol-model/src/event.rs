//! Events published on the hub.

use std::fmt;

use serde::{Deserialize, Serialize};

use groundcontrol_pubsub::PubSub;

use crate::job::{Job, JobFilter, JobMetrics};
use crate::project::Project;
use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Topic {
    JobUpserted,
    JobMetricsUpdated,
    ProjectUpdated,
    WorkspaceUpdated,
}

impl Topic {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JobUpserted => "JOB_UPSERTED",
            Self::JobMetricsUpdated => "JOB_METRICS_UPDATED",
            Self::ProjectUpdated => "PROJECT_UPDATED",
            Self::WorkspaceUpdated => "WORKSPACE_UPDATED",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "topic", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    JobUpserted(Job),
    JobMetricsUpdated(JobMetrics),
    ProjectUpdated(Project),
    WorkspaceUpdated(Workspace),
}

impl Event {
    pub const fn topic(&self) -> Topic {
        match self {
            Self::JobUpserted(_) => Topic::JobUpserted,
            Self::JobMetricsUpdated(_) => Topic::JobMetricsUpdated,
            Self::ProjectUpdated(_) => Topic::ProjectUpdated,
            Self::WorkspaceUpdated(_) => Topic::WorkspaceUpdated,
        }
    }

    /// Id of the entity carried by the event, if it carries one.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Self::JobUpserted(job) => Some(&job.id),
            Self::ProjectUpdated(project) => Some(&project.id),
            Self::WorkspaceUpdated(workspace) => Some(&workspace.id),
            Self::JobMetricsUpdated(_) => None,
        }
    }

    pub fn as_job(&self) -> Option<&Job> {
        match self {
            Self::JobUpserted(job) => Some(job),
            _ => None,
        }
    }
}

/// The hub every component publishes on.
pub type Hub = PubSub<Topic, Event>;

/// Publish `event` on its own topic.
#[inline]
pub fn publish(hub: &Hub, event: Event) -> usize {
    let topic = event.topic();
    hub.publish(&topic, event)
}

/// Keep only events about the node with `id`.
pub fn node_filter(id: impl Into<String>) -> impl Fn(&Event) -> bool + Send + Sync + 'static {
    let id = id.into();
    move |event| event.node_id() == Some(id.as_str())
}

impl JobFilter {
    /// Turn the filter into a hub predicate over job events.
    pub fn into_event_filter(self) -> impl Fn(&Event) -> bool + Send + Sync + 'static {
        move |event| event.as_job().is_some_and(|job| self.matches(job))
    }
}
