//! Jobs, their status and the aggregate counters.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a job. Transitions only move forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    /// Returns true if this status represents a terminal state.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// `QUEUED -> FAILED` is taken by jobs that can no longer be run.
    pub const fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Queued, Self::Failed)
                | (Self::Running, Self::Done)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "QUEUED" => Ok(Self::Queued),
            "RUNNING" => Ok(Self::Running),
            "DONE" => Ok(Self::Done),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("unknown job status `{other}`")),
        }
    }
}

/// A tracked unit of background work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub name: String,
    /// Id of the entity the job acts on.
    pub owner_id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: impl Into<String>, name: impl Into<String>, owner_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            owner_id: owner_id.into(),
            status: JobStatus::Queued,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `status` and refresh `updated_at`.
    ///
    /// Returns false and leaves the job untouched if the transition is not legal.
    pub fn transition(&mut self, status: JobStatus) -> bool {
        if !self.status.can_transition_to(status) {
            return false;
        }
        self.status = status;
        let now = Utc::now();
        // Keep updated_at strictly after the previous stamp even on coarse clocks.
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + chrono::Duration::microseconds(1)
        };
        true
    }
}

/// Criteria used by job listings and job subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    /// Match any of these statuses. `None` matches all.
    pub statuses: Option<HashSet<JobStatus>>,
    pub owner_id: Option<String>,
}

impl JobFilter {
    pub fn with_statuses<I: IntoIterator<Item = JobStatus>>(mut self, statuses: I) -> Self {
        self.statuses = Some(statuses.into_iter().collect());
        self
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn matches(&self, job: &Job) -> bool {
        let status_ok = self
            .statuses
            .as_ref()
            .map_or(true, |statuses| statuses.contains(&job.status));
        let owner_ok = self
            .owner_id
            .as_deref()
            .map_or(true, |owner| owner == job.owner_id);
        status_ok && owner_ok
    }
}

/// Number of jobs currently in each status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobMetrics {
    pub queued: u64,
    pub running: u64,
    pub done: u64,
    pub failed: u64,
}

impl JobMetrics {
    fn slot(&mut self, status: JobStatus) -> &mut u64 {
        match status {
            JobStatus::Queued => &mut self.queued,
            JobStatus::Running => &mut self.running,
            JobStatus::Done => &mut self.done,
            JobStatus::Failed => &mut self.failed,
        }
    }

    /// Account for a newly created job.
    pub fn record_new(&mut self) {
        self.queued += 1;
    }

    /// Account for a job moving from `from` to `to`.
    pub fn record_transition(&mut self, from: JobStatus, to: JobStatus) {
        let slot = self.slot(from);
        *slot = slot.saturating_sub(1);
        *self.slot(to) += 1;
    }

    pub fn total(&self) -> u64 {
        self.queued + self.running + self.done + self.failed
    }
}
