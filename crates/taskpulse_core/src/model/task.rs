//! Task record.
//!
//! # Invariants
//! - `project_id` may name a project that no longer exists; consumers treat
//!   such tasks as having no project.
//! - Status changes go through the same update path as full edits.

use super::fields;
use super::project::Priority;
use super::RecordId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Completed flips back to pending; everything else completes.
    pub fn toggled(self) -> Self {
        match self {
            Self::Completed => Self::Pending,
            Self::Pending | Self::InProgress => Self::Completed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }
}

/// A unit of work, optionally owned by a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// `None` until the record is first saved.
    #[serde(default, deserialize_with = "fields::optional_id")]
    pub id: Option<RecordId>,
    /// Empty strings in persisted data read as `None`.
    #[serde(default, deserialize_with = "fields::optional_id")]
    pub project_id: Option<RecordId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "fields::optional_date")]
    pub start: Option<NaiveDate>,
    #[serde(default, deserialize_with = "fields::optional_date")]
    pub end: Option<NaiveDate>,
    #[serde(default, deserialize_with = "fields::lenient_enum")]
    pub priority: Priority,
    #[serde(default, deserialize_with = "fields::lenient_enum")]
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "fields::optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates an unsaved pending task with no project and no schedule.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            project_id: None,
            name: name.into(),
            description: String::new(),
            start: None,
            end: None,
            priority: Priority::default(),
            status: TaskStatus::default(),
            created_at: None,
        }
    }

    pub fn in_project(mut self, project_id: impl Into<RecordId>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_schedule(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Returns whether this task references the given project id.
    pub fn belongs_to(&self, project_id: &str) -> bool {
        self.project_id.as_deref() == Some(project_id)
    }
}
