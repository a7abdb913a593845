//! Project record.
//!
//! # Invariants
//! - `end >= start` is assumed but never validated.
//! - Deleting a project cascades to every task referencing its id.

use super::fields;
use super::RecordId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Priority shared by projects and tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Display rank, `High` first.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// A tracked project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// `None` until the record is first saved.
    #[serde(default, deserialize_with = "fields::optional_id")]
    pub id: Option<RecordId>,
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
    /// Assigned once, on first save.
    #[serde(default, deserialize_with = "fields::optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Project {
    /// Creates an unsaved project with medium priority and no schedule.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
            start: None,
            end: None,
            priority: Priority::default(),
            created_at: None,
        }
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

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Returns whether this project carries the given id.
    pub fn has_id(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }
}
