//! Submission and summary data structures.
//!
//! A `WeeklyTaskSubmission` is the ephemeral input to the tracker; a
//! `WeeklyTaskSummary` is the record that gets appended to the log once and is
//! never touched again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::fields::ActivityType;

/// Number of characters of the trimmed update kept in `input_excerpt`.
pub const EXCERPT_CHARS: usize = 240;

/// A free-text status update waiting to be turned into tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyTaskSubmission {
    pub project: Option<String>,
    pub context: Option<String>,
    #[serde(default)]
    pub activity_type: ActivityType,
    pub update: String,
}

impl WeeklyTaskSubmission {
    /// Build a validated submission. Blank project/context become `None`.
    pub fn new(
        project: Option<String>,
        context: Option<String>,
        activity_type: ActivityType,
        update: impl Into<String>,
    ) -> Result<Self> {
        let submission = WeeklyTaskSubmission {
            project: non_blank(project),
            context: non_blank(context),
            activity_type,
            update: update.into(),
        };
        submission.validate()?;
        Ok(submission)
    }

    /// Reject updates without any non-whitespace character.
    pub fn validate(&self) -> Result<()> {
        if self.update.trim().is_empty() {
            return Err(TrackerError::Validation("Update content must not be empty".into()));
        }
        Ok(())
    }
}

/// A processed update as persisted in the append-only log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyTaskSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub project: Option<String>,
    pub context: Option<String>,
    pub activity_type: ActivityType,
    pub input_excerpt: String,
    pub generated_tasks: Vec<String>,
    pub overlooked_tasks: Vec<String>,
}

/// First `EXCERPT_CHARS` characters of the trimmed update.
pub fn excerpt(update: &str) -> String {
    update.trim().chars().take(EXCERPT_CHARS).collect()
}

/// Trim an optional string and drop it when nothing is left.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
