//! Task record types for `Tasklist`.
//!
//! Defines the persisted [`Task`] shape, the opaque [`TaskId`], and the text
//! normalization rules applied before a task is created. Field names follow
//! the stored JSON layout (`id`, `text`, `completed`, `createdAt`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum allowed task text length in characters, after trimming.
pub const MAX_TASK_TEXT_LENGTH: usize = 200;

/// Storage key under which the task collection is persisted.
pub const DEFAULT_STORAGE_KEY: &str = "todoApp_tasks";

/// Opaque task identifier.
///
/// Locally created ids are UUID v7 text, but ids read back from the store are
/// accepted verbatim so collections written by other clients still load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Creates a new time-ordered task identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wraps an existing identifier string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A single entry in the task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier, assigned at creation and never changed.
    pub id: TaskId,
    /// Trimmed, non-empty task text.
    pub text: String,
    /// Whether the task has been completed.
    pub completed: bool,
    /// Creation instant (UTC), stored as an RFC 3339 string.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Creates an open task. `text` is expected to be normalized already.
    #[must_use]
    pub const fn new(id: TaskId, text: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            text,
            completed: false,
            created_at,
        }
    }

    /// Returns a copy with `completed` flipped.
    #[must_use]
    pub fn toggled(&self) -> Self {
        Self {
            completed: !self.completed,
            ..self.clone()
        }
    }
}

/// Reasons a piece of task text is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    /// Text is empty or whitespace only.
    #[error("task text is empty")]
    Empty,
    /// Text exceeds the configured maximum after trimming.
    #[error("task text too long ({actual} characters, max {max})")]
    TooLong {
        /// Configured maximum.
        max: usize,
        /// Character count after trimming.
        actual: usize,
    },
}

/// Trims `raw` and checks it against the length rules.
///
/// Length is counted in characters, not bytes.
///
/// # Errors
///
/// Returns [`TextError::Empty`] if nothing remains after trimming, or
/// [`TextError::TooLong`] if the trimmed text exceeds `max_len` characters.
pub fn normalize_text(raw: &str, max_len: usize) -> Result<String, TextError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TextError::Empty);
    }
    let actual = trimmed.chars().count();
    if actual > max_len {
        return Err(TextError::TooLong {
            max: max_len,
            actual,
        });
    }
    Ok(trimmed.to_string())
}
