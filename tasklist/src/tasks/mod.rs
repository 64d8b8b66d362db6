//! Task list state for `Tasklist`.
//!
//! Provides the [`TaskStateManager`], which owns the in-memory task
//! collection, validates and applies mutations, writes every committed
//! collection through a [`DurableBinding`](crate::binding::DurableBinding),
//! and adopts collections written by other contexts.

pub mod capabilities;
pub mod manager;

pub use capabilities::{
    Clock, FixedClock, IdError, IdGenerator, ScriptedIds, SystemClock, UuidGenerator,
};
pub use manager::{TaskLimits, TaskState, TaskStateManager};

use tasklist_proto::task::TextError;
use thiserror::Error;

/// Shown when a task is added with blank text.
pub const TEXT_REQUIRED_MESSAGE: &str = "Please enter task text";
/// Shown when adding a task fails unexpectedly.
pub const ADD_FAILED_MESSAGE: &str = "Failed to add task";
/// Shown when toggling a task fails unexpectedly.
pub const TOGGLE_FAILED_MESSAGE: &str = "Failed to update task";
/// Shown when deleting a task fails unexpectedly.
pub const DELETE_FAILED_MESSAGE: &str = "Failed to delete task";

/// Errors that can occur during task operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    /// Task text is empty after trimming.
    #[error("task text is required")]
    TextRequired,
    /// Task text exceeds the maximum length.
    #[error("task text too long ({actual} characters, max {max})")]
    TextTooLong {
        /// Configured maximum.
        max: usize,
        /// Character count after trimming.
        actual: usize,
    },
    /// No identifier could be produced for a new task.
    #[error("could not generate task id: {0}")]
    IdGeneration(#[from] IdError),
}

impl From<TextError> for TaskError {
    fn from(err: TextError) -> Self {
        match err {
            TextError::Empty => Self::TextRequired,
            TextError::TooLong { max, actual } => Self::TextTooLong { max, actual },
        }
    }
}

impl TaskError {
    /// Whether this is an expected input problem rather than a fault.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::TextRequired | Self::TextTooLong { .. })
    }

    /// Message to surface in [`TaskState::error`] for this failure of `op`.
    #[must_use]
    pub fn user_message(&self, op: Operation) -> String {
        match self {
            Self::TextRequired => TEXT_REQUIRED_MESSAGE.to_string(),
            Self::TextTooLong { max, .. } => {
                format!("Task text must be at most {max} characters")
            }
            Self::IdGeneration(_) => op.failure_message().to_string(),
        }
    }
}

/// The mutations a [`TaskStateManager`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Appending a new task.
    Add,
    /// Flipping a task's completion flag.
    Toggle,
    /// Removing a task.
    Delete,
}

impl Operation {
    /// Generic message for an unexpected failure of this operation.
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::Add => ADD_FAILED_MESSAGE,
            Self::Toggle => TOGGLE_FAILED_MESSAGE,
            Self::Delete => DELETE_FAILED_MESSAGE,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Toggle => write!(f, "toggle"),
            Self::Delete => write!(f, "delete"),
        }
    }
}
