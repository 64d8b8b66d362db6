//! Plain-text rendering of task state for the command line.

use std::fmt::Write as _;

use tasklist_proto::task::TaskId;

use crate::tasks::TaskState;

/// Shown in place of the list when there are no tasks.
pub const EMPTY_MESSAGE: &str = "No tasks yet. Add one above!";

/// Outcome of matching user input against task ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdMatch {
    /// Exactly one task matched.
    Found(TaskId),
    /// No task id starts with the input.
    NotFound,
    /// Several task ids start with the input.
    Ambiguous(usize),
}

/// Resolves `input` to a task id: an exact match wins, otherwise a unique
/// prefix.
#[must_use]
pub fn resolve_id(state: &TaskState, input: &str) -> IdMatch {
    let input = input.trim();
    if input.is_empty() {
        return IdMatch::NotFound;
    }
    if let Some(task) = state.tasks.iter().find(|t| t.id.as_str() == input) {
        return IdMatch::Found(task.id.clone());
    }

    let mut matches = state
        .tasks
        .iter()
        .filter(|t| t.id.as_str().starts_with(input));
    match (matches.next(), matches.count()) {
        (None, _) => IdMatch::NotFound,
        (Some(task), 0) => IdMatch::Found(task.id.clone()),
        (Some(_), rest) => IdMatch::Ambiguous(rest + 1),
    }
}

/// Renders the list, a summary line, and any pending error.
#[must_use]
pub fn render(state: &TaskState) -> String {
    let mut out = String::new();

    if let Some(error) = &state.error {
        let _ = writeln!(out, "error: {error}");
    }

    if state.is_empty() {
        if !state.loading {
            let _ = writeln!(out, "{EMPTY_MESSAGE}");
        }
        return out;
    }

    for task in &state.tasks {
        let mark = if task.completed { 'x' } else { ' ' };
        let _ = writeln!(
            out,
            "[{mark}] {}  {}  ({})",
            task.id,
            task.text,
            task.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    let _ = writeln!(
        out,
        "{} remaining, {} completed",
        state.remaining_count(),
        state.completed_count()
    );
    out
}
