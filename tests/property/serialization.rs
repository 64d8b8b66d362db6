//! Property-based tests for the stored task layout.
//!
//! Uses proptest to verify:
//! 1. Any task collection survives encode → decode.
//! 2. Arbitrary text never causes a panic in `decode` (returns `Err` gracefully).
//! 3. The stored JSON always uses the `createdAt` field name.
//! 4. `normalize_text` accepts exactly the trimmed, non-empty, short-enough inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use tasklist_proto::codec;
use tasklist_proto::task::{MAX_TASK_TEXT_LENGTH, Task, TaskId, TextError, normalize_text};

// --- Strategies ---

/// Strategy for generating arbitrary `TaskId` values.
fn arb_task_id() -> impl Strategy<Value = TaskId> {
    prop_oneof![
        any::<u128>().prop_map(|n| TaskId::from_string(uuid::Uuid::from_u128(n).to_string())),
        "[a-zA-Z0-9_-]{1,32}".prop_map(TaskId::from_string),
    ]
}

/// Strategy for timestamps between 1970 and 2100 with millisecond precision.
fn arb_created_at() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_102_444_800_000).prop_filter_map("timestamp in range", DateTime::from_timestamp_millis)
}

/// Strategy for generating arbitrary `Task` values.
fn arb_task() -> impl Strategy<Value = Task> {
    (arb_task_id(), "\\PC{1,200}", any::<bool>(), arb_created_at()).prop_map(
        |(id, text, completed, created_at)| Task {
            id,
            text,
            completed,
            created_at,
        },
    )
}

fn arb_task_list() -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec(arb_task(), 0..16)
}

// --- Property tests ---

proptest! {
    /// Any task collection survives an encode → decode round-trip, order included.
    #[test]
    fn task_list_round_trip(tasks in arb_task_list()) {
        let text = codec::encode(&tasks).expect("encode should succeed");
        let decoded: Vec<Task> = codec::decode(&text).expect("decode should succeed");
        prop_assert_eq!(tasks, decoded);
    }

    /// Arbitrary text never panics when decoded as a task list.
    #[test]
    fn random_text_decode_no_panic(text in "\\PC{0,256}") {
        let _ = codec::decode::<Vec<Task>>(&text);
    }

    /// Every stored task carries camelCase field names.
    #[test]
    fn stored_layout_uses_camel_case(task in arb_task()) {
        let text = codec::encode(&task).expect("encode should succeed");
        prop_assert!(text.contains("\"createdAt\":"));
        prop_assert!(!text.contains("\"created_at\":"));
    }

    /// Accepted text is the trimmed input and within the limit.
    #[test]
    fn normalize_text_trims_and_bounds(raw in "\\s{0,3}\\PC{0,250}\\s{0,3}") {
        match normalize_text(&raw, MAX_TASK_TEXT_LENGTH) {
            Ok(text) => {
                prop_assert_eq!(text.as_str(), raw.trim());
                prop_assert!(!text.is_empty());
                prop_assert!(text.chars().count() <= MAX_TASK_TEXT_LENGTH);
            }
            Err(TextError::Empty) => prop_assert!(raw.trim().is_empty()),
            Err(TextError::TooLong { max, actual }) => {
                prop_assert_eq!(max, MAX_TASK_TEXT_LENGTH);
                prop_assert_eq!(actual, raw.trim().chars().count());
                prop_assert!(actual > max);
            }
        }
    }

    /// Whitespace-only input is always rejected as empty.
    #[test]
    fn whitespace_only_is_empty(raw in "[ \\t\\n\\r]{0,40}") {
        prop_assert_eq!(normalize_text(&raw, MAX_TASK_TEXT_LENGTH), Err(TextError::Empty));
    }
}
