//! Property-based tests for task list invariants.
//!
//! Drives a `TaskStateManager` with random operation sequences and checks,
//! after every step:
//! 1. Task ids stay unique.
//! 2. The stored collection equals the in-memory collection.
//! 3. Every stored task has trimmed, non-empty text.
//! 4. Committed snapshots never report `loading`.
//! 5. Every successful toggle or delete leaves `error` unset.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use tasklist::binding::DurableBinding;
use tasklist::storage::memory::MemoryOrigin;
use tasklist::tasks::{ScriptedIds, TEXT_REQUIRED_MESSAGE, TaskStateManager};
use tasklist_proto::task::{Task, TaskId};

const KEY: &str = "todoApp_tasks";

#[derive(Debug, Clone)]
enum Op {
    Add(String),
    Toggle(usize),
    Delete(usize),
    ToggleUnknown,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => "[ a-z]{0,12}".prop_map(Op::Add),
        2 => (0usize..8).prop_map(Op::Toggle),
        1 => (0usize..8).prop_map(Op::Delete),
        1 => Just(Op::ToggleUnknown),
    ]
}

fn make_manager(origin: &MemoryOrigin) -> TaskStateManager {
    let binding = DurableBinding::new(Arc::new(origin.open_context()), KEY);
    TaskStateManager::new(binding).with_id_generator(Arc::new(ScriptedIds::sequential("id", 64)))
}

fn stored_tasks(origin: &MemoryOrigin) -> Vec<Task> {
    let binding: DurableBinding<Vec<Task>> =
        DurableBinding::new(Arc::new(origin.open_context()), KEY);
    binding.read(Vec::new())
}

proptest! {
    #[test]
    fn operation_sequences_preserve_invariants(ops in prop::collection::vec(arb_op(), 1..40)) {
        let origin = MemoryOrigin::new();
        let mut mgr = make_manager(&origin);

        for op in ops {
            let before = mgr.snapshot().tasks;
            let state = match &op {
                Op::Add(text) => mgr.add_task(text),
                Op::Toggle(_) | Op::Delete(_) if before.is_empty() => {
                    mgr.toggle_task(&TaskId::from("absent"))
                }
                Op::Toggle(i) => mgr.toggle_task(&before[i % before.len()].id),
                Op::Delete(i) => mgr.delete_task(&before[i % before.len()].id),
                Op::ToggleUnknown => mgr.toggle_task(&TaskId::from("absent")),
            };

            let ids: HashSet<&TaskId> = state.tasks.iter().map(|t| &t.id).collect();
            prop_assert_eq!(ids.len(), state.tasks.len());
            prop_assert!(!state.loading);
            prop_assert!(state.tasks.iter().all(|t| !t.text.is_empty() && t.text == t.text.trim()));

            match &op {
                Op::Add(text) if text.trim().is_empty() => {
                    prop_assert_eq!(state.error.as_deref(), Some(TEXT_REQUIRED_MESSAGE));
                    prop_assert_eq!(&state.tasks, &before);
                }
                Op::Add(_) => {
                    prop_assert_eq!(state.tasks.len(), before.len() + 1);
                    prop_assert_eq!(state.error, None);
                    prop_assert_eq!(stored_tasks(&origin), state.tasks.clone());
                }
                Op::ToggleUnknown => {
                    prop_assert_eq!(&state.tasks, &before);
                    prop_assert_eq!(state.error, None);
                }
                Op::Toggle(_) | Op::Delete(_) if before.is_empty() => {
                    prop_assert!(state.tasks.is_empty());
                    prop_assert_eq!(state.error, None);
                }
                Op::Toggle(i) => {
                    let target = &before[i % before.len()];
                    let after = state.find(&target.id).expect("toggled task still present");
                    prop_assert_eq!(after.completed, !target.completed);
                    prop_assert_eq!(state.tasks.len(), before.len());
                    prop_assert_eq!(&state.error, &None);
                    prop_assert_eq!(stored_tasks(&origin), state.tasks.clone());
                }
                Op::Delete(i) => {
                    let target = &before[i % before.len()];
                    prop_assert!(state.find(&target.id).is_none());
                    prop_assert_eq!(state.tasks.len(), before.len() - 1);
                    prop_assert_eq!(&state.error, &None);
                    prop_assert_eq!(stored_tasks(&origin), state.tasks.clone());
                }
            }
        }
    }

    /// Toggling the same task twice restores the original collection.
    #[test]
    fn double_toggle_is_identity(count in 1usize..6, pick in 0usize..6) {
        let origin = MemoryOrigin::new();
        let mut mgr = make_manager(&origin);
        for n in 0..count {
            mgr.add_task(&format!("task {n}"));
        }
        let before = mgr.snapshot().tasks;
        let id = before[pick % count].id.clone();

        mgr.toggle_task(&id);
        let state = mgr.toggle_task(&id);
        prop_assert_eq!(&state.tasks, &before);
        prop_assert_eq!(stored_tasks(&origin), before);
    }

    /// A second context always converges on the last committed collection.
    #[test]
    fn observer_context_converges(texts in prop::collection::vec("[a-z]{1,8}", 1..10)) {
        let origin = MemoryOrigin::new();
        let mut writer = make_manager(&origin);
        let observer = make_manager(&origin);

        for text in &texts {
            writer.add_task(text);
        }
        prop_assert_eq!(observer.snapshot().tasks, writer.snapshot().tasks);
    }
}
