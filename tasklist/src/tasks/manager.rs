//! Task state manager for validated task CRUD and change notification.
//!
//! `TaskStateManager` provides the application-layer interface for adding,
//! toggling, and deleting tasks. Every successful mutation is computed from
//! the current collection, written through the durable binding, then adopted
//! and published to watchers. Collections written by other contexts replace
//! the in-memory collection wholesale (last writer wins).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tasklist_proto::task::{MAX_TASK_TEXT_LENGTH, Task, TaskId, normalize_text};
use tokio::sync::mpsc;

use super::capabilities::{Clock, IdGenerator, SystemClock, UuidGenerator};
use super::{Operation, TaskError};
use crate::binding::{DurableBinding, Subscription};

/// Validation limits applied to new tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskLimits {
    /// Maximum task text length in characters, after trimming.
    pub max_text_len: usize,
}

impl Default for TaskLimits {
    fn default() -> Self {
        Self {
            max_text_len: MAX_TASK_TEXT_LENGTH,
        }
    }
}

/// Snapshot of everything a front end renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskState {
    /// Tasks in display (insertion) order.
    pub tasks: Vec<Task>,
    /// True while a mutation is in progress.
    pub loading: bool,
    /// User-facing message from the last failed operation, if any.
    pub error: Option<String>,
}

impl TaskState {
    /// Whether there are no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of tasks not yet completed.
    #[must_use]
    pub fn remaining_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.completed).count()
    }

    /// Number of completed tasks.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn find(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == *id)
    }
}

/// State shared with the external-change subscription.
struct Shared {
    state: Mutex<TaskState>,
    watchers: Mutex<Vec<mpsc::UnboundedSender<TaskState>>>,
    /// Count of collections adopted from other contexts. Only changed while
    /// `state` is locked.
    adopted: AtomicU64,
}

impl Shared {
    /// Applies `f` and publishes the result to every live watcher.
    ///
    /// Publishing happens under the state lock so watchers observe commits
    /// in the order they were applied.
    fn commit(&self, f: impl FnOnce(&mut TaskState)) -> TaskState {
        let mut state = self.state.lock();
        f(&mut state);
        self.publish(&state)
    }

    /// Replaces the collection with one written by another context.
    fn adopt_external(&self, tasks: Vec<Task>) {
        let mut state = self.state.lock();
        state.tasks = tasks;
        self.adopted.fetch_add(1, Ordering::SeqCst);
        self.publish(&state);
    }

    /// Adopts a locally computed collection and returns the adoption count
    /// at that moment.
    fn adopt_local(&self, tasks: Vec<Task>) -> u64 {
        let mut state = self.state.lock();
        state.tasks = tasks;
        state.error = None;
        state.loading = false;
        self.publish(&state);
        self.adopted.load(Ordering::SeqCst)
    }

    /// Brings memory back in line with the store after a write that raced
    /// with an external change.
    ///
    /// Does nothing unless a collection was adopted since `seen`. The store
    /// is read under the state lock; any event still pending for a newer
    /// value cannot have been dispatched yet and will be applied after.
    fn reconcile(&self, seen: u64, binding: &DurableBinding<Vec<Task>>) -> Option<TaskState> {
        let mut state = self.state.lock();
        if self.adopted.load(Ordering::SeqCst) == seen {
            return None;
        }
        let stored = binding.read(state.tasks.clone());
        if stored == state.tasks {
            return None;
        }
        tracing::debug!(count = stored.len(), "re-reading task list after concurrent write");
        state.tasks = stored;
        Some(self.publish(&state))
    }

    fn publish(&self, state: &TaskState) -> TaskState {
        let snapshot = state.clone();
        self.watchers
            .lock()
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
        snapshot
    }

    fn snapshot(&self) -> TaskState {
        self.state.lock().clone()
    }
}

/// Owns the task collection for one context.
///
/// Mutations take `&mut self`, so a single manager never interleaves two of
/// its own mutations. External changes may arrive on any thread.
pub struct TaskStateManager {
    shared: Arc<Shared>,
    binding: DurableBinding<Vec<Task>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    limits: TaskLimits,
    subscription: Subscription,
}

impl TaskStateManager {
    /// Loads the stored collection (or starts empty) and subscribes to
    /// external changes on the binding's key.
    ///
    /// Loading never writes to the store.
    #[must_use]
    pub fn new(binding: DurableBinding<Vec<Task>>) -> Self {
        if !binding.is_available() {
            tracing::warn!(key = %binding.key(), "no store attached, tasks will not persist");
        }
        let tasks = binding.read(Vec::new());
        tracing::debug!(key = %binding.key(), count = tasks.len(), "loaded task list");

        let shared = Arc::new(Shared {
            state: Mutex::new(TaskState {
                tasks,
                ..TaskState::default()
            }),
            watchers: Mutex::new(Vec::new()),
            adopted: AtomicU64::new(0),
        });

        let remote = Arc::clone(&shared);
        let subscription = binding.subscribe(move |tasks: Vec<Task>| {
            tracing::debug!(count = tasks.len(), "adopting task list from another context");
            remote.adopt_external(tasks);
        });

        Self {
            shared,
            binding,
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidGenerator),
            limits: TaskLimits::default(),
            subscription,
        }
    }

    /// Replaces the clock used to stamp new tasks.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the identifier source for new tasks.
    #[must_use]
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Replaces the validation limits.
    #[must_use]
    pub fn with_limits(mut self, limits: TaskLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> TaskState {
        self.shared.snapshot()
    }

    /// Returns a receiver of every committed state, starting with the
    /// current one.
    ///
    /// Dropping the receiver unregisters it on the next commit.
    #[must_use]
    pub fn watch(&self) -> mpsc::UnboundedReceiver<TaskState> {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = self.shared.state.lock();
        if tx.send(state.clone()).is_ok() {
            self.shared.watchers.lock().push(tx);
        }
        drop(state);
        rx
    }

    /// Whether the manager is still receiving external changes.
    #[must_use]
    pub const fn is_subscribed(&self) -> bool {
        self.subscription.is_active()
    }

    /// Adds a task with the given text.
    ///
    /// The text is trimmed first. Blank or over-long text sets
    /// [`TaskState::error`] and changes nothing else, including the store.
    pub fn add_task(&mut self, text: &str) -> TaskState {
        let text = match normalize_text(text, self.limits.max_text_len) {
            Ok(text) => text,
            Err(e) => return self.reject(Operation::Add, &TaskError::from(e)),
        };

        let clock = Arc::clone(&self.clock);
        let ids = Arc::clone(&self.ids);
        self.mutate(Operation::Add, move |tasks| {
            let task = Task::new(ids.next_id()?, text, clock.now());
            let mut next = Vec::with_capacity(tasks.len() + 1);
            next.extend_from_slice(tasks);
            next.push(task);
            Ok(next)
        })
    }

    /// Flips `completed` on the task with `id`.
    ///
    /// An unknown id leaves the collection unchanged. The collection is
    /// still written back.
    pub fn toggle_task(&mut self, id: &TaskId) -> TaskState {
        self.mutate(Operation::Toggle, |tasks| {
            Ok(tasks
                .iter()
                .map(|t| if t.id == *id { t.toggled() } else { t.clone() })
                .collect())
        })
    }

    /// Removes the task with `id`. An unknown id leaves the collection unchanged.
    pub fn delete_task(&mut self, id: &TaskId) -> TaskState {
        self.mutate(Operation::Delete, |tasks| {
            Ok(tasks.iter().filter(|t| t.id != *id).cloned().collect())
        })
    }

    /// Stops receiving external changes. Dropping the manager does the same.
    pub fn close(mut self) {
        self.subscription.unsubscribe();
    }

    /// Records a validation failure without touching the collection.
    fn reject(&self, op: Operation, err: &TaskError) -> TaskState {
        let message = err.user_message(op);
        self.shared.commit(|state| state.error = Some(message))
    }

    /// Runs one mutation: transform, adopt, write through.
    ///
    /// The new collection is adopted before it is written, so an external
    /// change delivered during the write is never overwritten by it. If one
    /// was delivered, the store decides which value stands. The state lock is
    /// released while the store is written, since the write may synchronously
    /// notify other contexts.
    fn mutate<F>(&mut self, op: Operation, transform: F) -> TaskState
    where
        F: FnOnce(&[Task]) -> Result<Vec<Task>, TaskError>,
    {
        let current = {
            let mut state = self.shared.state.lock();
            state.loading = true;
            state.tasks.clone()
        };

        match transform(&current) {
            Ok(next) => {
                let count = next.len();
                let seen = self.shared.adopt_local(next.clone());
                self.binding.write(&next);
                tracing::debug!(operation = %op, count, "task list committed");
                self.shared
                    .reconcile(seen, &self.binding)
                    .unwrap_or_else(|| self.shared.snapshot())
            }
            Err(err) => {
                if err.is_validation() {
                    tracing::debug!(operation = %op, error = %err, "task operation rejected");
                } else {
                    tracing::error!(operation = %op, error = %err, "task operation failed");
                }
                let message = err.user_message(op);
                self.shared.commit(|state| {
                    state.error = Some(message);
                    state.loading = false;
                })
            }
        }
    }
}
