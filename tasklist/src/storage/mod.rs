//! Origin-scoped key-value storage for `Tasklist`.
//!
//! Defines the [`KeyValueStore`] trait that every backend satisfies.
//! Concrete implementations include:
//! - [`memory::MemoryStore`]: in-process origin shared by several contexts
//! - [`file::FileStore`]: one file per key in a data directory
//!
//! A store handle is one *context*. Writes made through a context notify
//! listeners registered through every other context of the same origin, but
//! never the writer itself.

pub mod file;
pub mod memory;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store cannot be used in this context.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The write would exceed the origin's storage quota.
    #[error("quota exceeded writing {key}: needs {needed} bytes, quota is {quota}")]
    QuotaExceeded {
        /// Key being written.
        key: String,
        /// Total bytes the origin would hold after the write.
        needed: usize,
        /// Configured quota in bytes.
        quota: usize,
    },

    /// Underlying file I/O failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        /// File that was being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The key cannot be represented by this backend.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),
}

/// A change committed to the store by another context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Key that changed.
    pub key: String,
    /// Value before the change, if any.
    pub old_value: Option<String>,
    /// Value after the change; `None` when the key was removed.
    pub new_value: Option<String>,
}

/// Callback invoked for each [`StorageEvent`].
pub type StorageListener = Arc<dyn Fn(&StorageEvent) + Send + Sync>;

/// Handle returned by [`KeyValueStore::listen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Identifies one context within an origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ContextId(u64);

/// Synchronous string store scoped to one origin.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write is rejected or fails.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be modified.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Registers a listener for changes made by other contexts.
    fn listen(&self, listener: StorageListener) -> ListenerId;

    /// Deregisters a listener. Returns `false` if it was not registered.
    fn unlisten(&self, id: ListenerId) -> bool;
}

/// Listener table shared by the contexts of one origin.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, ContextId, StorageListener)>>,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, context: ContextId, listener: StorageListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, context, listener));
        id
    }

    pub(crate) fn unregister(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(lid, _, _)| *lid != id);
        listeners.len() != before
    }

    /// Delivers `event` to every listener not owned by `origin_context`.
    ///
    /// Listeners are cloned out first so callbacks may re-enter the store.
    pub(crate) fn dispatch(&self, event: &StorageEvent, origin_context: Option<ContextId>) {
        let targets: Vec<StorageListener> = self
            .listeners
            .lock()
            .iter()
            .filter(|(_, ctx, _)| Some(*ctx) != origin_context)
            .map(|(_, _, listener)| Arc::clone(listener))
            .collect();
        for listener in targets {
            listener(event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.lock().len()
    }
}
