//! In-process storage origin.
//!
//! A [`MemoryOrigin`] holds the key-value data and listener table for one
//! origin. Each call to [`MemoryOrigin::open_context`] yields a
//! [`MemoryStore`] handle that behaves like one tab: writes through it are
//! announced to listeners of every other handle, never to its own.
//!
//! ```rust
//! use tasklist::storage::KeyValueStore;
//! use tasklist::storage::memory::MemoryOrigin;
//!
//! let origin = MemoryOrigin::new();
//! let tab_a = origin.open_context();
//! let tab_b = origin.open_context();
//! tab_a.set("greeting", "hello").unwrap();
//! assert_eq!(tab_b.get("greeting").unwrap().as_deref(), Some("hello"));
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, ReentrantMutex};

use super::{
    ContextId, KeyValueStore, ListenerId, ListenerRegistry, StorageEvent, StorageListener,
    StoreError,
};

/// Default per-origin quota, matching common browser local storage limits.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

struct OriginInner {
    data: Mutex<HashMap<String, String>>,
    /// Held from a write until its event is delivered, so listeners see
    /// changes in commit order. Reentrant so a listener may write.
    commit: ReentrantMutex<()>,
    listeners: ListenerRegistry,
    quota: usize,
    next_context: AtomicU64,
}

/// Shared backing data for a set of [`MemoryStore`] contexts.
#[derive(Clone)]
pub struct MemoryOrigin {
    inner: Arc<OriginInner>,
}

impl Default for MemoryOrigin {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryOrigin {
    /// Creates an empty origin with the default quota.
    #[must_use]
    pub fn new() -> Self {
        Self::with_quota(DEFAULT_QUOTA_BYTES)
    }

    /// Creates an empty origin holding at most `quota` bytes of keys and values.
    #[must_use]
    pub fn with_quota(quota: usize) -> Self {
        Self {
            inner: Arc::new(OriginInner {
                data: Mutex::new(HashMap::new()),
                commit: ReentrantMutex::new(()),
                listeners: ListenerRegistry::new(),
                quota,
                next_context: AtomicU64::new(0),
            }),
        }
    }

    /// Opens a new context onto this origin.
    #[must_use]
    pub fn open_context(&self) -> MemoryStore {
        let id = ContextId(self.inner.next_context.fetch_add(1, Ordering::Relaxed));
        MemoryStore {
            origin: Arc::clone(&self.inner),
            context: id,
        }
    }

    /// Number of listeners currently registered across all contexts.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    #[cfg(test)]
    fn used_bytes(&self) -> usize {
        usage(&self.inner.data.lock())
    }
}

fn usage(data: &HashMap<String, String>) -> usize {
    data.iter().map(|(k, v)| k.len() + v.len()).sum()
}

/// One context onto a [`MemoryOrigin`].
pub struct MemoryStore {
    origin: Arc<OriginInner>,
    context: ContextId,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.origin.data.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _commit = self.origin.commit.lock();
        let old_value = {
            let mut data = self.origin.data.lock();
            let current = data.get(key).map_or(0, |v| key.len() + v.len());
            let needed = usage(&data) - current + key.len() + value.len();
            if needed > self.origin.quota {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota: self.origin.quota,
                });
            }
            data.insert(key.to_string(), value.to_string())
        };

        let event = StorageEvent {
            key: key.to_string(),
            old_value,
            new_value: Some(value.to_string()),
        };
        self.origin.listeners.dispatch(&event, Some(self.context));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _commit = self.origin.commit.lock();
        let old_value = self.origin.data.lock().remove(key);
        if old_value.is_some() {
            let event = StorageEvent {
                key: key.to_string(),
                old_value,
                new_value: None,
            };
            self.origin.listeners.dispatch(&event, Some(self.context));
        }
        Ok(())
    }

    fn listen(&self, listener: StorageListener) -> ListenerId {
        self.origin.listeners.register(self.context, listener)
    }

    fn unlisten(&self, id: ListenerId) -> bool {
        self.origin.listeners.unregister(id)
    }
}
