//! Directory-backed durable store.
//!
//! Each key is kept in its own `<key>.json` file inside the data directory.
//! Writes land in a temporary sibling first and are renamed into place, so
//! a reader in another process sees either the old or the new value.
//!
//! Other processes cannot push notifications to this one. Instead the host
//! calls [`FileStore::poll_changes`] on its own schedule; every key whose
//! contents differ from what this handle last saw produces one
//! [`StorageEvent`] for the registered listeners.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use super::{
    ContextId, KeyValueStore, ListenerId, ListenerRegistry, StorageEvent, StorageListener,
    StoreError,
};

const FILE_EXTENSION: &str = "json";

/// Bytes escaped in file stems: everything except ASCII alphanumerics, `_` and `-`.
const KEY_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'-');

/// Durable store rooted at one directory.
pub struct FileStore {
    dir: PathBuf,
    listeners: ListenerRegistry,
    /// Last value this handle read, wrote, or reported per key.
    seen: Mutex<HashMap<String, Option<String>>>,
}

impl FileStore {
    /// Opens (creating if necessary) a store in `dir`.
    ///
    /// The current contents become the baseline for [`poll_changes`](Self::poll_changes).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created or listed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let store = Self {
            dir,
            listeners: ListenerRegistry::new(),
            seen: Mutex::new(HashMap::new()),
        };
        let baseline = store.read_all()?;
        *store.seen.lock() = baseline
            .into_iter()
            .map(|(key, value)| (key, Some(value)))
            .collect();
        tracing::debug!(dir = %store.dir.display(), "opened file store");
        Ok(store)
    }

    /// Directory this store writes to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Checks the directory for changes made by other processes.
    ///
    /// Returns the number of change events dispatched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be listed.
    pub fn poll_changes(&self) -> Result<usize, StoreError> {
        let current = self.read_all()?;

        let events: Vec<StorageEvent> = {
            let mut seen = self.seen.lock();
            let mut events = Vec::new();

            for (key, value) in &current {
                let previous = seen.get(key).cloned().flatten();
                if previous.as_deref() != Some(value.as_str()) {
                    events.push(StorageEvent {
                        key: key.clone(),
                        old_value: previous,
                        new_value: Some(value.clone()),
                    });
                    seen.insert(key.clone(), Some(value.clone()));
                }
            }

            for (key, previous) in seen.iter_mut() {
                if previous.is_some() && !current.contains_key(key) {
                    events.push(StorageEvent {
                        key: key.clone(),
                        old_value: previous.take(),
                        new_value: None,
                    });
                }
            }
            events
        };

        for event in &events {
            tracing::debug!(key = %event.key, "external change detected");
            self.listeners.dispatch(event, None);
        }
        Ok(events.len())
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self
            .dir
            .join(format!("{}.{FILE_EXTENSION}", encode_key(key))))
    }

    fn remember(&self, key: &str, value: Option<String>) {
        self.seen.lock().insert(key.to_string(), value);
    }

    /// Reads every stored key. Unreadable files are skipped with a warning.
    fn read_all(&self) -> Result<HashMap<String, String>, StoreError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut values = HashMap::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            let Some(key) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(decode_key)
            else {
                continue;
            };
            match std::fs::read_to_string(&path) {
                Ok(contents) => {
                    values.insert(key, contents);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "skipping unreadable store file"
                    );
                }
            }
        }
        Ok(values)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        let value = match std::fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        self.remember(key, value.clone());
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension(format!("{FILE_EXTENSION}.tmp"));
        std::fs::write(&tmp, value).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        self.remember(key, Some(value.to_string()));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(StoreError::Io { path, source }),
        }
        self.remember(key, None);
        Ok(())
    }

    fn listen(&self, listener: StorageListener) -> ListenerId {
        self.listeners.register(ContextId(0), listener)
    }

    fn unlisten(&self, id: ListenerId) -> bool {
        self.listeners.unregister(id)
    }
}

/// Maps a key onto a file-name-safe stem.
fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, KEY_ESCAPES).to_string()
}

/// Inverse of [`encode_key`]. Stems `encode_key` would not produce are
/// rejected, so every key has exactly one file.
fn decode_key(stem: &str) -> Option<String> {
    let key = percent_decode_str(stem).decode_utf8().ok()?.into_owned();
    (encode_key(&key) == stem).then_some(key)
}
