//! Typed binding of one value to one store key.
//!
//! [`DurableBinding`] is the only component that touches a
//! [`KeyValueStore`] directly. It never returns an error: reads fall back to
//! a caller-supplied value, writes are best-effort, and every failure is
//! reported through `tracing` instead.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tasklist_proto::codec;

use crate::storage::{KeyValueStore, ListenerId, StorageEvent};

/// Reads, writes, and watches a single key of a [`KeyValueStore`].
///
/// A binding created with [`unavailable`](Self::unavailable) has no store at
/// all (for example a headless context); it reads as the fallback, drops
/// writes, and hands out inert subscriptions.
pub struct DurableBinding<T> {
    store: Option<Arc<dyn KeyValueStore>>,
    key: String,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for DurableBinding<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            key: self.key.clone(),
            _value: PhantomData,
        }
    }
}

impl<T> DurableBinding<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Binds `key` in `store`.
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store: Some(store),
            key: key.into(),
            _value: PhantomData,
        }
    }

    /// Binds `key` in a context that has no store.
    pub fn unavailable(key: impl Into<String>) -> Self {
        Self {
            store: None,
            key: key.into(),
            _value: PhantomData,
        }
    }

    /// The bound key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether a store is attached.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.store.is_some()
    }

    /// Returns the stored value, or `fallback` if it is absent or unusable.
    pub fn read(&self, fallback: T) -> T {
        let Some(store) = &self.store else {
            return fallback;
        };
        match store.get(&self.key) {
            Ok(Some(text)) => match codec::decode(&text) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(
                        key = %self.key,
                        error = %e,
                        "stored value is malformed, using fallback"
                    );
                    fallback
                }
            },
            Ok(None) => fallback,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "store read failed, using fallback");
                fallback
            }
        }
    }

    /// Serializes and stores `value`. Failures are logged and dropped.
    pub fn write(&self, value: &T) {
        let Some(store) = &self.store else {
            tracing::debug!(key = %self.key, "no store attached, write skipped");
            return;
        };
        let text = match codec::encode(value) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    key = %self.key,
                    error = %e,
                    "could not serialize value, write dropped"
                );
                return;
            }
        };
        if let Err(e) = store.set(&self.key, &text) {
            tracing::warn!(key = %self.key, error = %e, "store write failed, value not persisted");
        }
    }

    /// Calls `on_change` whenever another context stores a new value.
    ///
    /// Removals and values that fail to parse are not delivered. Keep the
    /// returned [`Subscription`] alive for as long as updates are wanted.
    pub fn subscribe<F>(&self, on_change: F) -> Subscription
    where
        T: 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let Some(store) = &self.store else {
            return Subscription::inert();
        };

        let key = self.key.clone();
        let id = store.listen(Arc::new(move |event: &StorageEvent| {
            if event.key != key {
                return;
            }
            let Some(text) = &event.new_value else {
                return;
            };
            match codec::decode::<T>(text) {
                Ok(value) => on_change(value),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "ignoring malformed external change");
                }
            }
        }));

        Subscription {
            registration: Some((Arc::clone(store), id)),
        }
    }
}

/// Live registration created by [`DurableBinding::subscribe`].
///
/// Dropping it deregisters the listener.
#[must_use = "dropping a Subscription immediately stops delivery"]
pub struct Subscription {
    registration: Option<(Arc<dyn KeyValueStore>, ListenerId)>,
}

impl Subscription {
    const fn inert() -> Self {
        Self { registration: None }
    }

    /// Whether this subscription is still registered with a store.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.registration.is_some()
    }

    /// Deregisters the listener. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if let Some((store, id)) = self.registration.take() {
            store.unlisten(id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
