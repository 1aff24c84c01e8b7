//! Registry of in-flight requests keyed by resource id.
//!
//! Concurrent callers asking for the same resource share one request: the
//! first caller runs it and the others wait for its result.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

pub struct InFlight<K, T> {
    pending: Arc<Mutex<HashMap<K, watch::Receiver<Option<T>>>>>,
}

impl<K, T> Default for InFlight<K, T> {
    fn default() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, T> Clone for InFlight<K, T> {
    fn clone(&self) -> Self {
        Self {
            pending: self.pending.clone(),
        }
    }
}

/// Removes the leader's entry even if its future is dropped mid-flight.
struct LeaderGuard<K: Eq + Hash, T> {
    pending: Arc<Mutex<HashMap<K, watch::Receiver<Option<T>>>>>,
    key: Option<K>,
}

impl<K: Eq + Hash, T> Drop for LeaderGuard<K, T> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&key);
        }
    }
}

enum Role<T> {
    Leader(watch::Sender<Option<T>>),
    Follower(watch::Receiver<Option<T>>),
}

impl<K, T> InFlight<K, T>
where
    K: Eq + Hash + Clone + Debug,
    T: Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.lock().contains_key(key)
    }

    /// Run `make()` for `key`, or join the run already in progress.
    ///
    /// Every caller receives a clone of the same result. If the running
    /// caller is cancelled before finishing, waiting callers start over.
    pub async fn run<F, Fut>(&self, key: K, make: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let tx = loop {
            match self.join_or_lead(&key) {
                Role::Leader(tx) => break tx,
                Role::Follower(mut rx) => {
                    tracing::debug!(key = ?key, "Joining in-flight request");
                    if let Ok(value) = rx.wait_for(Option::is_some).await {
                        if let Some(value) = value.as_ref() {
                            return value.clone();
                        }
                    }
                    tracing::debug!(key = ?key, "In-flight request abandoned, retrying");
                }
            }
        };

        // Declared after `tx` so the entry is gone before waiters see the channel close.
        let _guard = LeaderGuard {
            pending: self.pending.clone(),
            key: Some(key),
        };
        let value = make().await;
        tx.send_replace(Some(value.clone()));
        value
    }

    fn join_or_lead(&self, key: &K) -> Role<T> {
        let mut pending = self.lock();
        if let Some(rx) = pending.get(key) {
            return Role::Follower(rx.clone());
        }
        let (tx, rx) = watch::channel(None);
        pending.insert(key.clone(), rx);
        Role::Leader(tx)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, watch::Receiver<Option<T>>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
