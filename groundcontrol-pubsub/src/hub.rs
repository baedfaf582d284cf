//! Listener registry and publish path.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::subscription::{Mailbox, Subscription};

/// Default number of undelivered payloads a subscription may hold.
pub const DEFAULT_CAPACITY: usize = 256;

/// Predicate deciding whether a listener wants a payload.
pub type Filter<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

struct Listener<T> {
    id: u64,
    filter: Option<Filter<T>>,
    mailbox: Arc<Mailbox<T>>,
}

impl<T> Listener<T> {
    fn accepts(&self, payload: &T) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(payload))
    }
}

pub(crate) struct Inner<K, T> {
    listeners: Mutex<HashMap<K, Vec<Listener<T>>>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl<K, T> Inner<K, T>
where
    K: Eq + Hash,
{
    pub(crate) fn remove(&self, topic: &K, id: u64) {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = listeners.get_mut(topic) {
            list.retain(|listener| listener.id != id);
            if list.is_empty() {
                listeners.remove(topic);
            }
        }
    }
}

impl<K, T> Drop for Inner<K, T> {
    fn drop(&mut self) {
        let listeners = self
            .listeners
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.values().flatten() {
            listener.mailbox.close();
        }
    }
}

/// A topic-keyed fan-out hub.
///
/// Cloning is cheap and every clone shares the same listeners. When the last
/// clone is dropped, open subscriptions drain what they hold and then end.
pub struct PubSub<K, T> {
    inner: Arc<Inner<K, T>>,
}

impl<K, T> Clone for PubSub<K, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, T> fmt::Debug for PubSub<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PubSub")
            .field("listeners", &"<Mutex<HashMap<K, Vec<Listener<T>>>>>")
            .field("capacity", &self.inner.capacity)
            .finish()
    }
}

impl<K, T> Default for PubSub<K, T>
where
    K: Eq + Hash + Clone + fmt::Debug,
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> PubSub<K, T>
where
    K: Eq + Hash + Clone + fmt::Debug,
    T: Clone,
{
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a hub whose subscriptions buffer at most `capacity` payloads.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                listeners: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Mailbox size of every subscription created by this hub.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Receive every payload published on `topic` from now on.
    pub fn subscribe(&self, topic: K) -> Subscription<K, T> {
        self.register(topic, None)
    }

    /// Receive payloads on `topic` for which `filter` returns true.
    pub fn subscribe_filtered<F>(&self, topic: K, filter: F) -> Subscription<K, T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.register(topic, Some(Box::new(filter)))
    }

    fn register(&self, topic: K, filter: Option<Filter<T>>) -> Subscription<K, T> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mailbox = Arc::new(Mailbox::new(id, self.inner.capacity));

        {
            let mut listeners = self
                .inner
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            listeners.entry(topic.clone()).or_default().push(Listener {
                id,
                filter,
                mailbox: Arc::clone(&mailbox),
            });
        }

        debug!(subscriber_id = id, topic = ?topic, "subscriber registered");
        Subscription::new(id, topic, mailbox, Arc::downgrade(&self.inner))
    }

    /// Deliver `payload` to every open listener on `topic` whose filter accepts it.
    ///
    /// Returns the number of listeners the payload was handed to.
    pub fn publish(&self, topic: &K, payload: T) -> usize {
        let mut listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(list) = listeners.get_mut(topic) else {
            return 0;
        };

        list.retain(|listener| !listener.mailbox.is_closed());

        let mut delivered = 0;
        for listener in list.iter().filter(|listener| listener.accepts(&payload)) {
            listener.mailbox.push(payload.clone());
            delivered += 1;
        }

        if list.is_empty() {
            listeners.remove(topic);
        }

        delivered
    }

    /// Number of open listeners on `topic`.
    pub fn listener_count(&self, topic: &K) -> usize {
        let listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.get(topic).map_or(0, |list| {
            list.iter()
                .filter(|listener| !listener.mailbox.is_closed())
                .count()
        })
    }
}
