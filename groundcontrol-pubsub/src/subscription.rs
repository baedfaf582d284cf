//! Subscriber side of the hub.

use std::collections::VecDeque;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use futures::stream::{self, Stream};
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::hub::Inner;

/// Bounded queue shared between the hub and one subscription.
pub(crate) struct Mailbox<T> {
    subscriber_id: u64,
    queue: Mutex<VecDeque<T>>,
    notify: Notify,
    closed: AtomicBool,
    dropped: AtomicU64,
    capacity: usize,
}

impl<T> Mailbox<T> {
    pub(crate) fn new(subscriber_id: u64, capacity: usize) -> Self {
        Self {
            subscriber_id,
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
            capacity,
        }
    }

    pub(crate) fn push(&self, payload: T) {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        if queue.len() >= self.capacity {
            queue.pop_front();
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                subscriber_id = self.subscriber_id,
                dropped,
                "subscriber is falling behind, dropped oldest event"
            );
        }
        queue.push_back(payload);
        drop(queue);
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<T> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// A live registration on one topic.
///
/// Dropping the subscription (or calling [`Subscription::unsubscribe`])
/// removes it from the hub. Payloads already buffered are lost.
pub struct Subscription<K, T>
where
    K: Eq + Hash,
{
    id: u64,
    topic: K,
    mailbox: Arc<Mailbox<T>>,
    hub: Weak<Inner<K, T>>,
}

impl<K, T> fmt::Debug for Subscription<K, T>
where
    K: Eq + Hash + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("dropped", &self.dropped())
            .finish()
    }
}

impl<K, T> Subscription<K, T>
where
    K: Eq + Hash,
{
    pub(crate) fn new(id: u64, topic: K, mailbox: Arc<Mailbox<T>>, hub: Weak<Inner<K, T>>) -> Self {
        Self {
            id,
            topic,
            mailbox,
            hub,
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn topic(&self) -> &K {
        &self.topic
    }

    /// Payloads discarded because this subscriber fell behind.
    pub fn dropped(&self) -> u64 {
        self.mailbox.dropped.load(Ordering::Relaxed)
    }

    /// Wait for the next payload.
    ///
    /// Returns `None` once the hub has been dropped and the mailbox is drained.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            if let Some(payload) = self.mailbox.pop() {
                return Some(payload);
            }
            if self.mailbox.is_closed() {
                return None;
            }
            self.mailbox.notify.notified().await;
        }
    }

    /// Take the next buffered payload without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.mailbox.pop()
    }

    /// Stop receiving and unregister from the hub.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Turn the subscription into a stream that ends with the hub.
    pub fn into_stream(self) -> impl Stream<Item = T>
    where
        K: Send,
        T: Send,
    {
        stream::unfold(self, |mut sub| async move {
            let payload = sub.recv().await?;
            Some((payload, sub))
        })
    }
}

impl<K, T> Drop for Subscription<K, T>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        self.mailbox.close();
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(&self.topic, self.id);
        }
        debug!(subscriber_id = self.id, "subscriber removed");
    }
}
