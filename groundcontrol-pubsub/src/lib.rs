//! In-process publish/subscribe hub.
//!
//! Listeners register on a topic, optionally with a predicate, and receive
//! every payload published on that topic after they subscribed. Nothing is
//! replayed.
//!
//! Each subscription owns a bounded mailbox. Publishing never blocks: when a
//! mailbox is full the oldest payload in it is discarded and the drop is
//! counted and logged.
//!
//! # Example
//!
//! ```rust
//! use groundcontrol_pubsub::PubSub;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let hub: PubSub<&'static str, u32> = PubSub::new();
//! let mut evens = hub.subscribe_filtered("numbers", |n: &u32| n % 2 == 0);
//!
//! for n in 1..=4 {
//!     hub.publish(&"numbers", n);
//! }
//!
//! assert_eq!(evens.recv().await, Some(2));
//! assert_eq!(evens.recv().await, Some(4));
//! # }
//! ```

mod hub;
mod subscription;

pub use hub::{Filter, PubSub, DEFAULT_CAPACITY};
pub use subscription::Subscription;
