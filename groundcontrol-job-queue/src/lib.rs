//! Bounded-concurrency job queue.
//!
//! [`JobManager`] keeps the log of every job submitted during the life of the
//! process (newest first), runs their work with at most `concurrency` jobs in
//! flight, and publishes each status change on the event hub.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use groundcontrol_job_queue::JobManager;
//! use groundcontrol_model::{Hub, JobFilter, NodeRegistry};
//! use groundcontrol_relay::ConnectionArgs;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = JobManager::new(Arc::new(NodeRegistry::new()), Hub::new(), 2);
//!
//!     let shutdown = CancellationToken::new();
//!     let worker = manager.clone();
//!     let token = shutdown.clone();
//!     tokio::spawn(async move { worker.work(token).await });
//!
//!     let job = manager.submit("Say hello", "owner-id", || async {
//!         println!("hello");
//!         Ok(())
//!     });
//!     println!("queued {}", job.id);
//!
//!     let page = manager
//!         .find(&JobFilter::default(), &ConnectionArgs::default().first(10))
//!         .unwrap();
//!     println!("{} jobs", page.edges.len());
//!
//!     shutdown.cancel();
//! }
//! ```

mod error;
mod manager;

pub use error::JobQueueError;
pub use manager::{JobManager, DEFAULT_CONCURRENCY};
