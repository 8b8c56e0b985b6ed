//! Bounded, family-aware job admission queue.
//!
//! A [`JobQueue`] is a fixed-capacity ring of shared job references. Workers
//! poll it with [`JobQueue::check_and_dequeue`], which hands out at most one
//! job per call while keeping serial families in FIFO order with at most one
//! job in flight, and stopping the queued jobs of flushed families.
//!
//! Family bookkeeping lives behind the [`Registry`] trait and is passed in on
//! every call. [`FamilyRegistry`] is an in-memory implementation.
//!
//! # Usage
//!
//! ```ignore
//! use job_queue::{Dispatch, FamilyRegistry, JobQueue, JobQueueConfig};
//! use queue_core::{AdmissionPolicy, Job};
//!
//! let registry = FamilyRegistry::new();
//! let family = registry.register("decode", AdmissionPolicy::Serial);
//! let queue = JobQueue::new(JobQueueConfig::default())?;
//!
//! queue.enqueue(Job::new(family, payload).into_ref(), &registry);
//!
//! if let Dispatch::Ready(job) = queue.check_and_dequeue(&registry) {
//!     run(job.payload());
//!     registry.complete(job.handle());
//! }
//! ```

mod config;
mod error;
mod family_registry;
mod queue;
mod registry;
mod ring;

pub use config::JobQueueConfig;
pub use error::QueueError;
pub use family_registry::FamilyRegistry;
pub use queue::{Dispatch, JobQueue, QueueGuard, QueueSnapshot};
pub use registry::Registry;

/// Re-export core types for convenience.
pub use queue_core::{AdmissionPolicy, FamilyHandle, FlushStatus, Job, JobId, JobRef, JobStatus};
