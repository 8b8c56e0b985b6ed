//! The admission queue.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use queue_core::{FamilyHandle, JobRef, JobSnapshot, JobStatus};
use serde::{Deserialize, Serialize};

use crate::ring::Ring;
use crate::{JobQueueConfig, QueueError, Registry};

/// Outcome of one [`JobQueue::check_and_dequeue`] call.
#[derive(Debug)]
pub enum Dispatch<P> {
    /// The job was admitted and should be executed.
    Ready(JobRef<P>),
    /// The job's family was flushed; the job must not run.
    Stopped(JobRef<P>),
    /// Nothing eligible right now, or the queue is empty.
    Idle,
}

impl<P> Dispatch<P> {
    /// Status reported for this outcome. `Idle` reports `Invalid`.
    pub fn status(&self) -> JobStatus {
        match self {
            Dispatch::Ready(_) => JobStatus::Ready,
            Dispatch::Stopped(_) => JobStatus::Stopped,
            Dispatch::Idle => JobStatus::Invalid,
        }
    }

    pub fn job(&self) -> Option<&JobRef<P>> {
        match self {
            Dispatch::Ready(job) | Dispatch::Stopped(job) => Some(job),
            Dispatch::Idle => None,
        }
    }

    pub fn into_job(self) -> Option<JobRef<P>> {
        match self {
            Dispatch::Ready(job) | Dispatch::Stopped(job) => Some(job),
            Dispatch::Idle => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Dispatch::Idle)
    }
}

/// Serializable view of a queue's contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub name: String,
    pub capacity: usize,
    pub head: usize,
    pub tail: usize,
    pub len: usize,
    pub jobs: Vec<JobSnapshot>,
}

/// Bounded, family-aware job queue.
///
/// Every operation takes the queue's single mutex for its whole duration and
/// never blocks beyond that. Use [`JobQueue::lock`] to run several operations
/// atomically.
pub struct JobQueue<P> {
    name: String,
    ring: Mutex<Ring<P>>,
}

impl<P> JobQueue<P> {
    /// Create a queue from a validated configuration.
    pub fn new(config: JobQueueConfig) -> Result<Self, QueueError> {
        config.validate()?;
        tracing::info!(
            "Creating job queue '{}' with {} slots",
            config.name,
            config.capacity
        );
        Ok(Self {
            name: config.name,
            ring: Mutex::new(Ring::with_capacity(config.capacity)),
        })
    }

    /// Create a default-named queue with the given number of slots.
    pub fn with_capacity(capacity: usize) -> Result<Self, QueueError> {
        Self::new(JobQueueConfig::default().with_capacity(capacity))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Acquire the queue lock for a multi-step operation.
    ///
    /// The guard exposes the same operations as the queue. Calling methods on
    /// the queue itself while holding the guard deadlocks.
    pub fn lock(&self) -> QueueGuard<'_, P> {
        QueueGuard {
            name: &self.name,
            ring: self.ring.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lock().is_full()
    }

    /// Add a submitted job. Returns false if the queue is full.
    pub fn enqueue<R>(&self, job: JobRef<P>, registry: &R) -> bool
    where
        R: Registry<P> + ?Sized,
    {
        self.lock().enqueue(job, registry)
    }

    /// Cheap hint that the job at the head is still unexamined.
    pub fn has_jobs(&self) -> bool {
        self.lock().has_jobs()
    }

    /// Select at most one job for a worker.
    pub fn check_and_dequeue<R>(&self, registry: &R) -> Dispatch<P>
    where
        R: Registry<P> + ?Sized,
    {
        self.lock().check_and_dequeue(registry)
    }

    /// Jobs of a family that are still `Submitted`.
    pub fn posted_jobs(&self, handle: FamilyHandle) -> Vec<JobRef<P>> {
        self.lock().posted_jobs(handle)
    }

    /// Invalidate every pending job matching `predicate`.
    pub fn remove_where<R, F>(&self, registry: &R, predicate: F) -> usize
    where
        R: Registry<P> + ?Sized,
        F: FnMut(&JobRef<P>) -> bool,
    {
        self.lock().remove_where(registry, predicate)
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        self.lock().snapshot()
    }

    /// Log the queue contents at debug level.
    pub fn dump(&self) {
        self.lock().dump()
    }
}

/// Scoped hold on a [`JobQueue`]'s lock. Released on drop.
pub struct QueueGuard<'a, P> {
    name: &'a str,
    ring: MutexGuard<'a, Ring<P>>,
}

impl<P> QueueGuard<'_, P> {
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Number of occupied slots, including settled jobs not yet retired.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    pub fn enqueue<R>(&mut self, job: JobRef<P>, registry: &R) -> bool
    where
        R: Registry<P> + ?Sized,
    {
        if job.status() != JobStatus::Submitted {
            tracing::warn!(
                "Queue '{}' refused job {} in state {}",
                self.name,
                job.id(),
                job.status()
            );
            return false;
        }
        if self.ring.is_full() {
            tracing::debug!("Queue '{}' is full, rejecting job {}", self.name, job.id());
            return false;
        }

        if registry.is_serial(job.handle()) {
            registry.on_job_added(&job);
        }
        self.ring.push(job).is_ok()
    }

    pub fn has_jobs(&self) -> bool {
        self.ring
            .front()
            .is_some_and(|job| job.status() == JobStatus::Submitted)
    }

    pub fn check_and_dequeue<R>(&mut self, registry: &R) -> Dispatch<P>
    where
        R: Registry<P> + ?Sized,
    {
        if self.ring.is_empty() {
            return Dispatch::Idle;
        }

        let head = self.ring.head();
        let mut cursor = head;
        let mut selected = None;
        while cursor != self.ring.tail() {
            if let Some(job) = self.ring.slot(cursor).cloned()
                && let Some(pick) = admit(&job, registry)
            {
                selected = Some(pick);
                break;
            }
            cursor = self.ring.next(cursor);
        }

        if let Some(pick) = &selected
            && self
                .ring
                .slot(head)
                .is_some_and(|front| Arc::ptr_eq(front, pick.job()))
        {
            self.ring.retire_head();
        }
        self.retire_settled();

        match selected {
            Some(Pick::Admitted(job)) => {
                tracing::debug!(
                    "Queue '{}' admitted job {} of {}",
                    self.name,
                    job.id(),
                    job.handle()
                );
                Dispatch::Ready(job)
            }
            Some(Pick::Ready(job)) => {
                registry.increment_inflight(job.handle());
                tracing::debug!(
                    "Queue '{}' admitted job {} of {}",
                    self.name,
                    job.id(),
                    job.handle()
                );
                Dispatch::Ready(job)
            }
            Some(Pick::Stopped(job)) => {
                tracing::debug!(
                    "Queue '{}' stopped job {} of flushed {}",
                    self.name,
                    job.id(),
                    job.handle()
                );
                Dispatch::Stopped(job)
            }
            None => Dispatch::Idle,
        }
    }

    pub fn posted_jobs(&self, handle: FamilyHandle) -> Vec<JobRef<P>> {
        self.ring
            .iter()
            .filter(|job| job.handle() == handle && job.status() == JobStatus::Submitted)
            .cloned()
            .collect()
    }

    pub fn remove_where<R, F>(&mut self, registry: &R, mut predicate: F) -> usize
    where
        R: Registry<P> + ?Sized,
        F: FnMut(&JobRef<P>) -> bool,
    {
        let mut removed = 0;
        for job in self.ring.iter() {
            if !job.status().is_pending() || !predicate(job) {
                continue;
            }
            if let Ok(previous) = job.transition(JobStatus::Invalid) {
                if previous == JobStatus::OnHold {
                    registry.decrement_hold(job.handle());
                }
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!("Queue '{}' removed {} jobs", self.name, removed);
        }
        self.retire_settled();
        removed
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            name: self.name.to_string(),
            capacity: self.ring.capacity(),
            head: self.ring.head(),
            tail: self.ring.tail(),
            len: self.ring.len(),
            jobs: self.ring.iter().map(|job| job.snapshot()).collect(),
        }
    }

    pub fn dump(&self) {
        match serde_json::to_string(&self.snapshot()) {
            Ok(json) => tracing::debug!("Queue '{}' contents: {}", self.name, json),
            Err(e) => tracing::warn!("Failed to serialize queue '{}': {}", self.name, e),
        }
    }

    /// Advance the head past jobs that were already handed out or terminated.
    fn retire_settled(&mut self) {
        let mut retired = 0;
        while self
            .ring
            .front()
            .is_some_and(|job| job.status().is_settled())
        {
            self.ring.retire_head();
            retired += 1;
        }
        if retired > 0 {
            tracing::trace!("Queue '{}' retired {} slots", self.name, retired);
        }
    }
}

/// Job chosen by one visit of the scan.
enum Pick<P> {
    /// Serial admission; the registry already counted it in flight.
    Admitted(JobRef<P>),
    /// Parallel admission; still to be counted in flight.
    Ready(JobRef<P>),
    Stopped(JobRef<P>),
}

impl<P> Pick<P> {
    fn job(&self) -> &JobRef<P> {
        match self {
            Pick::Admitted(job) | Pick::Ready(job) | Pick::Stopped(job) => job,
        }
    }
}

/// Apply the admission rules to one visited job.
///
/// For serial families the pick may be an earlier job of the same family
/// than the one visited.
fn admit<P, R>(job: &JobRef<P>, registry: &R) -> Option<Pick<P>>
where
    R: Registry<P> + ?Sized,
{
    let family = job.handle();
    match job.status() {
        JobStatus::Submitted => {
            if registry.flush_status(family).is_requested() {
                return settle(job, JobStatus::Stopped).map(Pick::Stopped);
            }
            if !registry.is_serial(family) {
                return settle(job, JobStatus::Ready).map(Pick::Ready);
            }
            if let Some(first) = registry.admit_first(family) {
                if !Arc::ptr_eq(&first, job) {
                    registry.decrement_hold(family);
                }
                return Some(Pick::Admitted(first));
            }
            if job.transition(JobStatus::OnHold).is_ok() {
                registry.increment_hold(family);
                tracing::trace!("Job {} held behind in-flight work of {}", job.id(), family);
            }
            None
        }
        JobStatus::OnHold => {
            if registry.flush_status(family).is_requested() {
                return settle(job, JobStatus::Stopped).map(Pick::Stopped);
            }
            let first = registry.admit_first(family)?;
            registry.decrement_hold(family);
            Some(Pick::Admitted(first))
        }
        JobStatus::Ready | JobStatus::Stopped | JobStatus::Invalid => None,
    }
}

fn settle<P>(job: &JobRef<P>, status: JobStatus) -> Option<JobRef<P>> {
    match job.transition(status) {
        Ok(_) => Some(job.clone()),
        Err(e) => {
            tracing::debug!("Job {} changed during scan: {}", job.id(), e);
            None
        }
    }
}
