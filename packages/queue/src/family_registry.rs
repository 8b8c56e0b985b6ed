//! In-memory family registry.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use queue_core::{AdmissionPolicy, FamilyHandle, FlushStatus, JobRef, JobStatus};

use crate::Registry;

/// Bookkeeping for one registered family.
struct FamilyEntry<P> {
    name: String,
    policy: AdmissionPolicy,
    flush: FlushStatus,
    inflight: u32,
    hold: u32,
    /// Serial jobs in enqueue order. Settled entries are dropped lazily.
    backlog: VecDeque<JobRef<P>>,
}

impl<P> FamilyEntry<P> {
    fn new(name: String, policy: AdmissionPolicy) -> Self {
        Self {
            name,
            policy,
            flush: FlushStatus::NoFlush,
            inflight: 0,
            hold: 0,
            backlog: VecDeque::new(),
        }
    }

    fn prune_backlog(&mut self) {
        while self
            .backlog
            .front()
            .is_some_and(|job| job.status().is_settled())
        {
            self.backlog.pop_front();
        }
    }
}

/// Thread-safe registry of job families.
///
/// One registry can be shared by any number of queues; a serial family keeps
/// a single ordered backlog across all of them.
pub struct FamilyRegistry<P> {
    families: RwLock<HashMap<FamilyHandle, FamilyEntry<P>>>,
    next_handle: AtomicU64,
}

impl<P> FamilyRegistry<P> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            families: RwLock::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<FamilyHandle, FamilyEntry<P>>> {
        self.families.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<FamilyHandle, FamilyEntry<P>>> {
        self.families.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to a family, logging calls for unknown handles.
    fn update(&self, handle: FamilyHandle, op: &str, f: impl FnOnce(&mut FamilyEntry<P>)) {
        match self.write().get_mut(&handle) {
            Some(entry) => f(entry),
            None => tracing::warn!("{} on unknown family {}", op, handle),
        }
    }

    /// Register a family and return its handle.
    pub fn register(&self, name: impl Into<String>, policy: AdmissionPolicy) -> FamilyHandle {
        let name = name.into();
        let handle = FamilyHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        tracing::info!("Registered {} family '{}' as {}", policy, name, handle);
        self.write().insert(handle, FamilyEntry::new(name, policy));
        handle
    }

    /// Remove a family. Returns false if it was not registered.
    pub fn unregister(&self, handle: FamilyHandle) -> bool {
        let removed = self.write().remove(&handle);
        if let Some(entry) = &removed {
            tracing::info!("Unregistered family '{}' ({})", entry.name, handle);
        }
        removed.is_some()
    }

    pub fn name(&self, handle: FamilyHandle) -> Option<String> {
        self.read().get(&handle).map(|entry| entry.name.clone())
    }

    pub fn policy(&self, handle: FamilyHandle) -> Option<AdmissionPolicy> {
        self.read().get(&handle).map(|entry| entry.policy)
    }

    /// Ask for the family's queued jobs to be stopped.
    ///
    /// Returns false unless the family was registered and not already
    /// flushing or flushed.
    pub fn request_flush(&self, handle: FamilyHandle) -> bool {
        let mut families = self.write();
        match families.get_mut(&handle) {
            Some(entry) if entry.flush == FlushStatus::NoFlush => {
                entry.flush = FlushStatus::FlushRequested;
                tracing::debug!("Flush requested for {}", handle);
                true
            }
            _ => false,
        }
    }

    /// Record that a requested flush has been carried out.
    pub fn mark_flushed(&self, handle: FamilyHandle) {
        self.update(handle, "mark_flushed", |entry| {
            if entry.flush == FlushStatus::FlushRequested {
                entry.flush = FlushStatus::Flushed;
            }
        });
    }

    /// Reopen a family for admission after a flush.
    pub fn clear_flush(&self, handle: FamilyHandle) {
        self.update(handle, "clear_flush", |entry| {
            entry.flush = FlushStatus::NoFlush;
        });
    }

    /// Report that a job handed out as `Ready` has finished.
    pub fn complete(&self, handle: FamilyHandle) {
        self.update(handle, "complete", |entry| {
            entry.inflight = entry.inflight.saturating_sub(1);
        });
    }

    /// Number of serial jobs still tracked for the family.
    pub fn backlog_len(&self, handle: FamilyHandle) -> usize {
        let mut families = self.write();
        match families.get_mut(&handle) {
            Some(entry) => {
                entry.prune_backlog();
                entry.backlog.iter().filter(|job| job.status().is_pending()).count()
            }
            None => 0,
        }
    }
}

impl<P> Default for FamilyRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Registry<P> for FamilyRegistry<P> {
    fn is_serial(&self, handle: FamilyHandle) -> bool {
        self.read()
            .get(&handle)
            .is_some_and(|entry| entry.policy.is_serial())
    }

    fn on_job_added(&self, job: &JobRef<P>) {
        let handle = job.handle();
        self.update(handle, "on_job_added", |entry| {
            entry.backlog.push_back(job.clone());
        });
    }

    fn flush_status(&self, handle: FamilyHandle) -> FlushStatus {
        self.read()
            .get(&handle)
            .map_or(FlushStatus::NoFlush, |entry| entry.flush)
    }

    fn inflight_count(&self, handle: FamilyHandle) -> u32 {
        self.read().get(&handle).map_or(0, |entry| entry.inflight)
    }

    fn increment_inflight(&self, handle: FamilyHandle) {
        self.update(handle, "increment_inflight", |entry| {
            entry.inflight = entry.inflight.saturating_add(1);
        });
    }

    fn hold_count(&self, handle: FamilyHandle) -> u32 {
        self.read().get(&handle).map_or(0, |entry| entry.hold)
    }

    fn increment_hold(&self, handle: FamilyHandle) {
        self.update(handle, "increment_hold", |entry| {
            entry.hold = entry.hold.saturating_add(1);
        });
    }

    fn decrement_hold(&self, handle: FamilyHandle) {
        self.update(handle, "decrement_hold", |entry| {
            entry.hold = entry.hold.saturating_sub(1);
        });
    }

    fn first_job(&self, handle: FamilyHandle) -> Option<JobRef<P>> {
        let mut families = self.write();
        let entry = families.get_mut(&handle)?;
        entry.prune_backlog();
        entry.backlog.front().cloned()
    }

    fn admit_first(&self, handle: FamilyHandle) -> Option<JobRef<P>> {
        let mut families = self.write();
        let entry = families.get_mut(&handle)?;
        if entry.inflight > 0 {
            return None;
        }
        // Settled entries fail the transition and are dropped.
        while let Some(front) = entry.backlog.front().cloned() {
            if front.transition(JobStatus::Ready).is_ok() {
                entry.inflight = entry.inflight.saturating_add(1);
                return Some(front);
            }
            entry.backlog.pop_front();
        }
        None
    }
}
