//! Family bookkeeping consumed by the queue.

use queue_core::{FamilyHandle, FlushStatus, JobRef, JobStatus};

/// Per-family metadata the queue reads and updates while admitting jobs.
///
/// A registry usually outlives and spans many queues. The queue calls it with
/// its own lock held, so implementations must not call back into the queue.
pub trait Registry<P> {
    /// Whether the family is admitted serially.
    fn is_serial(&self, handle: FamilyHandle) -> bool;

    /// Called at enqueue time for jobs of serial families, in buffer order.
    fn on_job_added(&self, job: &JobRef<P>);

    fn flush_status(&self, handle: FamilyHandle) -> FlushStatus;

    /// Number of jobs of the family handed out and not yet completed.
    fn inflight_count(&self, handle: FamilyHandle) -> u32;

    fn increment_inflight(&self, handle: FamilyHandle);

    /// Number of jobs of the family parked `OnHold`.
    fn hold_count(&self, handle: FamilyHandle) -> u32;

    fn increment_hold(&self, handle: FamilyHandle);

    fn decrement_hold(&self, handle: FamilyHandle);

    /// Earliest still-queued job of the family.
    ///
    /// Must be `Some` whenever the family has a `Submitted` or `OnHold` job
    /// outstanding; the queue only asks in that case.
    fn first_job(&self, handle: FamilyHandle) -> Option<JobRef<P>>;

    /// If no job of the family is in flight, mark its earliest queued job
    /// `Ready` and count it in flight, as one step.
    ///
    /// Returns `None` when the family is busy or has nothing to admit. The
    /// provided version composes the calls above and is only atomic when a
    /// single queue uses the registry; registries shared between queues must
    /// override it.
    fn admit_first(&self, handle: FamilyHandle) -> Option<JobRef<P>> {
        if self.inflight_count(handle) > 0 {
            return None;
        }
        let Some(first) = self.first_job(handle) else {
            debug_assert!(false, "registry lost the backlog of {handle}");
            tracing::warn!("No queued job recorded for {}", handle);
            return None;
        };
        first.transition(JobStatus::Ready).ok()?;
        self.increment_inflight(handle);
        Some(first)
    }
}
