//! Job domain types for work items in the queue.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::FamilyHandle;

/// Job identifier. Ids sort by creation time and carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Ulid);

impl JobId {
    fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Moment the job was created, to the millisecond.
    pub fn created_at(self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.0.datetime())
    }
}

impl FromStr for JobId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Ulid>().map(Self)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Admission status of a job.
///
/// ```text
/// Submitted ──► Ready
///     │  └────► Stopped
///     ▼
///   OnHold ───► Ready | Stopped
/// ```
///
/// Any pending job (`Submitted` or `OnHold`) may also be invalidated when it
/// is removed from its queue. `Ready`, `Stopped` and `Invalid` are final as
/// far as the queue is concerned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum JobStatus {
    /// Added to a queue, not yet looked at.
    #[default]
    Submitted = 0,
    /// Selected for execution and handed to a worker.
    Ready = 1,
    /// Parked because an earlier job of its serial family is still in flight.
    OnHold = 2,
    /// Terminated by a flush of its family.
    Stopped = 3,
    /// Removed or otherwise unusable.
    Invalid = 4,
}

impl JobStatus {
    fn from_repr(value: u8) -> Self {
        match value {
            0 => JobStatus::Submitted,
            1 => JobStatus::Ready,
            2 => JobStatus::OnHold,
            3 => JobStatus::Stopped,
            _ => JobStatus::Invalid,
        }
    }

    /// Whether the job is still waiting for admission.
    pub fn is_pending(self) -> bool {
        matches!(self, JobStatus::Submitted | JobStatus::OnHold)
    }

    /// Whether the queue is done with the job and may retire its slot.
    pub fn is_settled(self) -> bool {
        !self.is_pending()
    }

    /// Check if the job will never run.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Stopped | JobStatus::Invalid)
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Submitted, Ready | OnHold | Stopped | Invalid) | (OnHold, Ready | Stopped | Invalid)
        )
    }

    /// Get a simple status string for display.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Submitted => "submitted",
            JobStatus::Ready => "ready",
            JobStatus::OnHold => "on_hold",
            JobStatus::Stopped => "stopped",
            JobStatus::Invalid => "invalid",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal job transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// Shared reference to a job.
///
/// Held by the queue slot and by whichever caller last received the job.
pub type JobRef<P> = Arc<Job<P>>;

/// A unit of work tagged with a family.
///
/// The payload is never interpreted by the queue.
pub struct Job<P> {
    id: JobId,
    handle: FamilyHandle,
    request_id: u64,
    status: AtomicU8,
    payload: P,
}

impl<P> Job<P> {
    /// Create a new submitted job.
    pub fn new(handle: FamilyHandle, payload: P) -> Self {
        Self {
            id: JobId::generate(),
            handle,
            request_id: 0,
            status: AtomicU8::new(JobStatus::Submitted as u8),
            payload,
        }
    }

    /// Set the caller's request id for this job.
    pub fn with_request_id(mut self, request_id: u64) -> Self {
        self.request_id = request_id;
        self
    }

    /// Wrap the job for sharing with a queue.
    pub fn into_ref(self) -> JobRef<P> {
        Arc::new(self)
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn handle(&self) -> FamilyHandle {
        self.handle
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.id.created_at()
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn status(&self) -> JobStatus {
        JobStatus::from_repr(self.status.load(Ordering::Acquire))
    }

    /// Move the job to `next`, returning the status it left.
    pub fn transition(&self, next: JobStatus) -> Result<JobStatus, InvalidTransition> {
        let mut current = self.status.load(Ordering::Acquire);
        loop {
            let from = JobStatus::from_repr(current);
            if !from.can_transition_to(next) {
                return Err(InvalidTransition { from, to: next });
            }
            match self.status.compare_exchange_weak(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(from),
                Err(actual) => current = actual,
            }
        }
    }

    /// Payload-free view of the job.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            handle: self.handle,
            request_id: self.request_id,
            status: self.status(),
            created_at: self.created_at(),
        }
    }
}

impl<P: std::fmt::Debug> std::fmt::Debug for Job<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .field("request_id", &self.request_id)
            .field("status", &self.status())
            .field("payload", &self.payload)
            .finish()
    }
}

/// Serializable view of a job, used for queue dumps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub handle: FamilyHandle,
    pub request_id: u64,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}
