//! Job family types.

use serde::{Deserialize, Serialize};

/// Opaque identifier grouping jobs into a family.
///
/// Jobs of the same family share an admission policy and flush state,
/// e.g. "same pipeline stage, same session".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FamilyHandle(pub u64);

impl FamilyHandle {
    /// Raw handle value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for FamilyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "family-{}", self.0)
    }
}

/// How jobs of one family are admitted relative to each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPolicy {
    /// Strict FIFO, at most one job in flight at a time.
    Serial,
    /// Unordered, any number of jobs in flight.
    #[default]
    Parallel,
}

impl AdmissionPolicy {
    pub fn is_serial(self) -> bool {
        matches!(self, AdmissionPolicy::Serial)
    }
}

impl std::fmt::Display for AdmissionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionPolicy::Serial => write!(f, "serial"),
            AdmissionPolicy::Parallel => write!(f, "parallel"),
        }
    }
}

/// Cancellation state of a family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushStatus {
    /// Default state.
    #[default]
    NoFlush,
    /// A flush was requested; queued jobs are stopped instead of admitted.
    FlushRequested,
    /// The flush request has been fulfilled.
    Flushed,
}

impl FlushStatus {
    pub fn is_requested(self) -> bool {
        matches!(self, FlushStatus::FlushRequested)
    }
}

impl std::fmt::Display for FlushStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlushStatus::NoFlush => write!(f, "no_flush"),
            FlushStatus::FlushRequested => write!(f, "flush_requested"),
            FlushStatus::Flushed => write!(f, "flushed"),
        }
    }
}
