//! Queue configuration.

use serde::{Deserialize, Serialize};

use crate::QueueError;

/// Default number of ring slots.
pub const DEFAULT_CAPACITY: usize = 64;

/// Configuration for a [`JobQueue`](crate::JobQueue).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobQueueConfig {
    /// Name used in logs and snapshots.
    pub name: String,
    /// Number of ring slots. Must be a power of two; one slot is always kept
    /// free, so at most `capacity - 1` jobs are queued at once.
    pub capacity: usize,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            name: "job-queue".to_string(),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl JobQueueConfig {
    /// Set the queue name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the number of ring slots.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), QueueError> {
        if self.capacity < 2 || !self.capacity.is_power_of_two() {
            return Err(QueueError::InvalidCapacity(self.capacity));
        }
        Ok(())
    }

    /// Build a config from environment variables.
    ///
    /// - `JOB_QUEUE_NAME` (default: `job-queue`)
    /// - `JOB_QUEUE_CAPACITY` (default: `64`, must be a power of two)
    pub fn from_env() -> Result<Self, QueueError> {
        let mut config = Self::default();

        if let Ok(name) = std::env::var("JOB_QUEUE_NAME")
            && !name.trim().is_empty()
        {
            config.name = name.trim().to_string();
        }

        if let Ok(raw) = std::env::var("JOB_QUEUE_CAPACITY") {
            config.capacity = raw.trim().parse().map_err(|_| QueueError::InvalidConfig {
                key: "JOB_QUEUE_CAPACITY",
                value: raw.clone(),
            })?;
        }

        config.validate()?;
        Ok(config)
    }
}
