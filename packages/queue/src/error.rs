//! Queue construction errors.

/// Error type for queue setup.
///
/// Runtime outcomes such as a full buffer or nothing being eligible are
/// ordinary return values, not errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("capacity must be a power of two and at least 2, got {0}")]
    InvalidCapacity(usize),

    #[error("invalid config value for {key}: {value}")]
    InvalidConfig { key: &'static str, value: String },
}
