//! Core domain types for the job admission queue.
//!
//! This crate contains shared types used across all packages:
//! - Job, JobStatus and the status state machine
//! - Family handles, admission policies and flush status

mod family;
mod job;

pub use family::{AdmissionPolicy, FamilyHandle, FlushStatus};
pub use job::{InvalidTransition, Job, JobId, JobRef, JobSnapshot, JobStatus};
