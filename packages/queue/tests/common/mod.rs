#![allow(dead_code)]

use job_queue::{FamilyRegistry, JobQueue};
use queue_core::{FamilyHandle, Job, JobRef};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

pub type Payload = Value;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

pub fn setup(capacity: usize) -> (JobQueue<Payload>, FamilyRegistry<Payload>) {
    init_tracing();
    let queue = JobQueue::with_capacity(capacity).expect("valid capacity");
    (queue, FamilyRegistry::new())
}

pub fn job(handle: FamilyHandle, seq: u64) -> JobRef<Payload> {
    Job::new(handle, json!({ "seq": seq }))
        .with_request_id(seq)
        .into_ref()
}

pub fn seq(job: &JobRef<Payload>) -> u64 {
    job.payload()["seq"].as_u64().expect("seq payload")
}
