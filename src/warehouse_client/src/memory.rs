use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use async_trait::async_trait;
use resource_model::{JobHandle, JobStatus, RemoteMetadata, Resource, ResourceAddress, WarehouseBackend, WarehouseError};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default)]
struct Entry {
    exists: bool,
    description_fingerprint: Option<String>,
    last_modified_ms: Option<i64>,
    running_job: Option<JobHandle>,
    pending_fingerprint: Option<String>,
    ticks_remaining: Option<u32>,
}

/// A deterministic, in-process stand-in for a real warehouse client.
/// `create()` leaves a job "running" for `ticks_to_complete` subsequent
/// `metadata()` polls before it reports success, which is enough to
/// exercise the executor's polling and retry logic without a network
/// call. Test fixture, not a production backend — see
/// [`crate::snowflake::SnowflakeBackend`] for the shape a real one takes.
pub struct InMemoryBackend {
    region: String,
    ticks_to_complete: u32,
    state: Mutex<HashMap<String, Entry>>,
    clock: AtomicI64,
    job_seq: AtomicU64,
}

impl InMemoryBackend {
    pub fn new(region: impl Into<String>, ticks_to_complete: u32) -> Self {
        InMemoryBackend {
            region: region.into(),
            ticks_to_complete,
            state: Mutex::new(HashMap::new()),
            clock: AtomicI64::new(0),
            job_seq: AtomicU64::new(0),
        }
    }

    fn next_ms(&self) -> i64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn next_job_id(&self) -> u64 {
        self.job_seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Seeds a resource as already existing with a given fingerprint, for
    /// tests that start from a warm warehouse state (e.g. S6).
    pub async fn seed_existing(&self, key: &str, fingerprint: &str, last_modified_ms: i64) {
        let mut state = self.state.lock().await;
        state.insert(
            key.to_string(),
            Entry {
                exists: true,
                description_fingerprint: Some(fingerprint.to_string()),
                last_modified_ms: Some(last_modified_ms),
                running_job: None,
                pending_fingerprint: None,
                ticks_remaining: None,
            },
        );
    }
}

#[async_trait]
impl WarehouseBackend for InMemoryBackend {
    async fn region(&self) -> &str {
        &self.region
    }

    async fn metadata(&self, address: &ResourceAddress) -> Result<RemoteMetadata, WarehouseError> {
        let mut state = self.state.lock().await;
        let entry = state.entry(address.key()).or_default();

        if let Some(ticks) = entry.ticks_remaining {
            if ticks > 0 {
                entry.ticks_remaining = Some(ticks - 1);
            } else {
                entry.exists = true;
                entry.description_fingerprint = entry.pending_fingerprint.take();
                entry.last_modified_ms = Some(self.next_ms());
                entry.running_job = None;
                entry.ticks_remaining = None;
                tracing::debug!(key = %address.key(), "resource transitioned to up to date");
            }
        }

        Ok(RemoteMetadata {
            exists: entry.exists,
            description_fingerprint: entry.description_fingerprint.clone(),
            last_modified_ms: entry.last_modified_ms,
            running_job: entry.running_job.clone(),
        })
    }

    async fn job_status(&self, job: &JobHandle) -> Result<JobStatus, WarehouseError> {
        let state = self.state.lock().await;
        for entry in state.values() {
            if entry.running_job.as_ref() == Some(job) {
                return Ok(match entry.ticks_remaining {
                    Some(t) if t > 0 => JobStatus::Running,
                    _ => JobStatus::Succeeded,
                });
            }
        }
        Ok(JobStatus::Succeeded)
    }

    async fn cancel_job(&self, job: &JobHandle) -> Result<(), WarehouseError> {
        let mut state = self.state.lock().await;
        for entry in state.values_mut() {
            if entry.running_job.as_ref() == Some(job) {
                entry.running_job = None;
                entry.ticks_remaining = None;
                entry.pending_fingerprint = None;
            }
        }
        Ok(())
    }

    async fn submit_create(&self, resource: &Resource) -> Result<JobHandle, WarehouseError> {
        let mut state = self.state.lock().await;
        let entry = state.entry(resource.key()).or_default();
        let job = JobHandle(format!("job-{}-{}", resource.key(), self.next_job_id()));
        entry.running_job = Some(job.clone());
        entry.pending_fingerprint = Some(resource.fingerprint());
        entry.ticks_remaining = Some(self.ticks_to_complete);
        tracing::debug!(key = %resource.key(), job = %job.0, "submitted create job");
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use resource_model::ResourceKind;

    fn table() -> Resource {
        Resource {
            address: ResourceAddress::new("proj", "ds", "t"),
            kind: ResourceKind::Table,
            bodies: vec!["select 1".to_string()],
            options: IndexMap::new(),
        }
    }

    #[tokio::test]
    async fn nonexistent_resource_reports_absent() {
        let backend = InMemoryBackend::new("US", 0);
        let meta = backend.metadata(&table().address).await.unwrap();
        assert!(!meta.exists);
    }

    #[tokio::test]
    async fn create_then_poll_completes_after_ticks() {
        let backend = InMemoryBackend::new("US", 1);
        let r = table();
        backend.submit_create(&r).await.unwrap();

        let first = backend.metadata(&r.address).await.unwrap();
        assert!(first.running_job.is_some());
        assert!(!first.exists);

        let second = backend.metadata(&r.address).await.unwrap();
        assert!(second.exists);
        assert!(second.running_job.is_none());
        assert_eq!(second.description_fingerprint, Some(r.fingerprint()));
    }

    #[tokio::test]
    async fn seeded_resource_is_up_to_date() {
        let backend = InMemoryBackend::new("US", 0);
        let r = table();
        backend.seed_existing(&r.key(), &r.fingerprint(), 100).await;
        assert!(!r.should_update(&backend).await.unwrap());
    }
}
