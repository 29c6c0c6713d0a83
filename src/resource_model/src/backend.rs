use async_trait::async_trait;
use thiserror::Error;

use crate::address::ResourceAddress;
use crate::resource::Resource;

/// Abstract kinds from the error taxonomy, not concrete type names —
/// each variant's retry policy is fixed by what it means, not by which
/// warehouse raised it.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// Optimistic-concurrency / generation mismatch on create. Retryable,
    /// consumes one retry-budget unit.
    #[error("precondition failed creating '{0}': {1}")]
    PreconditionFailed(String, String),

    /// Transport or 5xx-class failure. Retryable, same budget as
    /// `PreconditionFailed`.
    #[error("transient warehouse error for '{0}': {1}")]
    Transient(String, String),

    /// Auth, permission, invalid-SQL, schema-mismatch. Not retryable —
    /// surfaces and aborts the run.
    #[error("fatal warehouse error for '{0}': {1}")]
    Fatal(String, String),

    /// Declared extension point with no working implementation yet
    /// (e.g. the Snowflake engine stub).
    #[error("warehouse operation not implemented: {0}")]
    NotImplemented(&'static str),
}

impl WarehouseError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WarehouseError::PreconditionFailed(..) | WarehouseError::Transient(..)
        )
    }
}

/// Opaque handle to a submitted, in-flight warehouse job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed,
}

/// Warehouse-side facts about an address, fetched fresh each time a
/// resource's accessors need them.
#[derive(Debug, Clone, Default)]
pub struct RemoteMetadata {
    pub exists: bool,
    pub description_fingerprint: Option<String>,
    pub last_modified_ms: Option<i64>,
    pub running_job: Option<JobHandle>,
}

/// The warehouse SDK surface the resource model needs: submit query, get
/// job, cancel job, list datasets/tables, schema introspection. A
/// concrete warehouse client (BigQuery-shaped, Snowflake stub, or an
/// in-memory double for tests) implements this; the resource model never
/// depends on a specific warehouse crate.
#[async_trait]
pub trait WarehouseBackend: Send + Sync {
    async fn region(&self) -> &str;

    async fn metadata(&self, address: &ResourceAddress) -> Result<RemoteMetadata, WarehouseError>;

    async fn job_status(&self, job: &JobHandle) -> Result<JobStatus, WarehouseError>;

    async fn cancel_job(&self, job: &JobHandle) -> Result<(), WarehouseError>;

    /// Submits the warehouse operation that (re)materializes `resource`.
    /// Non-blocking with respect to job completion: returns once the job
    /// is accepted, not once it finishes.
    async fn submit_create(&self, resource: &Resource) -> Result<JobHandle, WarehouseError>;
}
