use async_trait::async_trait;
use resource_model::{JobHandle, JobStatus, RemoteMetadata, Resource, ResourceAddress, WarehouseBackend, WarehouseError};

/// Declared extension point: the same [`WarehouseBackend`] contract a
/// BigQuery-shaped client satisfies, stubbed out for Snowflake.
/// Implementation is left to whoever wires up that engine.
pub struct SnowflakeBackend {
    pub region: String,
}

impl SnowflakeBackend {
    pub fn new(region: impl Into<String>) -> Self {
        SnowflakeBackend { region: region.into() }
    }
}

#[async_trait]
impl WarehouseBackend for SnowflakeBackend {
    async fn region(&self) -> &str {
        &self.region
    }

    async fn metadata(&self, _address: &ResourceAddress) -> Result<RemoteMetadata, WarehouseError> {
        Err(WarehouseError::NotImplemented("snowflake.metadata"))
    }

    async fn job_status(&self, _job: &JobHandle) -> Result<JobStatus, WarehouseError> {
        Err(WarehouseError::NotImplemented("snowflake.job_status"))
    }

    async fn cancel_job(&self, _job: &JobHandle) -> Result<(), WarehouseError> {
        Err(WarehouseError::NotImplemented("snowflake.cancel_job"))
    }

    async fn submit_create(&self, _resource: &Resource) -> Result<JobHandle, WarehouseError> {
        Err(WarehouseError::NotImplemented("snowflake.submit_create"))
    }
}
