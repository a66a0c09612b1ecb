use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    CatalogError, CatalogSource, JobId, JobLogSource, Lookup, SourceError, StagingError,
    WarehouseError,
};

/// In-memory implementation of both source traits for development and
/// testing.
///
/// Rows are filtered by job id exactly as the SQL queries do. Individual
/// lookups can be made to fail, and every lookup performed is recorded.
#[derive(Clone, Default)]
pub struct MemorySource {
    catalog: Vec<CatalogError>,
    latest_job: Option<JobId>,
    warehouse: Vec<WarehouseError>,
    staging: Option<Vec<StagingError>>,
    failing: HashSet<Lookup>,
    lookups: Arc<Mutex<Vec<Lookup>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog_errors(mut self, errors: Vec<CatalogError>) -> Self {
        self.catalog = errors;
        self
    }

    pub fn with_latest_job(mut self, job_id: JobId) -> Self {
        self.latest_job = Some(job_id);
        self
    }

    pub fn with_warehouse_errors(mut self, errors: Vec<WarehouseError>) -> Self {
        self.warehouse = errors;
        self
    }

    /// Configures a staging database; without this call staging lookups
    /// report it as not configured.
    pub fn with_staging_errors(mut self, errors: Vec<StagingError>) -> Self {
        self.staging = Some(errors);
        self
    }

    /// Make a lookup fail with [`SourceError::Unavailable`].
    pub fn failing(mut self, lookup: Lookup) -> Self {
        self.failing.insert(lookup);
        self
    }

    /// Lookups performed so far, in order.
    pub async fn lookups(&self) -> Vec<Lookup> {
        self.lookups.lock().await.clone()
    }

    async fn record(&self, lookup: Lookup) -> Result<(), SourceError> {
        self.lookups.lock().await.push(lookup);
        if self.failing.contains(&lookup) {
            return Err(SourceError::Unavailable(format!("{lookup} is unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogSource for MemorySource {
    async fn latest_errors(&self) -> Result<Vec<CatalogError>, SourceError> {
        self.record(Lookup::Catalog).await?;
        Ok(self
            .catalog
            .iter()
            .max_by_key(|e| e.execution_id)
            .cloned()
            .into_iter()
            .collect())
    }
}

#[async_trait]
impl JobLogSource for MemorySource {
    async fn latest_job_id(&self) -> Result<Option<JobId>, SourceError> {
        self.record(Lookup::LatestJob).await?;
        Ok(self.latest_job)
    }

    async fn warehouse_errors(&self, job_id: JobId) -> Result<Vec<WarehouseError>, SourceError> {
        self.record(Lookup::Warehouse).await?;
        Ok(self
            .warehouse
            .iter()
            .filter(|e| e.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn staging_errors(
        &self,
        job_id: JobId,
    ) -> Result<Option<Vec<StagingError>>, SourceError> {
        let Some(staging) = &self.staging else {
            return Ok(None);
        };
        self.record(Lookup::Staging).await?;
        Ok(Some(
            staging
                .iter()
                .filter(|e| e.job_id == job_id)
                .cloned()
                .collect(),
        ))
    }
}
