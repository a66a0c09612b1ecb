//! Read-only access to the ETL execution metadata.
//!
//! # Architecture
//!
//! - [`CatalogSource`]: the orchestration catalog, queried for the most
//!   recent distinct `OnError` event.
//! - [`JobLogSource`]: the job table plus the warehouse and staging error
//!   tables, correlated by job id.
//! - [`SqlServer`]: one database target; every query opens its own
//!   connection and drops it before returning.
//! - [`SsisCatalog`], [`EtlJobLog`]: SQL Server implementations.
//! - [`MemorySource`]: in-memory implementation for tests and dry runs.

mod memory;
mod mssql;
pub mod queries;

pub use memory::MemorySource;
pub use mssql::{EtlJobLog, SqlServer, SsisCatalog};

use std::fmt;

use async_trait::async_trait;
use time::OffsetDateTime;

/// Key correlating one ETL execution across the error tables.
pub type JobId = i64;

// -------------------------------------------------------------------------
// Errors
// -------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] tiberius::error::Error),
    #[error("unexpected value in column `{column}`: {message}")]
    Decode {
        column: &'static str,
        message: String,
    },
    #[error("{0}")]
    Unavailable(String),
}

// -------------------------------------------------------------------------
// Records
// -------------------------------------------------------------------------

/// An `OnError` event from the orchestration catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogError {
    pub execution_id: i64,
    pub message_time: Option<OffsetDateTime>,
    pub message: String,
    pub package_name: String,
    pub project_name: String,
}

/// A row of `etl_erros_dw`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseError {
    pub job_id: JobId,
    pub transformation: String,
    pub description: String,
}

/// A row of `etl_erros_staging`, a field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingError {
    pub job_id: JobId,
    pub transformation: String,
    pub field: String,
    pub description: String,
}

/// Names a single lookup, for logs and the unavailable-source notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
    Catalog,
    LatestJob,
    Warehouse,
    Staging,
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog => write!(f, "SSISDB catalog"),
            Self::LatestJob => write!(f, "etl_job"),
            Self::Warehouse => write!(f, "etl_erros_dw"),
            Self::Staging => write!(f, "etl_erros_staging"),
        }
    }
}

// -------------------------------------------------------------------------
// Traits
// -------------------------------------------------------------------------

#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// The most recent distinct error event, or nothing when the catalog holds
    /// no `OnError` events.
    async fn latest_errors(&self) -> Result<Vec<CatalogError>, SourceError>;
}

#[async_trait]
pub trait JobLogSource: Send + Sync {
    /// Highest job id ever recorded; `None` when the job table is empty.
    async fn latest_job_id(&self) -> Result<Option<JobId>, SourceError>;

    async fn warehouse_errors(&self, job_id: JobId) -> Result<Vec<WarehouseError>, SourceError>;

    /// `Ok(None)` when no staging database is configured.
    async fn staging_errors(
        &self,
        job_id: JobId,
    ) -> Result<Option<Vec<StagingError>>, SourceError>;
}
