//! SQL Server implementations over `tiberius`.

use async_trait::async_trait;
use time::{OffsetDateTime, PrimitiveDateTime};
use tiberius::{AuthMethod, Client, Config, Row, ToSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::{
    queries, CatalogError, CatalogSource, JobId, JobLogSource, SourceError, StagingError,
    WarehouseError,
};
use crate::config::{DbConfig, Settings};

/// One SQL Server database.
///
/// Holds only connection parameters: each [`fetch`](Self::fetch) opens a
/// fresh connection and releases it on every exit path.
#[derive(Debug, Clone)]
pub struct SqlServer {
    config: DbConfig,
}

impl SqlServer {
    pub fn new(config: DbConfig) -> Self {
        Self { config }
    }

    /// `host:port/database`, for logs.
    pub fn target(&self) -> String {
        format!(
            "{}:{}/{}",
            self.config.host, self.config.port, self.config.database
        )
    }

    fn client_config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.config.host);
        config.port(self.config.port);
        config.database(&self.config.database);
        config.authentication(AuthMethod::sql_server(
            &self.config.username,
            &self.config.password,
        ));
        // ODBC Driver 17 does not validate the server certificate by default
        config.trust_cert();
        config
    }

    async fn connect(&self) -> Result<Client<Compat<TcpStream>>, SourceError> {
        let config = self.client_config();
        let tcp = TcpStream::connect(config.get_addr()).await?;
        tcp.set_nodelay(true)?;
        Ok(Client::connect(config, tcp.compat_write()).await?)
    }

    /// Run a query and collect its first result set.
    pub async fn fetch(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, SourceError> {
        let mut client = self.connect().await?;
        tracing::trace!(db = %self.target(), "executing query");

        let rows = client.query(sql, params).await?.into_first_result().await?;

        if let Err(e) = client.close().await {
            tracing::debug!(db = %self.target(), error = %e, "error closing connection");
        }
        Ok(rows)
    }
}

/// The orchestration catalog (`SSISDB`) on the warehouse server.
#[derive(Debug, Clone)]
pub struct SsisCatalog {
    db: SqlServer,
}

impl SsisCatalog {
    pub fn new(config: DbConfig) -> Self {
        Self {
            db: SqlServer::new(config),
        }
    }
}

#[async_trait]
impl CatalogSource for SsisCatalog {
    async fn latest_errors(&self) -> Result<Vec<CatalogError>, SourceError> {
        let rows = self.db.fetch(queries::LATEST_CATALOG_ERROR, &[]).await?;
        rows.iter().map(catalog_error).collect()
    }
}

/// `etl_job` and `etl_erros_dw` on the warehouse, `etl_erros_staging` on the
/// staging database.
#[derive(Debug, Clone)]
pub struct EtlJobLog {
    warehouse: SqlServer,
    staging: Option<SqlServer>,
}

impl EtlJobLog {
    pub fn new(warehouse: DbConfig, staging: Option<DbConfig>) -> Self {
        Self {
            warehouse: SqlServer::new(warehouse),
            staging: staging.map(SqlServer::new),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.warehouse.clone(), settings.staging.clone())
    }
}

#[async_trait]
impl JobLogSource for EtlJobLog {
    async fn latest_job_id(&self) -> Result<Option<JobId>, SourceError> {
        let rows = self.warehouse.fetch(queries::LATEST_JOB_ID, &[]).await?;
        match rows.first() {
            Some(row) => int_column(row, "jobid"),
            None => Ok(None),
        }
    }

    async fn warehouse_errors(&self, job_id: JobId) -> Result<Vec<WarehouseError>, SourceError> {
        let rows = self
            .warehouse
            .fetch(queries::WAREHOUSE_ERRORS, &[&job_id])
            .await?;
        rows.iter().map(warehouse_error).collect()
    }

    async fn staging_errors(
        &self,
        job_id: JobId,
    ) -> Result<Option<Vec<StagingError>>, SourceError> {
        let Some(staging) = &self.staging else {
            return Ok(None);
        };
        let rows = staging.fetch(queries::STAGING_ERRORS, &[&job_id]).await?;
        rows.iter()
            .map(staging_error)
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

// -------------------------------------------------------------------------
// Row decoding
// -------------------------------------------------------------------------

fn catalog_error(row: &Row) -> Result<CatalogError, SourceError> {
    Ok(CatalogError {
        execution_id: required_id(row, "Execution_Id")?,
        message_time: timestamp_column(row, "DataHora")?,
        message: text_column(row, "MensagemErro")?,
        package_name: text_column(row, "Package_Name")?,
        project_name: text_column(row, "Project_Name")?,
    })
}

fn warehouse_error(row: &Row) -> Result<WarehouseError, SourceError> {
    Ok(WarehouseError {
        job_id: required_id(row, "jobid")?,
        transformation: text_column(row, "Transformacao")?,
        description: text_column(row, "Descricao")?,
    })
}

fn staging_error(row: &Row) -> Result<StagingError, SourceError> {
    Ok(StagingError {
        job_id: required_id(row, "jobid")?,
        transformation: text_column(row, "Transformacao")?,
        field: text_column(row, "Campo")?,
        description: text_column(row, "Descricao")?,
    })
}

/// Integer of any width; the job tables do not agree on `int` vs `bigint`.
fn int_column(row: &Row, column: &'static str) -> Result<Option<i64>, SourceError> {
    if let Ok(value) = row.try_get::<i64, _>(column) {
        return Ok(value);
    }
    if let Ok(value) = row.try_get::<i32, _>(column) {
        return Ok(value.map(i64::from));
    }
    if let Ok(value) = row.try_get::<i16, _>(column) {
        return Ok(value.map(i64::from));
    }
    if let Ok(value) = row.try_get::<u8, _>(column) {
        return Ok(value.map(i64::from));
    }
    Err(SourceError::Decode {
        column,
        message: "expected an integer".to_string(),
    })
}

fn required_id(row: &Row, column: &'static str) -> Result<i64, SourceError> {
    int_column(row, column)?.ok_or_else(|| SourceError::Decode {
        column,
        message: "unexpected NULL".to_string(),
    })
}

/// `NULL` reads as an empty string.
fn text_column(row: &Row, column: &'static str) -> Result<String, SourceError> {
    row.try_get::<&str, _>(column)
        .map(|value| value.unwrap_or_default().to_string())
        .map_err(|e| SourceError::Decode {
            column,
            message: e.to_string(),
        })
}

fn timestamp_column(
    row: &Row,
    column: &'static str,
) -> Result<Option<OffsetDateTime>, SourceError> {
    if let Ok(value) = row.try_get::<OffsetDateTime, _>(column) {
        return Ok(value);
    }
    row.try_get::<PrimitiveDateTime, _>(column)
        .map(|value| value.map(PrimitiveDateTime::assume_utc))
        .map_err(|e| SourceError::Decode {
            column,
            message: e.to_string(),
        })
}
