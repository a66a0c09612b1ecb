//! SQL text. Parameters are always bound (`@P1`), never interpolated.

/// Most recent distinct `OnError` message, deduplicated per
/// (execution, message) keeping the latest occurrence.
pub const LATEST_CATALOG_ERROR: &str = r#"
WITH CatalogErrors AS (
    SELECT
        EM.event_message_id,
        EM.message_time AS DataHora,
        EM.message AS MensagemErro,
        E.execution_id AS Execution_Id,
        E.package_name AS Package_Name,
        E.project_name AS Project_Name,
        ROW_NUMBER() OVER (
            PARTITION BY E.execution_id, EM.message
            ORDER BY EM.message_time DESC
        ) AS rn
    FROM SSISDB.catalog.event_messages AS EM
    JOIN SSISDB.catalog.executions AS E
        ON EM.operation_id = E.execution_id
    WHERE EM.event_name = 'OnError'
)
SELECT TOP 1
    Execution_Id,
    DataHora,
    MensagemErro,
    Package_Name,
    Project_Name
FROM CatalogErrors
WHERE rn = 1
ORDER BY Execution_Id DESC
"#;

pub const LATEST_JOB_ID: &str = "SELECT MAX(jobid) AS jobid FROM etl_job";

pub const WAREHOUSE_ERRORS: &str =
    "SELECT jobid, Transformacao, Descricao FROM etl_erros_dw WHERE jobid = @P1";

pub const STAGING_ERRORS: &str =
    "SELECT jobid, Transformacao, Campo, Descricao FROM etl_erros_staging WHERE jobid = @P1";
