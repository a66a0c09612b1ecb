//! Run controller.
//!
//! One invocation walks
//!
//! ```text
//! DetermineScope -> FetchErrors -> NoErrors | FormatAndNotify -> Cleanup -> Done
//! ```
//!
//! after the caller has loaded [`Settings`](crate::Settings). Source failures
//! are logged and the affected source treated as empty; a report built from
//! the remaining sources still goes out, with a note naming what was
//! unavailable. Mail failures are logged and reported through [`Outcome`].

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::mail::{Mailer, Notifier};
use crate::report::{Report, ReportFile, Section};
use crate::source::{CatalogSource, JobId, JobLogSource, Lookup};

/// Which ETL metadata a run inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Orchestration catalog (`SSISDB`) feeding the cube.
    Catalog,
    /// Transformation job log (`etl_job` and the error tables).
    JobLog,
}

impl Variant {
    pub fn subject(self) -> &'static str {
        match self {
            Variant::Catalog => "Erros Detectados na Execução do CUBO",
            Variant::JobLog => "Erros Detetados na Execução do PENTAHO",
        }
    }

    /// Completes "Foram encontrados erros nas execuções ...".
    pub fn scope(self) -> &'static str {
        match self {
            Variant::Catalog => "do CUBO",
            Variant::JobLog => "dos jobs",
        }
    }
}

/// How a run ended, when it did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No scope could be determined or no rows were found. No email.
    NothingToReport,
    Notified,
    /// The report was built but the email could not be sent.
    DeliveryFailed,
    /// Every source failed and nothing was found. No email.
    SourcesUnavailable,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::NothingToReport | Outcome::Notified => 0,
            Outcome::DeliveryFailed => 3,
            Outcome::SourcesUnavailable => 4,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Where to keep a copy of the report while it is being sent. `None`
    /// skips the transient file.
    pub report_path: Option<PathBuf>,
    /// Inspect this job instead of the latest one (job log only).
    pub job_id: Option<JobId>,
}

/// Report the most recent distinct orchestration catalog error.
pub async fn run_catalog<S, M>(
    source: &S,
    notifier: &Notifier<M>,
    options: &RunOptions,
) -> Result<Outcome>
where
    S: CatalogSource,
    M: Mailer,
{
    tracing::debug!(lookup = %Lookup::Catalog, "fetching errors");
    let errors = match source.latest_errors().await {
        Ok(errors) => errors,
        Err(e) => {
            tracing::error!(lookup = %Lookup::Catalog, error = %e, "source unavailable");
            return Ok(Outcome::SourcesUnavailable);
        }
    };

    let mut report = Report::new();
    report.push(Section::catalog(&errors));

    if report.is_empty() {
        tracing::info!("no errors found in the latest executions");
        return Ok(Outcome::NothingToReport);
    }

    deliver(Variant::Catalog, &report, notifier, options).await
}

/// Report the warehouse and staging errors logged for one job.
pub async fn run_job_log<S, M>(
    source: &S,
    notifier: &Notifier<M>,
    options: &RunOptions,
) -> Result<Outcome>
where
    S: JobLogSource,
    M: Mailer,
{
    let job_id = match options.job_id {
        Some(job_id) => job_id,
        None => match source.latest_job_id().await {
            Ok(Some(job_id)) => job_id,
            Ok(None) => {
                tracing::info!("could not determine the latest job id");
                return Ok(Outcome::NothingToReport);
            }
            Err(e) => {
                tracing::error!(lookup = %Lookup::LatestJob, error = %e, "source unavailable");
                return Ok(Outcome::SourcesUnavailable);
            }
        },
    };
    tracing::debug!(job_id, "fetching errors");

    let mut report = Report::new();
    let mut answered = 0;

    match source.warehouse_errors(job_id).await {
        Ok(rows) => {
            answered += 1;
            tracing::debug!(job_id, lookup = %Lookup::Warehouse, rows = rows.len(), "rows fetched");
            report.push(Section::warehouse(&rows));
        }
        Err(e) => {
            tracing::warn!(job_id, lookup = %Lookup::Warehouse, error = %e, "source unavailable");
            report.unavailable(Lookup::Warehouse, &e);
        }
    }

    match source.staging_errors(job_id).await {
        Ok(Some(rows)) => {
            answered += 1;
            tracing::debug!(job_id, lookup = %Lookup::Staging, rows = rows.len(), "rows fetched");
            report.push(Section::staging(&rows));
        }
        Ok(None) => tracing::debug!("no staging database configured"),
        Err(e) => {
            tracing::warn!(job_id, lookup = %Lookup::Staging, error = %e, "source unavailable");
            report.unavailable(Lookup::Staging, &e);
        }
    }

    if report.is_empty() {
        if answered == 0 {
            tracing::error!(job_id, "no source could be queried");
            return Ok(Outcome::SourcesUnavailable);
        }
        tracing::info!(job_id, "no errors found for job");
        return Ok(Outcome::NothingToReport);
    }

    deliver(Variant::JobLog, &report, notifier, options).await
}

/// FormatAndNotify and Cleanup.
async fn deliver<M: Mailer>(
    variant: Variant,
    report: &Report,
    notifier: &Notifier<M>,
    options: &RunOptions,
) -> Result<Outcome> {
    tracing::info!(
        sections = report.sections().len(),
        errors = report.entry_count(),
        "errors found, sending notification"
    );
    let body = report.render();

    let file = match &options.report_path {
        Some(path) => Some(
            ReportFile::write(path, &body).map_err(|source| Error::ReportFile {
                path: path.clone(),
                source,
            })?,
        ),
        None => None,
    };

    let outcome = match notifier.notify(variant, &body).await {
        Ok(()) => Outcome::Notified,
        Err(e) => {
            tracing::error!(error = %e, "failed to send notification");
            Outcome::DeliveryFailed
        }
    };

    if let Some(file) = file {
        let path = file.path().to_path_buf();
        match file.remove() {
            Ok(()) => tracing::debug!(path = %path.display(), "report file removed"),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not remove report file")
            }
        }
    }

    Ok(outcome)
}
