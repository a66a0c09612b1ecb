//! Detects newly logged ETL failures and mails them to operations.
//!
//! A run reads [`Settings`] from the deployment's `config.properties`, asks a
//! source for the latest errors, renders them into a [`report::Report`] and
//! sends it through a [`mail::Notifier`]. See [`run`] for the sequencing.

pub mod clean;
pub mod config;
pub mod error;
pub mod mail;
pub mod report;
pub mod run;
pub mod source;

pub use config::{EnvConfig, Settings};
pub use error::Error;
pub use run::{run_catalog, run_job_log, Outcome, RunOptions, Variant};
