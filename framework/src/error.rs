//! Failures that end a run.
//!
//! Only configuration problems and unexpected local failures surface here.
//! Source and mail errors are recovered inside the run controller and show
//! up as an [`Outcome`](crate::run::Outcome) instead.

use std::path::PathBuf;

pub use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not write report file {}: {source}", .path.display())]
    ReportFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Error {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Config(_) => 2,
            Error::ReportFile { .. } => 1,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
