//! Notification email delivery.
//!
//! A thin abstraction over [lettre](https://lettre.rs): [`Notifier`] wraps a
//! rendered report in the fixed notification template and hands one
//! [`Email`] to a [`Mailer`].
//!
//! ```ignore
//! let mailer = SmtpMailer::from_config(&settings.mail)?;
//! let notifier = Notifier::new(mailer, &settings.mail);
//! notifier.notify(Variant::JobLog, &report.render()).await?;
//! ```
//!
//! [`MemoryMailer`] records emails instead of sending them and
//! [`ConsoleMailer`] prints them, for tests and dry runs.

mod console;
mod mailer;
mod memory;
mod message;
mod notifier;

pub use console::ConsoleMailer;
pub use mailer::{Mailer, SmtpMailer};
pub use memory::MemoryMailer;
pub use message::{Email, EmailBuilder};
pub use notifier::Notifier;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("failed to render notification: {0}")]
    Template(#[from] askama::Error),

    #[error("SMTP error: {0}")]
    Smtp(String),
}
