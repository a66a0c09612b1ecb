use askama::Template;

use super::{Email, MailError, Mailer};
use crate::config::MailConfig;
use crate::run::Variant;

#[derive(Template)]
#[template(path = "notification.txt", escape = "none")]
struct NotificationTemplate<'a> {
    scope: &'a str,
    body: &'a str,
}

/// Sends one report to the configured distribution list.
pub struct Notifier<M: Mailer> {
    mailer: M,
    sender: String,
    recipients: Vec<String>,
}

impl<M: Mailer> Notifier<M> {
    pub fn new(mailer: M, config: &MailConfig) -> Self {
        Self {
            mailer,
            sender: config.sender.clone(),
            recipients: config.recipients.clone(),
        }
    }

    pub fn mailer(&self) -> &M {
        &self.mailer
    }

    /// Wrap a rendered report in the notification template.
    pub fn compose(&self, variant: Variant, report: &str) -> Result<Email, MailError> {
        let text = NotificationTemplate {
            scope: variant.scope(),
            body: report,
        }
        .render()?;

        Email::builder()
            .from(&self.sender)
            .to_many(self.recipients.iter().cloned())
            .subject(variant.subject())
            .text(text)
            .build()
    }

    /// Exactly one email per call. Failures are returned, never retried.
    pub async fn notify(&self, variant: Variant, report: &str) -> Result<(), MailError> {
        let email = self.compose(variant, report)?;
        self.mailer.send(&email).await?;
        tracing::info!(recipients = %email.to.join(", "), subject = %email.subject, "notification sent");
        Ok(())
    }
}
