use std::io::Write;

use async_trait::async_trait;

use super::{Email, MailError, Mailer};

/// Prints emails to stdout instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleMailer;

impl ConsoleMailer {
    fn render(email: &Email) -> String {
        format!(
            "From: {}\nTo: {}\nSubject: {}\n\n{}\n",
            email.from,
            email.to.join(", "),
            email.subject,
            email.text
        )
    }
}

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(Self::render(email).as_bytes())
            .and_then(|()| stdout.flush())
            .map_err(|e| MailError::Build(format!("writing to stdout: {e}")))
    }
}
