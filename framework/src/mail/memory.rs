use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Email, MailError, Mailer};

/// In-memory [`Mailer`] for development and testing.
///
/// Emails are recorded instead of sent. A failing mailer records nothing and
/// returns [`MailError::Smtp`] from every send.
#[derive(Clone, Default)]
pub struct MemoryMailer {
    sent: Arc<Mutex<Vec<Email>>>,
    failure: Option<String>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub async fn sent(&self) -> Vec<Email> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        if let Some(message) = &self.failure {
            return Err(MailError::Smtp(message.clone()));
        }
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}
