//! Outbound mail.
//!
//! The service only renders messages and hands them to a [`Mailer`]. The
//! bundled [`LogMailer`] writes them to the log instead of sending them.

use async_trait::async_trait;

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub subject: String,
    pub body: String,
}

impl MailMessage {
    /// Link to confirm a freshly registered account.
    #[must_use]
    pub fn confirmation(app_host: &str, code: &str) -> Self {
        Self {
            subject: "Your confirmation link".to_string(),
            body: format!(
                "Please use the following confirmation link: https://{app_host}/confirm/{code}\n"
            ),
        }
    }

    /// Link to set a new password.
    #[must_use]
    pub fn password_reset(app_host: &str, code: &str) -> Self {
        Self {
            subject: "Your password reset link".to_string(),
            body: format!(
                "Please use the following link to reset your password: \
                 https://{app_host}/reset-password/{code}\n"
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("invalid recipient address: {0}")]
    InvalidRecipient(String),
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage, to: &str) -> Result<(), MailerError>;
}

/// Logs messages at info level. Nothing leaves the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage, to: &str) -> Result<(), MailerError> {
        if !to.contains('@') {
            return Err(MailerError::InvalidRecipient(to.to_string()));
        }
        tracing::info!(to, subject = %message.subject, "Sending mail");
        tracing::debug!(body = %message.body, "Mail body");
        Ok(())
    }
}
