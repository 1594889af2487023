//! # taskpulse Mail
//!
//! Outbound email transport: async SMTP via lettre with STARTTLS.
//! Send-only: the dispatcher and daily summary push notifications out,
//! nothing is ever read back.

use async_trait::async_trait;
use taskpulse_core::config::MailConfig;
use taskpulse_core::error::{Error, Result};

/// Notification transport consumed by the dispatcher.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver one plain-text message to every listed recipient.
    async fn send(&self, subject: &str, body: &str, to: &[String]) -> Result<()>;
}

/// SMTP sender.
pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, subject: &str, body: &str, to: &[String]) -> Result<()> {
        use lettre::{
            AsyncSmtpTransport, AsyncTransport, Message, message::Mailbox,
            message::header::ContentType, transport::smtp::authentication::Credentials,
        };

        if to.is_empty() {
            return Err(Error::Send("No recipients".into()));
        }

        let from_name = self.config.display_name.as_deref().unwrap_or("taskpulse");
        let from_mailbox: Mailbox = format!("{from_name} <{}>", self.config.email)
            .parse()
            .map_err(|e| Error::Send(format!("Invalid from: {e}")))?;

        let mut builder = Message::builder()
            .from(from_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for addr in to {
            let mailbox: Mailbox = addr
                .parse()
                .map_err(|e| Error::Send(format!("Invalid to '{addr}': {e}")))?;
            builder = builder.to(mailbox);
        }

        let email = builder
            .body(body.to_string())
            .map_err(|e| Error::Send(format!("Build email: {e}")))?;

        let creds = Credentials::new(self.config.email.clone(), self.config.password.clone());
        let mailer =
            AsyncSmtpTransport::<lettre::Tokio1Executor>::starttls_relay(&self.config.smtp_host)
                .map_err(|e| Error::Send(format!("SMTP relay: {e}")))?
                .port(self.config.smtp_port)
                .credentials(creds)
                .build();

        mailer
            .send(email)
            .await
            .map_err(|e| Error::Send(format!("SMTP send: {e}")))?;

        tracing::info!("Email sent: '{subject}' to {} recipient(s)", to.len());
        Ok(())
    }
}
