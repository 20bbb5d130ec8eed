use std::str::FromStr;

use bingo_server_app::ports::email::{EmailPort, SendEmailError};
use lettre::{
    Message, SmtpTransport, Transport, message::Mailbox,
    transport::smtp::authentication::Credentials,
};

#[derive(Clone, Debug)]
pub struct SmtpSettings {
    pub host: String,
    pub user: String,
    pub password: String,
    pub from: String,
}

pub struct LettreEmailAdapter {
    transport: SmtpTransport,
    from: Mailbox,
}

impl LettreEmailAdapter {
    pub fn new(settings: &SmtpSettings) -> Result<Self, String> {
        let from = Mailbox::from_str(&settings.from)
            .map_err(|e| format!("Invalid sender address {}: {}", settings.from, e))?;
        let transport = SmtpTransport::relay(&settings.host)
            .map_err(|e| format!("Failed to create SMTP transport: {}", e))?
            .credentials(Credentials::new(
                settings.user.clone(),
                settings.password.clone(),
            ))
            .build();
        Ok(Self { transport, from })
    }
}

impl EmailPort for LettreEmailAdapter {
    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), SendEmailError> {
        let to = Mailbox::from_str(to)
            .map_err(|_| SendEmailError::InvalidToAddress(to.to_string()))?;
        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| SendEmailError::SendEmailError(e.to_string()))?;
        self.transport
            .send(&email)
            .map_err(|e| SendEmailError::SendEmailError(e.to_string()))?;
        log::debug!("Sent email '{}'", subject);
        Ok(())
    }
}

/// Stand-in used when no SMTP server is configured.
pub struct LogEmailAdapter;

impl EmailPort for LogEmailAdapter {
    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), SendEmailError> {
        log::info!("Email to {}: {}\n{}", to, subject, body);
        Ok(())
    }
}

/// The adapter the server runs with, chosen at startup.
pub enum EmailAdapter {
    Smtp(LettreEmailAdapter),
    Log(LogEmailAdapter),
}

impl EmailAdapter {
    /// Falls back to logging when no SMTP settings are given.
    pub fn from_settings(settings: Option<&SmtpSettings>) -> Result<Self, String> {
        match settings {
            Some(settings) => Ok(EmailAdapter::Smtp(LettreEmailAdapter::new(settings)?)),
            None => {
                log::warn!("No SMTP server configured, emails will only be logged");
                Ok(EmailAdapter::Log(LogEmailAdapter))
            }
        }
    }
}

impl EmailPort for EmailAdapter {
    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), SendEmailError> {
        match self {
            EmailAdapter::Smtp(adapter) => adapter.send_email(to, subject, body),
            EmailAdapter::Log(adapter) => adapter.send_email(to, subject, body),
        }
    }
}
