use std::sync::Arc;

pub trait EmailPort {
    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), SendEmailError>;
}

#[derive(Debug, Clone)]
pub enum SendEmailError {
    InvalidToAddress(String),
    SendEmailError(String),
}

impl std::fmt::Display for SendEmailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendEmailError::InvalidToAddress(to) => write!(f, "Invalid recipient: {}", to),
            SendEmailError::SendEmailError(e) => write!(f, "Failed to send email: {}", e),
        }
    }
}

/// Runs the port on a blocking thread. Failures are logged, never returned.
pub async fn deliver_email<E: EmailPort + Send + Sync + 'static>(
    email_port: &Arc<E>,
    to: String,
    subject: String,
    body: String,
) {
    let email_port = email_port.clone();
    let result =
        tokio::task::spawn_blocking(move || email_port.send_email(&to, &subject, &body)).await;
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::error!("{}", e),
        Err(e) => log::error!("Email task panicked: {}", e),
    }
}
