use std::sync::Arc;

use chrono::Utc;

use crate::{
    domain::{
        RepoRetrieveError, RepoUpdateError,
        credentials::CredentialService,
        otp::{EmailOtp, OTP_MAX_ATTEMPTS, OTP_TTL_MINUTES, OtpPurpose, OtpRepository},
        user::User,
    },
    ports::email::{EmailPort, deliver_email},
};

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("a code was sent recently, try again later")]
    TooSoon,
    #[error("invalid or expired code")]
    InvalidCode,
    #[error("internal error: {0}")]
    Internal(String),
}

/// Issues and checks the emailed one-time codes.
#[async_trait::async_trait]
pub trait OtpWorkflow {
    async fn issue_otp(&self, user: &User, purpose: OtpPurpose) -> Result<(), OtpError>;
    /// Consumes the latest code when it matches.
    async fn verify_otp(&self, user: &User, purpose: OtpPurpose, code: &str)
    -> Result<(), OtpError>;
}

pub struct OtpWorkflowImpl<O: OtpRepository, C: CredentialService, E: EmailPort> {
    otp_repository: Arc<O>,
    credential_service: Arc<C>,
    email_port: Arc<E>,
}

impl<O: OtpRepository, C: CredentialService, E: EmailPort> OtpWorkflowImpl<O, C, E> {
    pub fn new(otp_repository: Arc<O>, credential_service: Arc<C>, email_port: Arc<E>) -> Self {
        Self {
            otp_repository,
            credential_service,
            email_port,
        }
    }

    fn compose_email(user: &User, purpose: OtpPurpose, code: &str) -> (String, String) {
        let (subject, intro) = match purpose {
            OtpPurpose::EmailVerification => (
                "Verify your Bingo account",
                "Use this code to verify your email address:",
            ),
            OtpPurpose::PasswordReset => (
                "Reset your Bingo password",
                "Use this code to reset your password:",
            ),
        };
        let body = format!(
            "Hello {},\n\n\
            {}\n\n\
            {}\n\n\
            The code expires in {} minutes. If you did not request it, you can ignore this email.\n\n\
            Best regards,\n\
            The Bingo Team",
            user.display_name.as_deref().unwrap_or(&user.name),
            intro,
            code,
            OTP_TTL_MINUTES
        );
        (subject.to_string(), body)
    }
}

#[async_trait::async_trait]
impl<
    O: OtpRepository + Send + Sync + 'static,
    C: CredentialService + Send + Sync + 'static,
    E: EmailPort + Send + Sync + 'static,
> OtpWorkflow for OtpWorkflowImpl<O, C, E>
{
    async fn issue_otp(&self, user: &User, purpose: OtpPurpose) -> Result<(), OtpError> {
        let now = Utc::now();
        match self.otp_repository.get_latest_otp(user.id, purpose).await {
            Ok(latest) if latest.blocks_resend(now) => return Err(OtpError::TooSoon),
            Ok(_) | Err(RepoRetrieveError::NotFound) => {}
            Err(RepoRetrieveError::StorageError(e)) => return Err(OtpError::Internal(e)),
        }

        let code = self.credential_service.generate_otp_code();
        let code_hash = self
            .credential_service
            .hash_secret(&code)
            .map_err(|e| OtpError::Internal(e.to_string()))?;
        let otp = EmailOtp::new(user.id, code_hash, purpose, now);
        self.otp_repository
            .create_otp(&otp)
            .await
            .map_err(|e| OtpError::Internal(e.to_string()))?;

        let (subject, body) = Self::compose_email(user, purpose, &code);
        deliver_email(&self.email_port, user.email.clone(), subject, body).await;
        log::info!("Issued {} code for user {}", purpose.as_str(), user.id);
        Ok(())
    }

    async fn verify_otp(
        &self,
        user: &User,
        purpose: OtpPurpose,
        code: &str,
    ) -> Result<(), OtpError> {
        let now = Utc::now();
        let otp = match self.otp_repository.get_latest_otp(user.id, purpose).await {
            Ok(otp) => otp,
            Err(RepoRetrieveError::NotFound) => return Err(OtpError::InvalidCode),
            Err(RepoRetrieveError::StorageError(e)) => return Err(OtpError::Internal(e)),
        };
        if !otp.is_active(now) {
            return Err(OtpError::InvalidCode);
        }
        match self.otp_repository.register_otp_attempt(otp.id).await {
            Ok(()) => {}
            Err(RepoUpdateError::NotFound | RepoUpdateError::Conflict) => {
                return Err(OtpError::InvalidCode);
            }
            Err(RepoUpdateError::StorageError(e)) => return Err(OtpError::Internal(e)),
        }
        if !self.credential_service.verify_secret(code, &otp.code_hash) {
            log::debug!(
                "Wrong {} code for user {} (attempt {} of {})",
                purpose.as_str(),
                user.id,
                otp.attempts + 1,
                OTP_MAX_ATTEMPTS
            );
            return Err(OtpError::InvalidCode);
        }
        match self.otp_repository.consume_otp(otp.id, now).await {
            Ok(()) => Ok(()),
            Err(RepoUpdateError::NotFound | RepoUpdateError::Conflict) => {
                Err(OtpError::InvalidCode)
            }
            Err(RepoUpdateError::StorageError(e)) => Err(OtpError::Internal(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::user::{NewUser, UserRepository},
        testing::{InMemoryStore, MockEmailPort, test_credentials},
    };

    use super::*;

    async fn setup() -> (
        Arc<InMemoryStore>,
        Arc<MockEmailPort>,
        OtpWorkflowImpl<InMemoryStore, crate::domain::credentials::BcryptCredentialService, MockEmailPort>,
        User,
    ) {
        let store = Arc::new(InMemoryStore::new());
        let email = Arc::new(MockEmailPort::new());
        let workflow =
            OtpWorkflowImpl::new(store.clone(), Arc::new(test_credentials()), email.clone());
        let user = store
            .create_user(NewUser {
                email: "alice@example.com".to_string(),
                name: "alice".to_string(),
                password_hash: String::new(),
            })
            .await
            .unwrap();
        (store, email, workflow, user)
    }

    #[tokio::test]
    async fn test_issue_and_verify() {
        let (_store, email, workflow, user) = setup().await;
        workflow
            .issue_otp(&user, OtpPurpose::EmailVerification)
            .await
            .unwrap();
        let code = email.last_code_for("alice@example.com").unwrap();

        assert!(matches!(
            workflow
                .verify_otp(&user, OtpPurpose::PasswordReset, &code)
                .await,
            Err(OtpError::InvalidCode)
        ));
        workflow
            .verify_otp(&user, OtpPurpose::EmailVerification, &code)
            .await
            .unwrap();
        // single use
        assert!(matches!(
            workflow
                .verify_otp(&user, OtpPurpose::EmailVerification, &code)
                .await,
            Err(OtpError::InvalidCode)
        ));
    }

    #[tokio::test]
    async fn test_resend_is_throttled() {
        let (store, email, workflow, user) = setup().await;
        workflow
            .issue_otp(&user, OtpPurpose::PasswordReset)
            .await
            .unwrap();
        assert!(matches!(
            workflow.issue_otp(&user, OtpPurpose::PasswordReset).await,
            Err(OtpError::TooSoon)
        ));
        // other purposes are throttled separately
        workflow
            .issue_otp(&user, OtpPurpose::EmailVerification)
            .await
            .unwrap();
        assert_eq!(store.otp_count(), 2);
        assert_eq!(email.sent_count(), 2);
    }

    #[tokio::test]
    async fn test_wrong_code_is_rejected() {
        let (_store, email, workflow, user) = setup().await;
        workflow
            .issue_otp(&user, OtpPurpose::EmailVerification)
            .await
            .unwrap();
        let code = email.last_code_for("alice@example.com").unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };
        assert!(matches!(
            workflow
                .verify_otp(&user, OtpPurpose::EmailVerification, wrong)
                .await,
            Err(OtpError::InvalidCode)
        ));
    }

    #[tokio::test]
    async fn test_code_locks_after_failed_attempts() {
        let (store, email, workflow, user) = setup().await;
        workflow
            .issue_otp(&user, OtpPurpose::PasswordReset)
            .await
            .unwrap();
        let code = email.last_code_for("alice@example.com").unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };

        for _ in 0..OTP_MAX_ATTEMPTS {
            assert!(matches!(
                workflow
                    .verify_otp(&user, OtpPurpose::PasswordReset, wrong)
                    .await,
                Err(OtpError::InvalidCode)
            ));
        }
        // the right code no longer works once the attempts are spent
        assert!(matches!(
            workflow
                .verify_otp(&user, OtpPurpose::PasswordReset, &code)
                .await,
            Err(OtpError::InvalidCode)
        ));
        let latest = store
            .get_latest_otp(user.id, OtpPurpose::PasswordReset)
            .await
            .unwrap();
        assert_eq!(latest.attempts, OTP_MAX_ATTEMPTS);
        assert!(latest.consumed_at.is_none());
    }

    #[tokio::test]
    async fn test_last_attempt_can_still_succeed() {
        let (_store, email, workflow, user) = setup().await;
        workflow
            .issue_otp(&user, OtpPurpose::EmailVerification)
            .await
            .unwrap();
        let code = email.last_code_for("alice@example.com").unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };

        for _ in 1..OTP_MAX_ATTEMPTS {
            assert!(
                workflow
                    .verify_otp(&user, OtpPurpose::EmailVerification, wrong)
                    .await
                    .is_err()
            );
        }
        workflow
            .verify_otp(&user, OtpPurpose::EmailVerification, &code)
            .await
            .unwrap();
    }
}
