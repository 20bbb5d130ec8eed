use std::sync::Arc;

use crate::{
    domain::{
        RepoRetrieveError,
        credentials::{CredentialService, WeakPasswordReason},
        otp::OtpPurpose,
        session::SessionRepository,
        user::{User, UserRepository},
    },
    workflow::account::{
        normalize_email,
        otp::{OtpError, OtpWorkflow},
    },
};

#[derive(Debug, thiserror::Error)]
pub enum PasswordResetError {
    #[error("invalid or expired code")]
    InvalidCode,
    #[error("weak password: {0}")]
    WeakPassword(WeakPasswordReason),
    #[error("internal error: {0}")]
    Internal(String),
}

#[async_trait::async_trait]
pub trait PasswordResetUseCase {
    /// Succeeds whether or not the address belongs to an account.
    async fn request_password_reset(&self, email: &str) -> Result<(), PasswordResetError>;
    async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), PasswordResetError>;
}

pub struct PasswordResetUseCaseImpl<
    U: UserRepository,
    S: SessionRepository,
    C: CredentialService,
    O: OtpWorkflow,
> {
    user_repository: Arc<U>,
    session_repository: Arc<S>,
    credential_service: Arc<C>,
    otp_workflow: Arc<O>,
}

impl<U: UserRepository, S: SessionRepository, C: CredentialService, O: OtpWorkflow>
    PasswordResetUseCaseImpl<U, S, C, O>
{
    pub fn new(
        user_repository: Arc<U>,
        session_repository: Arc<S>,
        credential_service: Arc<C>,
        otp_workflow: Arc<O>,
    ) -> Self {
        Self {
            user_repository,
            session_repository,
            credential_service,
            otp_workflow,
        }
    }

    async fn find_user(&self, email: &str) -> Result<Option<User>, PasswordResetError> {
        let Some(email) = normalize_email(email) else {
            return Ok(None);
        };
        match self.user_repository.get_user_by_email(&email).await {
            Ok(user) => Ok(Some(user)),
            Err(RepoRetrieveError::NotFound) => Ok(None),
            Err(RepoRetrieveError::StorageError(e)) => Err(PasswordResetError::Internal(e)),
        }
    }
}

#[async_trait::async_trait]
impl<
    U: UserRepository + Send + Sync + 'static,
    S: SessionRepository + Send + Sync + 'static,
    C: CredentialService + Send + Sync + 'static,
    O: OtpWorkflow + Send + Sync + 'static,
> PasswordResetUseCase for PasswordResetUseCaseImpl<U, S, C, O>
{
    async fn request_password_reset(&self, email: &str) -> Result<(), PasswordResetError> {
        let Some(user) = self.find_user(email).await? else {
            log::debug!("Password reset requested for unknown email");
            return Ok(());
        };
        match self
            .otp_workflow
            .issue_otp(&user, OtpPurpose::PasswordReset)
            .await
        {
            Ok(()) => Ok(()),
            Err(OtpError::TooSoon) => {
                log::debug!("Password reset for user {} throttled", user.id);
                Ok(())
            }
            Err(e) => Err(PasswordResetError::Internal(e.to_string())),
        }
    }

    async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), PasswordResetError> {
        self.credential_service
            .check_password_strength(new_password)
            .map_err(PasswordResetError::WeakPassword)?;
        let user = self
            .find_user(email)
            .await?
            .ok_or(PasswordResetError::InvalidCode)?;

        self.otp_workflow
            .verify_otp(&user, OtpPurpose::PasswordReset, code.trim())
            .await
            .map_err(|e| match e {
                OtpError::Internal(e) => PasswordResetError::Internal(e),
                OtpError::TooSoon | OtpError::InvalidCode => PasswordResetError::InvalidCode,
            })?;

        let password_hash = self
            .credential_service
            .hash_secret(new_password)
            .map_err(|e| PasswordResetError::Internal(e.to_string()))?;
        self.user_repository
            .set_password_hash(user.id, &password_hash)
            .await
            .map_err(|e| PasswordResetError::Internal(e.to_string()))?;

        match self.session_repository.delete_user_sessions(user.id).await {
            Ok(count) => log::info!(
                "Password of user {} reset, {} sessions revoked",
                user.id,
                count
            ),
            Err(e) => log::error!("Failed to revoke sessions of user {}: {}", user.id, e),
        }
        Ok(())
    }
}
