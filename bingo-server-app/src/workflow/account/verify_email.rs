use std::sync::Arc;

use crate::{
    domain::{
        RepoRetrieveError, UserId,
        otp::OtpPurpose,
        user::{User, UserRepository},
    },
    workflow::account::otp::{OtpError, OtpWorkflow},
};

#[derive(Debug, thiserror::Error)]
pub enum VerifyEmailError {
    #[error("user not found")]
    UserNotFound,
    #[error("email is already verified")]
    AlreadyVerified,
    #[error("a code was sent recently, try again later")]
    TooSoon,
    #[error("invalid or expired code")]
    InvalidCode,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<OtpError> for VerifyEmailError {
    fn from(e: OtpError) -> Self {
        match e {
            OtpError::TooSoon => VerifyEmailError::TooSoon,
            OtpError::InvalidCode => VerifyEmailError::InvalidCode,
            OtpError::Internal(e) => VerifyEmailError::Internal(e),
        }
    }
}

#[async_trait::async_trait]
pub trait VerifyEmailUseCase {
    async fn request_email_verification(&self, user_id: UserId) -> Result<(), VerifyEmailError>;
    async fn verify_email(&self, user_id: UserId, code: &str) -> Result<(), VerifyEmailError>;
}

pub struct VerifyEmailUseCaseImpl<U: UserRepository, O: OtpWorkflow> {
    user_repository: Arc<U>,
    otp_workflow: Arc<O>,
}

impl<U: UserRepository, O: OtpWorkflow> VerifyEmailUseCaseImpl<U, O> {
    pub fn new(user_repository: Arc<U>, otp_workflow: Arc<O>) -> Self {
        Self {
            user_repository,
            otp_workflow,
        }
    }

    async fn unverified_user(&self, user_id: UserId) -> Result<User, VerifyEmailError> {
        let user = match self.user_repository.get_user(user_id).await {
            Ok(user) => user,
            Err(RepoRetrieveError::NotFound) => return Err(VerifyEmailError::UserNotFound),
            Err(RepoRetrieveError::StorageError(e)) => return Err(VerifyEmailError::Internal(e)),
        };
        if user.email_verified {
            return Err(VerifyEmailError::AlreadyVerified);
        }
        Ok(user)
    }
}

#[async_trait::async_trait]
impl<U: UserRepository + Send + Sync + 'static, O: OtpWorkflow + Send + Sync + 'static>
    VerifyEmailUseCase for VerifyEmailUseCaseImpl<U, O>
{
    async fn request_email_verification(&self, user_id: UserId) -> Result<(), VerifyEmailError> {
        let user = self.unverified_user(user_id).await?;
        self.otp_workflow
            .issue_otp(&user, OtpPurpose::EmailVerification)
            .await?;
        Ok(())
    }

    async fn verify_email(&self, user_id: UserId, code: &str) -> Result<(), VerifyEmailError> {
        let user = self.unverified_user(user_id).await?;
        self.otp_workflow
            .verify_otp(&user, OtpPurpose::EmailVerification, code.trim())
            .await?;
        self.user_repository
            .set_email_verified(user.id)
            .await
            .map_err(|e| VerifyEmailError::Internal(e.to_string()))?;
        log::info!("User {} verified their email", user.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::user::NewUser,
        testing::{InMemoryStore, MockEmailPort, test_credentials},
        workflow::account::otp::OtpWorkflowImpl,
    };

    use super::*;

    #[tokio::test]
    async fn test_verify_email_flow() {
        let store = Arc::new(InMemoryStore::new());
        let email = Arc::new(MockEmailPort::new());
        let otp = Arc::new(OtpWorkflowImpl::new(
            store.clone(),
            Arc::new(test_credentials()),
            email.clone(),
        ));
        let use_case = VerifyEmailUseCaseImpl::new(store.clone(), otp);
        let user = store
            .create_user(NewUser {
                email: "alice@example.com".to_string(),
                name: "alice".to_string(),
                password_hash: String::new(),
            })
            .await
            .unwrap();

        use_case.request_email_verification(user.id).await.unwrap();
        assert!(matches!(
            use_case.request_email_verification(user.id).await,
            Err(VerifyEmailError::TooSoon)
        ));
        let code = email.last_code_for("alice@example.com").unwrap();

        assert!(matches!(
            use_case.verify_email(user.id, "not-a-code").await,
            Err(VerifyEmailError::InvalidCode)
        ));
        use_case
            .verify_email(user.id, &format!(" {} ", code))
            .await
            .unwrap();
        assert!(store.get_user(user.id).await.unwrap().email_verified);

        assert!(matches!(
            use_case.verify_email(user.id, &code).await,
            Err(VerifyEmailError::AlreadyVerified)
        ));
        assert!(matches!(
            use_case.request_email_verification(UserId::new()).await,
            Err(VerifyEmailError::UserNotFound)
        ));
    }
}
