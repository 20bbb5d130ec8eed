use std::sync::Arc;

use crate::{
    domain::{
        RepoCreateError, RepoRetrieveError,
        credentials::{CredentialService, WeakPasswordReason},
        otp::OtpPurpose,
        stats::StatsRepository,
        user::{InvalidUsernameReason, NewUser, User, UserRepository, UsernamePolicy},
    },
    workflow::account::{normalize_email, otp::OtpWorkflow},
};

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("invalid name: {0}")]
    InvalidName(InvalidUsernameReason),
    #[error("weak password: {0}")]
    WeakPassword(WeakPasswordReason),
    #[error("email is already registered")]
    EmailTaken,
    #[error("name is already taken")]
    NameTaken,
    #[error("internal error: {0}")]
    Internal(String),
}

#[async_trait::async_trait]
pub trait RegisterUseCase {
    async fn register(&self, email: &str, password: &str, name: &str)
    -> Result<User, RegisterError>;
}

pub struct RegisterUseCaseImpl<
    U: UserRepository,
    S: StatsRepository,
    C: CredentialService,
    P: UsernamePolicy,
    O: OtpWorkflow,
> {
    user_repository: Arc<U>,
    stats_repository: Arc<S>,
    credential_service: Arc<C>,
    username_policy: Arc<P>,
    otp_workflow: Arc<O>,
}

impl<U: UserRepository, S: StatsRepository, C: CredentialService, P: UsernamePolicy, O: OtpWorkflow>
    RegisterUseCaseImpl<U, S, C, P, O>
{
    pub fn new(
        user_repository: Arc<U>,
        stats_repository: Arc<S>,
        credential_service: Arc<C>,
        username_policy: Arc<P>,
        otp_workflow: Arc<O>,
    ) -> Self {
        Self {
            user_repository,
            stats_repository,
            credential_service,
            username_policy,
            otp_workflow,
        }
    }
}

#[async_trait::async_trait]
impl<
    U: UserRepository + Send + Sync + 'static,
    S: StatsRepository + Send + Sync + 'static,
    C: CredentialService + Send + Sync + 'static,
    P: UsernamePolicy + Send + Sync + 'static,
    O: OtpWorkflow + Send + Sync + 'static,
> RegisterUseCase for RegisterUseCaseImpl<U, S, C, P, O>
{
    async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, RegisterError> {
        let email = normalize_email(email).ok_or(RegisterError::InvalidEmail)?;
        let name = name.trim();
        self.username_policy
            .validate(name)
            .map_err(RegisterError::InvalidName)?;
        self.credential_service
            .check_password_strength(password)
            .map_err(RegisterError::WeakPassword)?;

        match self.user_repository.get_user_by_email(&email).await {
            Ok(_) => return Err(RegisterError::EmailTaken),
            Err(RepoRetrieveError::NotFound) => {}
            Err(RepoRetrieveError::StorageError(e)) => return Err(RegisterError::Internal(e)),
        }
        match self.user_repository.get_user_by_name(name).await {
            Ok(_) => return Err(RegisterError::NameTaken),
            Err(RepoRetrieveError::NotFound) => {}
            Err(RepoRetrieveError::StorageError(e)) => return Err(RegisterError::Internal(e)),
        }

        let password_hash = self
            .credential_service
            .hash_secret(password)
            .map_err(|e| RegisterError::Internal(e.to_string()))?;
        let user = self
            .user_repository
            .create_user(NewUser {
                email,
                name: name.to_string(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // lost a race against a concurrent registration
                RepoCreateError::Conflict => RegisterError::NameTaken,
                RepoCreateError::StorageError(e) => RegisterError::Internal(e),
            })?;

        if let Err(e) = self.stats_repository.create_stats(user.id).await {
            log::error!("Failed to create stats for user {}: {}", user.id, e);
        }
        if let Err(e) = self
            .otp_workflow
            .issue_otp(&user, OtpPurpose::EmailVerification)
            .await
        {
            log::error!("Failed to send verification code to user {}: {}", user.id, e);
        }

        log::info!("Registered user {} ({})", user.name, user.id);
        Ok(user)
    }
}
