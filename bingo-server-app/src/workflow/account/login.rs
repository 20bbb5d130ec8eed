use std::sync::Arc;

use chrono::Utc;

use crate::{
    domain::{
        RepoRetrieveError,
        credentials::CredentialService,
        session::{ClientInfo, Session, SessionRepository},
        user::UserRepository,
    },
    workflow::account::normalize_email,
};

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("internal error: {0}")]
    Internal(String),
}

#[async_trait::async_trait]
pub trait LoginUseCase {
    /// `identifier` is either the email address or the name.
    async fn login(
        &self,
        identifier: &str,
        password: &str,
        client: ClientInfo,
    ) -> Result<Session, LoginError>;
}

pub struct LoginUseCaseImpl<U: UserRepository, S: SessionRepository, C: CredentialService> {
    user_repository: Arc<U>,
    session_repository: Arc<S>,
    credential_service: Arc<C>,
}

impl<U: UserRepository, S: SessionRepository, C: CredentialService> LoginUseCaseImpl<U, S, C> {
    pub fn new(
        user_repository: Arc<U>,
        session_repository: Arc<S>,
        credential_service: Arc<C>,
    ) -> Self {
        Self {
            user_repository,
            session_repository,
            credential_service,
        }
    }
}

#[async_trait::async_trait]
impl<
    U: UserRepository + Send + Sync + 'static,
    S: SessionRepository + Send + Sync + 'static,
    C: CredentialService + Send + Sync + 'static,
> LoginUseCase for LoginUseCaseImpl<U, S, C>
{
    async fn login(
        &self,
        identifier: &str,
        password: &str,
        client: ClientInfo,
    ) -> Result<Session, LoginError> {
        let lookup = if identifier.contains('@') {
            let email = normalize_email(identifier).ok_or(LoginError::InvalidCredentials)?;
            self.user_repository.get_user_by_email(&email).await
        } else {
            self.user_repository.get_user_by_name(identifier.trim()).await
        };
        let user = match lookup {
            Ok(user) => user,
            Err(RepoRetrieveError::NotFound) => return Err(LoginError::InvalidCredentials),
            Err(RepoRetrieveError::StorageError(e)) => return Err(LoginError::Internal(e)),
        };

        if !self
            .credential_service
            .verify_secret(password, &user.password_hash)
        {
            log::info!("Failed login attempt for user {}", user.id);
            return Err(LoginError::InvalidCredentials);
        }

        let token = self.credential_service.generate_session_token();
        let session = Session::new(user.id, token, client, Utc::now());
        self.session_repository
            .create_session(&session)
            .await
            .map_err(|e| LoginError::Internal(e.to_string()))?;

        log::info!("User {} logged in", user.id);
        Ok(session)
    }
}
