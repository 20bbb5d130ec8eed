use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::domain::{
    RepoRetrieveError,
    session::{Session, SessionRepository},
    user::{User, UserRepository},
};

const LAST_ONLINE_RESOLUTION_SECONDS: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum AuthenticateError {
    #[error("invalid or expired session")]
    InvalidSession,
    #[error("internal error: {0}")]
    Internal(String),
}

#[async_trait::async_trait]
pub trait AuthenticateUseCase {
    async fn authenticate(&self, token: &str) -> Result<User, AuthenticateError>;
}

pub struct AuthenticateUseCaseImpl<U: UserRepository, S: SessionRepository> {
    user_repository: Arc<U>,
    session_repository: Arc<S>,
}

impl<U: UserRepository, S: SessionRepository> AuthenticateUseCaseImpl<U, S> {
    pub fn new(user_repository: Arc<U>, session_repository: Arc<S>) -> Self {
        Self {
            user_repository,
            session_repository,
        }
    }
}

#[async_trait::async_trait]
impl<U: UserRepository + Send + Sync + 'static, S: SessionRepository + Send + Sync + 'static>
    AuthenticateUseCase for AuthenticateUseCaseImpl<U, S>
{
    async fn authenticate(&self, token: &str) -> Result<User, AuthenticateError> {
        let now = Utc::now();
        let session = match self.session_repository.get_session_by_token(token).await {
            Ok(session) => session,
            Err(RepoRetrieveError::NotFound) => return Err(AuthenticateError::InvalidSession),
            Err(RepoRetrieveError::StorageError(e)) => return Err(AuthenticateError::Internal(e)),
        };

        if session.is_expired(now) {
            if let Err(e) = self.session_repository.delete_session_by_token(token).await {
                log::error!("Failed to delete expired session {}: {}", session.id, e);
            }
            return Err(AuthenticateError::InvalidSession);
        }

        if session.needs_refresh(now) {
            if let Err(e) = self
                .session_repository
                .refresh_session(session.id, now + Session::ttl(), now)
                .await
            {
                log::error!("Failed to refresh session {}: {}", session.id, e);
            }
        }

        let user = match self.user_repository.get_user(session.user_id).await {
            Ok(user) => user,
            Err(RepoRetrieveError::NotFound) => return Err(AuthenticateError::InvalidSession),
            Err(RepoRetrieveError::StorageError(e)) => return Err(AuthenticateError::Internal(e)),
        };

        let stale = user
            .last_online_at
            .is_none_or(|at| now - at >= Duration::seconds(LAST_ONLINE_RESOLUTION_SECONDS));
        if stale {
            if let Err(e) = self.user_repository.touch_last_online(user.id, now).await {
                log::error!("Failed to update last online time of {}: {}", user.id, e);
            }
        }

        Ok(user)
    }
}
