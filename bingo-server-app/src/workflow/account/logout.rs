use std::sync::Arc;

use crate::domain::{UserId, session::SessionRepository};

#[derive(Debug, thiserror::Error)]
pub enum LogoutError {
    #[error("internal error: {0}")]
    Internal(String),
}

#[async_trait::async_trait]
pub trait LogoutUseCase {
    async fn logout(&self, token: &str) -> Result<(), LogoutError>;
    /// Revokes every session of the user, returning how many there were.
    async fn logout_all(&self, user_id: UserId) -> Result<u64, LogoutError>;
}

pub struct LogoutUseCaseImpl<S: SessionRepository> {
    session_repository: Arc<S>,
}

impl<S: SessionRepository> LogoutUseCaseImpl<S> {
    pub fn new(session_repository: Arc<S>) -> Self {
        Self { session_repository }
    }
}

#[async_trait::async_trait]
impl<S: SessionRepository + Send + Sync + 'static> LogoutUseCase for LogoutUseCaseImpl<S> {
    async fn logout(&self, token: &str) -> Result<(), LogoutError> {
        self.session_repository
            .delete_session_by_token(token)
            .await
            .map_err(|e| LogoutError::Internal(e.to_string()))
    }

    async fn logout_all(&self, user_id: UserId) -> Result<u64, LogoutError> {
        let removed = self
            .session_repository
            .delete_user_sessions(user_id)
            .await
            .map_err(|e| LogoutError::Internal(e.to_string()))?;
        log::info!("Revoked {} sessions of user {}", removed, user_id);
        Ok(removed)
    }
}
