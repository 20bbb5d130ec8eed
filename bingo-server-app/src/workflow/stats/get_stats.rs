use std::sync::Arc;

use crate::domain::{
    RepoRetrieveError, UserId,
    stats::{StatsRepository, UserStats},
    user::UserRepository,
};

#[derive(Debug, thiserror::Error)]
pub enum GetStatsError {
    #[error("user not found")]
    UserNotFound,
    #[error("internal error: {0}")]
    Internal(String),
}

#[async_trait::async_trait]
pub trait GetStatsUseCase {
    async fn get_stats(&self, user_id: UserId) -> Result<UserStats, GetStatsError>;
    async fn get_stats_by_name(&self, name: &str) -> Result<UserStats, GetStatsError>;
}

pub struct GetStatsUseCaseImpl<U: UserRepository, S: StatsRepository> {
    user_repository: Arc<U>,
    stats_repository: Arc<S>,
}

impl<U: UserRepository, S: StatsRepository> GetStatsUseCaseImpl<U, S> {
    pub fn new(user_repository: Arc<U>, stats_repository: Arc<S>) -> Self {
        Self {
            user_repository,
            stats_repository,
        }
    }
}

#[async_trait::async_trait]
impl<U: UserRepository + Send + Sync + 'static, S: StatsRepository + Send + Sync + 'static>
    GetStatsUseCase for GetStatsUseCaseImpl<U, S>
{
    async fn get_stats(&self, user_id: UserId) -> Result<UserStats, GetStatsError> {
        match self.stats_repository.get_stats(user_id).await {
            Ok(stats) => Ok(stats),
            Err(RepoRetrieveError::NotFound) => Ok(UserStats::empty(user_id)),
            Err(RepoRetrieveError::StorageError(e)) => Err(GetStatsError::Internal(e)),
        }
    }

    async fn get_stats_by_name(&self, name: &str) -> Result<UserStats, GetStatsError> {
        let user = match self.user_repository.get_user_by_name(name).await {
            Ok(user) => user,
            Err(RepoRetrieveError::NotFound) => return Err(GetStatsError::UserNotFound),
            Err(RepoRetrieveError::StorageError(e)) => return Err(GetStatsError::Internal(e)),
        };
        self.get_stats(user.id).await
    }
}
