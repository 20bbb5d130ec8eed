use std::sync::Arc;

use crate::{
    domain::{
        MatchId, RepoCreateError, RepoRetrieveError, UserId,
        friendship::{FriendshipRepository, Relation},
        r#match::{Match, MatchRepository, NewMatch},
        match_lock::MatchLockService,
        user::UserRepository,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum InviteError {
    #[error("opponent not found")]
    OpponentNotFound,
    #[error("cannot invite yourself")]
    SelfInvite,
    #[error("user is blocked")]
    Blocked,
    #[error("an active match with this player already exists: {0}")]
    AlreadyActive(MatchId),
    #[error("internal error: {0}")]
    Internal(String),
}

#[async_trait::async_trait]
pub trait InviteUseCase {
    async fn invite(&self, actor: UserId, opponent_name: &str) -> Result<Match, InviteError>;
}

pub struct InviteUseCaseImpl<
    U: UserRepository,
    F: FriendshipRepository,
    M: MatchRepository,
    L: MatchLockService,
> {
    user_repository: Arc<U>,
    friendship_repository: Arc<F>,
    match_repository: Arc<M>,
    match_lock_service: Arc<L>,
}

impl<U: UserRepository, F: FriendshipRepository, M: MatchRepository, L: MatchLockService>
    InviteUseCaseImpl<U, F, M, L>
{
    pub fn new(
        user_repository: Arc<U>,
        friendship_repository: Arc<F>,
        match_repository: Arc<M>,
        match_lock_service: Arc<L>,
    ) -> Self {
        Self {
            user_repository,
            friendship_repository,
            match_repository,
            match_lock_service,
        }
    }

    async fn active_match_error(&self, actor: UserId, opponent: UserId) -> InviteError {
        match self
            .match_repository
            .get_active_match_between(actor, opponent)
            .await
        {
            Ok(Some(active)) => InviteError::AlreadyActive(active.id),
            Ok(None) => InviteError::Internal("concurrent invitation".to_string()),
            Err(e) => InviteError::Internal(e.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl<
    U: UserRepository + Send + Sync + 'static,
    F: FriendshipRepository + Send + Sync + 'static,
    M: MatchRepository + Send + Sync + 'static,
    L: MatchLockService + Send + Sync + 'static,
> InviteUseCase for InviteUseCaseImpl<U, F, M, L>
{
    async fn invite(&self, actor: UserId, opponent_name: &str) -> Result<Match, InviteError> {
        let opponent = match self.user_repository.get_user_by_name(opponent_name).await {
            Ok(user) => user,
            Err(RepoRetrieveError::NotFound) => return Err(InviteError::OpponentNotFound),
            Err(RepoRetrieveError::StorageError(e)) => return Err(InviteError::Internal(e)),
        };
        if opponent.id == actor {
            return Err(InviteError::SelfInvite);
        }

        let rows = self
            .friendship_repository
            .get_friendships_between(actor, opponent.id)
            .await
            .map_err(|e| InviteError::Internal(e.to_string()))?;
        if Relation::from_rows(actor, rows).is_blocked() {
            return Err(InviteError::Blocked);
        }

        let _guard = self
            .match_lock_service
            .lock_pair(actor, opponent.id)
            .await;
        if let Some(active) = self
            .match_repository
            .get_active_match_between(actor, opponent.id)
            .await
            .map_err(|e| InviteError::Internal(e.to_string()))?
        {
            return Err(InviteError::AlreadyActive(active.id));
        }

        let created = match self
            .match_repository
            .create_match(NewMatch {
                player1_id: actor,
                player2_id: opponent.id,
            })
            .await
        {
            Ok(created) => created,
            Err(RepoCreateError::Conflict) => {
                return Err(self.active_match_error(actor, opponent.id).await);
            }
            Err(RepoCreateError::StorageError(e)) => return Err(InviteError::Internal(e)),
        };
        log::info!(
            "User {} invited {} to match {}",
            actor,
            opponent.id,
            created.id
        );
        Ok(created)
    }
}
