use std::sync::Arc;

use crate::domain::{
    MatchId, RepoRetrieveError, RepoUpdateError, UserId,
    r#match::{Match, MatchRepository, MatchStatus, MatchUpdate},
    match_lock::MatchLockService,
};

#[derive(Debug, thiserror::Error)]
pub enum AcceptInviteError {
    #[error("match not found")]
    NotFound,
    #[error("only the invited player can accept")]
    NotInvitee,
    #[error("match is not awaiting acceptance")]
    InvalidState,
    #[error("internal error: {0}")]
    Internal(String),
}

#[async_trait::async_trait]
pub trait AcceptInviteUseCase {
    async fn accept_invite(
        &self,
        actor: UserId,
        match_id: MatchId,
    ) -> Result<Match, AcceptInviteError>;
}

pub struct AcceptInviteUseCaseImpl<M: MatchRepository, L: MatchLockService> {
    match_repository: Arc<M>,
    match_lock_service: Arc<L>,
}

impl<M: MatchRepository, L: MatchLockService> AcceptInviteUseCaseImpl<M, L> {
    pub fn new(match_repository: Arc<M>, match_lock_service: Arc<L>) -> Self {
        Self {
            match_repository,
            match_lock_service,
        }
    }
}

#[async_trait::async_trait]
impl<M: MatchRepository + Send + Sync + 'static, L: MatchLockService + Send + Sync + 'static>
    AcceptInviteUseCase for AcceptInviteUseCaseImpl<M, L>
{
    async fn accept_invite(
        &self,
        actor: UserId,
        match_id: MatchId,
    ) -> Result<Match, AcceptInviteError> {
        let _guard = self.match_lock_service.lock(match_id).await;
        let current = match self.match_repository.get_match(match_id).await {
            Ok(m) => m,
            Err(RepoRetrieveError::NotFound) => return Err(AcceptInviteError::NotFound),
            Err(RepoRetrieveError::StorageError(e)) => {
                return Err(AcceptInviteError::Internal(e));
            }
        };
        if !current.is_participant(actor) {
            return Err(AcceptInviteError::NotFound);
        }
        if current.player2_id != actor {
            return Err(AcceptInviteError::NotInvitee);
        }
        if !current.status.can_transition_to(MatchStatus::BoardSetup) {
            return Err(AcceptInviteError::InvalidState);
        }

        let updated = self
            .match_repository
            .update_match_status(
                match_id,
                MatchStatus::Invited,
                MatchUpdate {
                    status: MatchStatus::BoardSetup,
                    current_turn_user_id: None,
                    started_at: None,
                    ended_at: None,
                },
            )
            .await
            .map_err(|e| match e {
                RepoUpdateError::NotFound => AcceptInviteError::NotFound,
                RepoUpdateError::Conflict => AcceptInviteError::InvalidState,
                RepoUpdateError::StorageError(e) => AcceptInviteError::Internal(e),
            })?;
        log::info!("User {} accepted match {}", actor, match_id);
        Ok(updated)
    }
}
