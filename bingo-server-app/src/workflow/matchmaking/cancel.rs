use std::sync::Arc;

use chrono::Utc;

use crate::domain::{
    MatchId, RepoRetrieveError, RepoUpdateError, UserId,
    r#match::{Match, MatchRepository, MatchStatus, MatchUpdate},
    match_lock::MatchLockService,
};

#[derive(Debug, thiserror::Error)]
pub enum CancelMatchError {
    #[error("match not found")]
    NotFound,
    #[error("match can no longer be cancelled")]
    InvalidState,
    #[error("internal error: {0}")]
    Internal(String),
}

#[async_trait::async_trait]
pub trait CancelMatchUseCase {
    /// Either player may cancel before the first call.
    async fn cancel(&self, actor: UserId, match_id: MatchId) -> Result<Match, CancelMatchError>;
}

pub struct CancelMatchUseCaseImpl<M: MatchRepository, L: MatchLockService> {
    match_repository: Arc<M>,
    match_lock_service: Arc<L>,
}

impl<M: MatchRepository, L: MatchLockService> CancelMatchUseCaseImpl<M, L> {
    pub fn new(match_repository: Arc<M>, match_lock_service: Arc<L>) -> Self {
        Self {
            match_repository,
            match_lock_service,
        }
    }
}

#[async_trait::async_trait]
impl<M: MatchRepository + Send + Sync + 'static, L: MatchLockService + Send + Sync + 'static>
    CancelMatchUseCase for CancelMatchUseCaseImpl<M, L>
{
    async fn cancel(&self, actor: UserId, match_id: MatchId) -> Result<Match, CancelMatchError> {
        let _guard = self.match_lock_service.lock(match_id).await;
        let current = match self.match_repository.get_match(match_id).await {
            Ok(m) if m.is_participant(actor) => m,
            Ok(_) | Err(RepoRetrieveError::NotFound) => return Err(CancelMatchError::NotFound),
            Err(RepoRetrieveError::StorageError(e)) => return Err(CancelMatchError::Internal(e)),
        };
        if !matches!(
            current.status,
            MatchStatus::Invited | MatchStatus::BoardSetup
        ) {
            return Err(CancelMatchError::InvalidState);
        }

        let cancelled = self
            .match_repository
            .update_match_status(
                match_id,
                current.status,
                MatchUpdate {
                    status: MatchStatus::Cancelled,
                    current_turn_user_id: None,
                    started_at: None,
                    ended_at: Some(Utc::now()),
                },
            )
            .await
            .map_err(|e| match e {
                RepoUpdateError::NotFound => CancelMatchError::NotFound,
                RepoUpdateError::Conflict => CancelMatchError::InvalidState,
                RepoUpdateError::StorageError(e) => CancelMatchError::Internal(e),
            })?;
        log::info!("User {} cancelled match {}", actor, match_id);
        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::{match_lock::MatchLockServiceImpl, r#match::NewMatch},
        testing::InMemoryStore,
    };

    use super::*;

    #[tokio::test]
    async fn test_cancel_before_play() {
        let store = Arc::new(InMemoryStore::new());
        let use_case =
            CancelMatchUseCaseImpl::new(store.clone(), Arc::new(MatchLockServiceImpl::new()));
        let alice = store.add_user("alice").await;
        let bob = store.add_user("bob").await;
        let carol = store.add_user("carol").await;
        let invited = store
            .create_match(NewMatch {
                player1_id: alice.id,
                player2_id: bob.id,
            })
            .await
            .unwrap();

        assert!(matches!(
            use_case.cancel(carol.id, invited.id).await,
            Err(CancelMatchError::NotFound)
        ));
        let cancelled = use_case.cancel(bob.id, invited.id).await.unwrap();
        assert_eq!(cancelled.status, MatchStatus::Cancelled);
        assert!(cancelled.ended_at.is_some());
        assert!(matches!(
            use_case.cancel(alice.id, invited.id).await,
            Err(CancelMatchError::InvalidState)
        ));
    }

    #[tokio::test]
    async fn test_cannot_cancel_in_progress() {
        let store = Arc::new(InMemoryStore::new());
        let use_case =
            CancelMatchUseCaseImpl::new(store.clone(), Arc::new(MatchLockServiceImpl::new()));
        let alice = store.add_user("alice").await;
        let bob = store.add_user("bob").await;
        let m = store
            .create_match(NewMatch {
                player1_id: alice.id,
                player2_id: bob.id,
            })
            .await
            .unwrap();
        for (expected, status) in [
            (MatchStatus::Invited, MatchStatus::BoardSetup),
            (MatchStatus::BoardSetup, MatchStatus::InProgress),
        ] {
            store
                .update_match_status(
                    m.id,
                    expected,
                    MatchUpdate {
                        status,
                        current_turn_user_id: Some(alice.id),
                        started_at: Some(Utc::now()),
                        ended_at: None,
                    },
                )
                .await
                .unwrap();
        }

        assert!(matches!(
            use_case.cancel(alice.id, m.id).await,
            Err(CancelMatchError::InvalidState)
        ));
    }
}
