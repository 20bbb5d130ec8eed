use std::sync::Arc;

use bingo_core::{BingoGame, BingoSettings};
use chrono::Utc;

use crate::{
    domain::{
        MatchId, RepoRetrieveError, RepoUpdateError, UserId,
        r#match::{Match, MatchFinish, MatchRepository, MatchStatus},
        match_lock::MatchLockService,
    },
    workflow::gameplay::load_game,
};

#[derive(Debug, thiserror::Error)]
pub enum ResignError {
    #[error("match not found")]
    NotFound,
    #[error("match is not in progress")]
    InvalidState,
    #[error("internal error: {0}")]
    Internal(String),
}

#[async_trait::async_trait]
pub trait ResignUseCase {
    async fn resign(&self, actor: UserId, match_id: MatchId) -> Result<Match, ResignError>;
}

pub struct ResignUseCaseImpl<M: MatchRepository, L: MatchLockService> {
    match_repository: Arc<M>,
    match_lock_service: Arc<L>,
    settings: BingoSettings,
}

impl<M: MatchRepository, L: MatchLockService> ResignUseCaseImpl<M, L> {
    pub fn new(match_repository: Arc<M>, match_lock_service: Arc<L>, settings: BingoSettings) -> Self {
        Self {
            match_repository,
            match_lock_service,
            settings,
        }
    }
}

#[async_trait::async_trait]
impl<M: MatchRepository + Send + Sync + 'static, L: MatchLockService + Send + Sync + 'static>
    ResignUseCase for ResignUseCaseImpl<M, L>
{
    async fn resign(&self, actor: UserId, match_id: MatchId) -> Result<Match, ResignError> {
        let _guard = self.match_lock_service.lock(match_id).await;
        let current = match self.match_repository.get_match(match_id).await {
            Ok(m) if m.is_participant(actor) => m,
            Ok(_) | Err(RepoRetrieveError::NotFound) => return Err(ResignError::NotFound),
            Err(RepoRetrieveError::StorageError(e)) => return Err(ResignError::Internal(e)),
        };
        if current.status != MatchStatus::InProgress {
            return Err(ResignError::InvalidState);
        }
        let Some(player) = current.player_of(actor) else {
            return Err(ResignError::NotFound);
        };

        let game = load_game(self.match_repository.as_ref(), &self.settings, &current)
            .await
            .map_err(|e| {
                log::error!("Failed to load match {}: {}", match_id, e);
                ResignError::Internal(e)
            })?;
        let BingoGame::Ongoing(ongoing) = game else {
            return Err(ResignError::InvalidState);
        };
        let finished = ongoing.resign(player);
        let winner_user_id = finished.result().winner().map(|p| current.user_of(p));

        let ended = self
            .match_repository
            .finish_match(
                match_id,
                MatchFinish {
                    winner_user_id,
                    ended_at: Utc::now(),
                    final_move: None,
                },
            )
            .await
            .map_err(|e| match e {
                RepoUpdateError::NotFound => ResignError::NotFound,
                RepoUpdateError::Conflict => ResignError::InvalidState,
                RepoUpdateError::StorageError(e) => ResignError::Internal(e),
            })?;
        log::info!("User {} resigned match {}", actor, match_id);
        Ok(ended)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::{match_lock::MatchLockServiceImpl, stats::StatsRepository},
        testing::{InMemoryStore, small_settings, started_match},
    };

    use super::*;

    #[tokio::test]
    async fn test_resign_out_of_turn() {
        let store = Arc::new(InMemoryStore::new());
        let use_case = ResignUseCaseImpl::new(
            store.clone(),
            Arc::new(MatchLockServiceImpl::new()),
            small_settings(),
        );
        let alice = store.add_user("alice").await;
        let bob = store.add_user("bob").await;
        let m = started_match(&store, &alice, &bob, ((1..=9).collect(), (1..=9).collect())).await;

        // alice is to move; bob may still resign
        let ended = use_case.resign(bob.id, m.id).await.unwrap();
        assert_eq!(ended.status, MatchStatus::Finished);
        assert_eq!(ended.winner_user_id, Some(alice.id));
        assert_eq!(store.get_stats(alice.id).await.unwrap().wins, 1);
        assert_eq!(store.get_stats(bob.id).await.unwrap().losses, 1);

        assert!(matches!(
            use_case.resign(alice.id, m.id).await,
            Err(ResignError::InvalidState)
        ));
    }
}
