use std::sync::Arc;

use bingo_core::{BingoAction, BingoGame, BingoSettings, DoActionError};
use chrono::Utc;

use crate::{
    domain::{
        MatchId, RepoRetrieveError, RepoUpdateError, UserId,
        r#match::{Match, MatchFinish, MatchRepository, MatchStatus, Move},
        match_lock::MatchLockService,
    },
    workflow::gameplay::load_game,
};

#[derive(Debug, thiserror::Error)]
pub enum CallNumberError {
    #[error("match not found")]
    NotFound,
    #[error("match is not in progress")]
    InvalidState,
    #[error("not your turn")]
    NotYourTurn,
    #[error("{0}")]
    InvalidNumber(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[async_trait::async_trait]
pub trait CallNumberUseCase {
    async fn call_number(
        &self,
        actor: UserId,
        match_id: MatchId,
        number: u32,
    ) -> Result<Match, CallNumberError>;
}

pub struct CallNumberUseCaseImpl<M: MatchRepository, L: MatchLockService> {
    match_repository: Arc<M>,
    match_lock_service: Arc<L>,
    settings: BingoSettings,
}

impl<M: MatchRepository, L: MatchLockService> CallNumberUseCaseImpl<M, L> {
    pub fn new(match_repository: Arc<M>, match_lock_service: Arc<L>, settings: BingoSettings) -> Self {
        Self {
            match_repository,
            match_lock_service,
            settings,
        }
    }
}

fn map_update_error(e: RepoUpdateError) -> CallNumberError {
    match e {
        RepoUpdateError::NotFound => CallNumberError::NotFound,
        RepoUpdateError::Conflict => CallNumberError::InvalidState,
        RepoUpdateError::StorageError(e) => CallNumberError::Internal(e),
    }
}

#[async_trait::async_trait]
impl<M: MatchRepository + Send + Sync + 'static, L: MatchLockService + Send + Sync + 'static>
    CallNumberUseCase for CallNumberUseCaseImpl<M, L>
{
    async fn call_number(
        &self,
        actor: UserId,
        match_id: MatchId,
        number: u32,
    ) -> Result<Match, CallNumberError> {
        let _guard = self.match_lock_service.lock(match_id).await;
        let current = match self.match_repository.get_match(match_id).await {
            Ok(m) if m.is_participant(actor) => m,
            Ok(_) | Err(RepoRetrieveError::NotFound) => return Err(CallNumberError::NotFound),
            Err(RepoRetrieveError::StorageError(e)) => return Err(CallNumberError::Internal(e)),
        };
        if current.status != MatchStatus::InProgress {
            return Err(CallNumberError::InvalidState);
        }
        if current.current_turn_user_id != Some(actor) {
            return Err(CallNumberError::NotYourTurn);
        }
        let Some(player) = current.player_of(actor) else {
            return Err(CallNumberError::NotFound);
        };

        let game = load_game(self.match_repository.as_ref(), &self.settings, &current)
            .await
            .map_err(|e| {
                log::error!("Failed to load match {}: {}", match_id, e);
                CallNumberError::Internal(e)
            })?;
        let BingoGame::Ongoing(ongoing) = game else {
            log::error!("Match {} is in progress but its moves end the game", match_id);
            return Err(CallNumberError::Internal(
                "stored moves already finish the game".to_string(),
            ));
        };

        let move_number = ongoing.called_numbers().len() as u32 + 1;
        let next = ongoing
            .do_action(player, BingoAction::Call(number))
            .map_err(|e| match e {
                DoActionError::NotYourTurn => CallNumberError::NotYourTurn,
                DoActionError::InvalidAction(_) => CallNumberError::InvalidNumber(e.to_string()),
            })?;

        let now = Utc::now();
        let mv = Move::new(match_id, move_number, actor, number, now);
        match next {
            BingoGame::Ongoing(next) => {
                let next_turn = current.user_of(next.current_player());
                self.match_repository
                    .record_move(&mv, next_turn)
                    .await
                    .map_err(map_update_error)?;
                log::debug!("User {} called {} in match {}", actor, number, match_id);
                match self.match_repository.get_match(match_id).await {
                    Ok(m) => Ok(m),
                    Err(RepoRetrieveError::NotFound) => Err(CallNumberError::NotFound),
                    Err(RepoRetrieveError::StorageError(e)) => Err(CallNumberError::Internal(e)),
                }
            }
            BingoGame::Finished(finished) => {
                let winner_user_id = finished.result().winner().map(|p| current.user_of(p));
                let ended = self
                    .match_repository
                    .finish_match(
                        match_id,
                        MatchFinish {
                            winner_user_id,
                            ended_at: now,
                            final_move: Some(mv),
                        },
                    )
                    .await
                    .map_err(map_update_error)?;
                match winner_user_id {
                    Some(winner) => log::info!("Match {} won by {}", match_id, winner),
                    None => log::info!("Match {} ended in a draw", match_id),
                }
                Ok(ended)
            }
        }
    }
}
