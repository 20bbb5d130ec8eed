use std::sync::Arc;

use bingo_core::{BingoBoard, BingoSettings, InvalidBoardReason};
use chrono::Utc;

use crate::domain::{
    MatchId, RepoCreateError, RepoRetrieveError, RepoUpdateError, UserId,
    r#match::{Board, Match, MatchRepository, MatchStatus, MatchUpdate},
    match_lock::MatchLockService,
};

#[derive(Debug, thiserror::Error)]
pub enum SubmitBoardError {
    #[error("match not found")]
    NotFound,
    #[error("boards can only be submitted during setup")]
    InvalidState,
    #[error("invalid board: {0}")]
    InvalidBoard(InvalidBoardReason),
    #[error("board already submitted")]
    AlreadySubmitted,
    #[error("internal error: {0}")]
    Internal(String),
}

#[async_trait::async_trait]
pub trait SubmitBoardUseCase {
    /// Deals a random board when `numbers` is `None`. Starts the match once
    /// both players have a board.
    async fn submit_board(
        &self,
        actor: UserId,
        match_id: MatchId,
        numbers: Option<Vec<u32>>,
    ) -> Result<Match, SubmitBoardError>;
}

pub struct SubmitBoardUseCaseImpl<M: MatchRepository, L: MatchLockService> {
    match_repository: Arc<M>,
    match_lock_service: Arc<L>,
    settings: BingoSettings,
}

impl<M: MatchRepository, L: MatchLockService> SubmitBoardUseCaseImpl<M, L> {
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
    SubmitBoardUseCase for SubmitBoardUseCaseImpl<M, L>
{
    async fn submit_board(
        &self,
        actor: UserId,
        match_id: MatchId,
        numbers: Option<Vec<u32>>,
    ) -> Result<Match, SubmitBoardError> {
        let board = match numbers {
            Some(numbers) => BingoBoard::for_settings(&self.settings, numbers)
                .map_err(SubmitBoardError::InvalidBoard)?,
            None => BingoBoard::random(self.settings.board_size),
        };

        let _guard = self.match_lock_service.lock(match_id).await;
        let current = match self.match_repository.get_match(match_id).await {
            Ok(m) if m.is_participant(actor) => m,
            Ok(_) | Err(RepoRetrieveError::NotFound) => return Err(SubmitBoardError::NotFound),
            Err(RepoRetrieveError::StorageError(e)) => return Err(SubmitBoardError::Internal(e)),
        };
        if current.status != MatchStatus::BoardSetup {
            return Err(SubmitBoardError::InvalidState);
        }

        let now = Utc::now();
        let saved = match self
            .match_repository
            .save_board(&Board::new(match_id, actor, board.into_numbers(), now))
            .await
        {
            Ok(()) => {
                log::debug!("User {} submitted a board for match {}", actor, match_id);
                true
            }
            Err(RepoCreateError::Conflict) => false,
            Err(RepoCreateError::StorageError(e)) => return Err(SubmitBoardError::Internal(e)),
        };

        let boards = self
            .match_repository
            .get_boards(match_id)
            .await
            .map_err(|e| SubmitBoardError::Internal(e.to_string()))?;
        if boards.len() < 2 {
            return if saved {
                Ok(current)
            } else {
                Err(SubmitBoardError::AlreadySubmitted)
            };
        }
        if !saved {
            // both boards are in but an earlier start did not go through
            log::warn!("Resuming start of match {}", match_id);
        }

        let starter = if rand::random::<bool>() {
            current.player1_id
        } else {
            current.player2_id
        };
        let started = self
            .match_repository
            .update_match_status(
                match_id,
                MatchStatus::BoardSetup,
                MatchUpdate {
                    status: MatchStatus::InProgress,
                    current_turn_user_id: Some(starter),
                    started_at: Some(now),
                    ended_at: None,
                },
            )
            .await
            .map_err(|e| match e {
                RepoUpdateError::NotFound => SubmitBoardError::NotFound,
                RepoUpdateError::Conflict => SubmitBoardError::InvalidState,
                RepoUpdateError::StorageError(e) => SubmitBoardError::Internal(e),
            })?;
        log::info!("Match {} started, {} calls first", match_id, starter);
        Ok(started)
    }
}
