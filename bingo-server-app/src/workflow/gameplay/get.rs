use std::{collections::HashSet, sync::Arc};

use bingo_core::BingoSettings;

use crate::{
    domain::{
        MatchId, RepoRetrieveError, UserId,
        r#match::{MatchRepository, MatchStatus},
        user::UserRepository,
    },
    workflow::{
        account::PublicProfile,
        gameplay::{MatchView, board_for, completed_lines},
    },
};

#[derive(Debug, thiserror::Error)]
pub enum GetMatchError {
    #[error("match not found")]
    NotFound,
    #[error("internal error: {0}")]
    Internal(String),
}

#[async_trait::async_trait]
pub trait GetMatchUseCase {
    async fn get_match(&self, actor: UserId, match_id: MatchId)
    -> Result<MatchView, GetMatchError>;
}

pub struct GetMatchUseCaseImpl<U: UserRepository, M: MatchRepository> {
    user_repository: Arc<U>,
    match_repository: Arc<M>,
    settings: BingoSettings,
}

impl<U: UserRepository, M: MatchRepository> GetMatchUseCaseImpl<U, M> {
    pub fn new(user_repository: Arc<U>, match_repository: Arc<M>, settings: BingoSettings) -> Self {
        Self {
            user_repository,
            match_repository,
            settings,
        }
    }

    async fn profile(&self, user_id: UserId) -> Result<PublicProfile, GetMatchError> {
        match self.user_repository.get_user(user_id).await {
            Ok(user) => Ok(PublicProfile::from(user)),
            Err(RepoRetrieveError::NotFound) => Err(GetMatchError::Internal(format!(
                "player {} no longer exists",
                user_id
            ))),
            Err(RepoRetrieveError::StorageError(e)) => Err(GetMatchError::Internal(e)),
        }
    }
}

#[async_trait::async_trait]
impl<U: UserRepository + Send + Sync + 'static, M: MatchRepository + Send + Sync + 'static>
    GetMatchUseCase for GetMatchUseCaseImpl<U, M>
{
    async fn get_match(
        &self,
        actor: UserId,
        match_id: MatchId,
    ) -> Result<MatchView, GetMatchError> {
        let summary = match self.match_repository.get_match(match_id).await {
            Ok(m) if m.is_participant(actor) => m,
            Ok(_) | Err(RepoRetrieveError::NotFound) => return Err(GetMatchError::NotFound),
            Err(RepoRetrieveError::StorageError(e)) => return Err(GetMatchError::Internal(e)),
        };
        let boards = self
            .match_repository
            .get_boards(match_id)
            .await
            .map_err(|e| GetMatchError::Internal(e.to_string()))?;
        let moves = self
            .match_repository
            .get_moves(match_id)
            .await
            .map_err(|e| GetMatchError::Internal(e.to_string()))?;

        let called: HashSet<u32> = moves.iter().map(|mv| mv.number).collect();
        let p1_board = board_for(&boards, summary.player1_id);
        let p2_board = board_for(&boards, summary.player2_id);
        let player1_lines = completed_lines(&self.settings, p1_board, &called);
        let player2_lines = completed_lines(&self.settings, p2_board, &called);

        let own_board = board_for(&boards, actor).map(|b| b.numbers.clone());
        let opponent_board = match summary.opponent_of(actor) {
            Some(opponent)
                if matches!(summary.status, MatchStatus::Finished | MatchStatus::Cancelled) =>
            {
                board_for(&boards, opponent).map(|b| b.numbers.clone())
            }
            _ => None,
        };

        let player1 = self.profile(summary.player1_id).await?;
        let player2 = self.profile(summary.player2_id).await?;
        Ok(MatchView {
            summary,
            player1,
            player2,
            own_board,
            opponent_board,
            moves,
            player1_lines,
            player2_lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::{
        domain::r#match::{MatchFinish, Move},
        testing::{InMemoryStore, small_settings, started_match},
    };

    use super::*;

    #[tokio::test]
    async fn test_opponent_board_hidden_until_finished() {
        let store = Arc::new(InMemoryStore::new());
        let use_case = GetMatchUseCaseImpl::new(store.clone(), store.clone(), small_settings());
        let alice = store.add_user("alice").await;
        let bob = store.add_user("bob").await;
        let carol = store.add_user("carol").await;
        let bob_board = vec![2, 1, 3, 4, 5, 6, 7, 8, 9];
        let m = started_match(&store, &alice, &bob, ((1..=9).collect(), bob_board.clone())).await;
        for (n, (by, next), number) in [
            (1, (alice.id, bob.id), 4),
            (2, (bob.id, alice.id), 5),
            (3, (alice.id, bob.id), 6),
        ] {
            store
                .record_move(&Move::new(m.id, n, by, number, Utc::now()), next)
                .await
                .unwrap();
        }

        let view = use_case.get_match(alice.id, m.id).await.unwrap();
        assert_eq!(view.player1.name, "alice");
        assert_eq!(view.player2.name, "bob");
        assert_eq!(view.own_board, Some((1..=9).collect()));
        assert_eq!(view.opponent_board, None);
        assert_eq!(view.moves.len(), 3);
        assert_eq!((view.player1_lines, view.player2_lines), (1, 1));

        assert!(matches!(
            use_case.get_match(carol.id, m.id).await,
            Err(GetMatchError::NotFound)
        ));

        store
            .finish_match(
                m.id,
                MatchFinish {
                    winner_user_id: None,
                    ended_at: Utc::now(),
                    final_move: None,
                },
            )
            .await
            .unwrap();
        let view = use_case.get_match(alice.id, m.id).await.unwrap();
        assert_eq!(view.opponent_board, Some(bob_board));
    }
}
