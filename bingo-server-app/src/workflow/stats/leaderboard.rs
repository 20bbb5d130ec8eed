use std::sync::Arc;

use crate::{
    domain::{
        Pagination, RepoRetrieveError,
        stats::{StatsRepository, UserStats},
        user::UserRepository,
    },
    workflow::account::PublicProfile,
};

#[derive(Debug, thiserror::Error)]
pub enum LeaderboardError {
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Debug)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user: PublicProfile,
    pub stats: UserStats,
}

#[async_trait::async_trait]
pub trait LeaderboardUseCase {
    /// Ordered by wins, then best win streak.
    async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, LeaderboardError>;
}

pub struct LeaderboardUseCaseImpl<U: UserRepository, S: StatsRepository> {
    user_repository: Arc<U>,
    stats_repository: Arc<S>,
}

impl<U: UserRepository, S: StatsRepository> LeaderboardUseCaseImpl<U, S> {
    pub fn new(user_repository: Arc<U>, stats_repository: Arc<S>) -> Self {
        Self {
            user_repository,
            stats_repository,
        }
    }
}

#[async_trait::async_trait]
impl<U: UserRepository + Send + Sync + 'static, S: StatsRepository + Send + Sync + 'static>
    LeaderboardUseCase for LeaderboardUseCaseImpl<U, S>
{
    async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let rows = self
            .stats_repository
            .get_leaderboard(limit.clamp(1, Pagination::MAX_LIMIT))
            .await
            .map_err(|e| LeaderboardError::Internal(e.to_string()))?;

        let mut entries = Vec::with_capacity(rows.len());
        for stats in rows {
            let user = match self.user_repository.get_user(stats.user_id).await {
                Ok(user) => user,
                Err(RepoRetrieveError::NotFound) => {
                    log::warn!("Stats row for missing user {}", stats.user_id);
                    continue;
                }
                Err(RepoRetrieveError::StorageError(e)) => {
                    return Err(LeaderboardError::Internal(e));
                }
            };
            entries.push(LeaderboardEntry {
                rank: entries.len() + 1,
                user: PublicProfile::from(user),
                stats,
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::{
        domain::r#match::{MatchFinish, MatchRepository},
        testing::{InMemoryStore, started_match},
    };

    use super::*;

    #[tokio::test]
    async fn test_leaderboard_order() {
        let store = Arc::new(InMemoryStore::new());
        let use_case = LeaderboardUseCaseImpl::new(store.clone(), store.clone());
        let alice = store.add_user("alice").await;
        let bob = store.add_user("bob").await;
        let carol = store.add_user("carol").await;
        for user in [&alice, &bob, &carol] {
            store.create_stats(user.id).await.unwrap();
        }

        for (p1, p2, winner) in [(&alice, &bob, &bob), (&bob, &carol, &bob), (&alice, &carol, &carol)]
        {
            let m = started_match(&store, p1, p2, ((1..=9).collect(), (1..=9).collect())).await;
            store
                .finish_match(
                    m.id,
                    MatchFinish {
                        winner_user_id: Some(winner.id),
                        ended_at: Utc::now(),
                        final_move: None,
                    },
                )
                .await
                .unwrap();
        }

        let board = use_case.leaderboard(10).await.unwrap();
        let names: Vec<_> = board.iter().map(|e| e.user.name.as_str()).collect();
        assert_eq!(names, vec!["bob", "carol", "alice"]);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].stats.wins, 2);

        assert_eq!(use_case.leaderboard(1).await.unwrap().len(), 1);
    }
}
