use bingo_persistence_sea_orm_entities::user_stats;
use bingo_server_app::domain::{
    RepoCreateError, RepoError, RepoRetrieveError, UserId,
    stats::{StatsRepository, UserStats},
};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, QuerySelect, Set,
};

use crate::{StatsCache, create_error};

pub struct StatsRepositoryImpl {
    db: DatabaseConnection,
    stats_cache: StatsCache,
}

impl StatsRepositoryImpl {
    pub fn new(db: DatabaseConnection, stats_cache: StatsCache) -> Self {
        Self { db, stats_cache }
    }
}

pub(crate) fn model_to_stats(model: user_stats::Model) -> UserStats {
    UserStats {
        user_id: UserId(model.user_id),
        total_matches: model.total_matches as u32,
        wins: model.wins as u32,
        losses: model.losses as u32,
        draws: model.draws as u32,
        win_streak: model.win_streak as u32,
        best_win_streak: model.best_win_streak as u32,
        last_match_at: model.last_match_at,
    }
}

pub(crate) fn stats_to_model(stats: &UserStats) -> user_stats::ActiveModel {
    user_stats::ActiveModel {
        user_id: Set(stats.user_id.0),
        total_matches: Set(stats.total_matches as i32),
        wins: Set(stats.wins as i32),
        losses: Set(stats.losses as i32),
        draws: Set(stats.draws as i32),
        win_streak: Set(stats.win_streak as i32),
        best_win_streak: Set(stats.best_win_streak as i32),
        last_match_at: Set(stats.last_match_at),
    }
}

#[async_trait::async_trait]
impl StatsRepository for StatsRepositoryImpl {
    async fn create_stats(&self, user_id: UserId) -> Result<(), RepoCreateError> {
        stats_to_model(&UserStats::empty(user_id))
            .insert(&self.db)
            .await
            .map_err(create_error)?;
        Ok(())
    }

    async fn get_stats(&self, user_id: UserId) -> Result<UserStats, RepoRetrieveError> {
        if let Some(cached) = self.stats_cache.get(&user_id) {
            return Ok(cached);
        }
        let stats = user_stats::Entity::find_by_id(user_id.0)
            .one(&self.db)
            .await
            .map_err(|e| RepoRetrieveError::StorageError(e.to_string()))?
            .map(model_to_stats)
            .ok_or(RepoRetrieveError::NotFound)?;
        self.stats_cache.insert(user_id, stats.clone());
        Ok(stats)
    }

    async fn get_leaderboard(&self, limit: usize) -> Result<Vec<UserStats>, RepoError> {
        let models = user_stats::Entity::find()
            .order_by_desc(user_stats::Column::Wins)
            .order_by_desc(user_stats::Column::BestWinStreak)
            .order_by_asc(user_stats::Column::TotalMatches)
            .limit(limit as u64)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::StorageError(e.to_string()))?;
        Ok(models.into_iter().map(model_to_stats).collect())
    }
}
