use bingo_persistence_sea_orm_entities::{bingo_match, board, match_move, user_stats};
use bingo_server_app::domain::{
    BoardId, MatchId, MoveId, PaginatedResponse, RepoCreateError, RepoError, RepoRetrieveError,
    RepoUpdateError, SortOrder, UserId,
    r#match::{
        Board, Match, MatchFinish, MatchQuery, MatchRepository, MatchStatus, MatchUpdate, Move,
        NewMatch,
    },
    stats::UserStats,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionError,
    TransactionTrait,
};

use crate::{
    StatsCache, create_error,
    stats::{model_to_stats, stats_to_model},
    update_error,
};

pub struct MatchRepositoryImpl {
    db: DatabaseConnection,
    stats_cache: StatsCache,
}

fn status_strings(statuses: &[MatchStatus]) -> Vec<&'static str> {
    statuses.iter().map(|s| s.as_str()).collect()
}

impl MatchRepositoryImpl {
    /// `stats_cache` must be the cache the stats repository reads from.
    pub fn new(db: DatabaseConnection, stats_cache: StatsCache) -> Self {
        Self { db, stats_cache }
    }

    fn model_to_match(model: bingo_match::Model) -> Result<Match, String> {
        let status = MatchStatus::parse(&model.status)
            .ok_or_else(|| format!("unknown match status {}", model.status))?;
        Ok(Match {
            id: MatchId(model.id),
            player1_id: UserId(model.player1_id),
            player2_id: UserId(model.player2_id),
            status,
            current_turn_user_id: model.current_turn_user_id.map(UserId),
            winner_user_id: model.winner_user_id.map(UserId),
            created_at: model.created_at,
            started_at: model.started_at,
            ended_at: model.ended_at,
        })
    }

    fn model_to_board(model: board::Model) -> Result<Board, String> {
        let numbers: Vec<u32> = serde_json::from_value(model.numbers)
            .map_err(|e| format!("board {} has malformed numbers: {}", model.id, e))?;
        Ok(Board {
            id: BoardId(model.id),
            match_id: MatchId(model.match_id),
            user_id: UserId(model.user_id),
            numbers,
            created_at: model.created_at,
        })
    }

    fn model_to_move(model: match_move::Model) -> Move {
        Move {
            id: MoveId(model.id),
            match_id: MatchId(model.match_id),
            move_number: model.move_number as u32,
            chosen_by_user_id: UserId(model.chosen_by_user_id),
            number: model.number as u32,
            created_at: model.created_at,
        }
    }

    fn move_to_model(mv: &Move) -> match_move::ActiveModel {
        match_move::ActiveModel {
            id: Set(mv.id.0),
            match_id: Set(mv.match_id.0),
            move_number: Set(mv.move_number as i32),
            chosen_by_user_id: Set(mv.chosen_by_user_id.0),
            number: Set(mv.number as i32),
            created_at: Set(mv.created_at),
        }
    }

    async fn find_match<C: ConnectionTrait>(
        db: &C,
        match_id: MatchId,
    ) -> Result<Option<Match>, String> {
        bingo_match::Entity::find_by_id(match_id.0)
            .one(db)
            .await
            .map_err(|e| e.to_string())?
            .map(Self::model_to_match)
            .transpose()
    }

    async fn find_active_between<C: ConnectionTrait>(
        db: &C,
        user_a: UserId,
        user_b: UserId,
    ) -> Result<Option<Match>, String> {
        let pair = Condition::any()
            .add(
                Condition::all()
                    .add(bingo_match::Column::Player1Id.eq(user_a.0))
                    .add(bingo_match::Column::Player2Id.eq(user_b.0)),
            )
            .add(
                Condition::all()
                    .add(bingo_match::Column::Player1Id.eq(user_b.0))
                    .add(bingo_match::Column::Player2Id.eq(user_a.0)),
            );
        bingo_match::Entity::find()
            .filter(pair)
            .filter(bingo_match::Column::Status.is_in(status_strings(&MatchStatus::ACTIVE)))
            .one(db)
            .await
            .map_err(|e| e.to_string())?
            .map(Self::model_to_match)
            .transpose()
    }

    /// `NotFound` when the match is gone, `Conflict` when it exists but a
    /// guarded update matched no row.
    async fn missed_update<C: ConnectionTrait>(db: &C, match_id: MatchId) -> RepoUpdateError {
        match Self::find_match(db, match_id).await {
            Ok(Some(_)) => RepoUpdateError::Conflict,
            Ok(None) => RepoUpdateError::NotFound,
            Err(e) => RepoUpdateError::StorageError(e),
        }
    }
}

#[async_trait::async_trait]
impl MatchRepository for MatchRepositoryImpl {
    async fn create_match(&self, new_match: NewMatch) -> Result<Match, RepoCreateError> {
        let res = self
            .db
            .transaction::<_, Match, RepoCreateError>(|txn| {
                Box::pin(async move {
                    let active = Self::find_active_between(
                        txn,
                        new_match.player1_id,
                        new_match.player2_id,
                    )
                    .await
                    .map_err(RepoCreateError::StorageError)?;
                    if active.is_some() {
                        return Err(RepoCreateError::Conflict);
                    }
                    let model = bingo_match::ActiveModel {
                        id: Set(MatchId::new().0),
                        player1_id: Set(new_match.player1_id.0),
                        player2_id: Set(new_match.player2_id.0),
                        status: Set(MatchStatus::Invited.as_str().to_string()),
                        current_turn_user_id: Set(None),
                        winner_user_id: Set(None),
                        created_at: Set(Utc::now()),
                        started_at: Set(None),
                        ended_at: Set(None),
                    }
                    .insert(txn)
                    .await
                    .map_err(create_error)?;
                    Self::model_to_match(model).map_err(RepoCreateError::StorageError)
                })
            })
            .await;

        match res {
            Ok(m) => Ok(m),
            Err(TransactionError::Transaction(e)) => Err(e),
            Err(TransactionError::Connection(e)) => {
                Err(RepoCreateError::StorageError(e.to_string()))
            }
        }
    }

    async fn get_match(&self, match_id: MatchId) -> Result<Match, RepoRetrieveError> {
        Self::find_match(&self.db, match_id)
            .await
            .map_err(RepoRetrieveError::StorageError)?
            .ok_or(RepoRetrieveError::NotFound)
    }

    async fn query_matches(
        &self,
        query: MatchQuery,
    ) -> Result<PaginatedResponse<Match>, RepoError> {
        let mut condition = Condition::all().add(
            Condition::any()
                .add(bingo_match::Column::Player1Id.eq(query.user_id.0))
                .add(bingo_match::Column::Player2Id.eq(query.user_id.0)),
        );
        if let Some(statuses) = &query.statuses {
            condition = condition.add(bingo_match::Column::Status.is_in(status_strings(statuses)));
        }
        let db_query = bingo_match::Entity::find().filter(condition);

        let total_count = db_query
            .clone()
            .count(&self.db)
            .await
            .map_err(|e| RepoError::StorageError(e.to_string()))?;

        let db_query = match query.order {
            SortOrder::Ascending => db_query.order_by_asc(bingo_match::Column::CreatedAt),
            SortOrder::Descending => db_query.order_by_desc(bingo_match::Column::CreatedAt),
        };
        let models = db_query
            .offset(query.pagination.offset() as u64)
            .limit(query.pagination.limit() as u64)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::StorageError(e.to_string()))?;

        let items = models
            .into_iter()
            .map(Self::model_to_match)
            .collect::<Result<Vec<_>, _>>()
            .map_err(RepoError::StorageError)?;
        Ok(PaginatedResponse {
            items,
            total_count: total_count as usize,
        })
    }

    async fn get_active_match_between(
        &self,
        user_a: UserId,
        user_b: UserId,
    ) -> Result<Option<Match>, RepoError> {
        Self::find_active_between(&self.db, user_a, user_b)
            .await
            .map_err(RepoError::StorageError)
    }

    async fn update_match_status(
        &self,
        match_id: MatchId,
        expected: MatchStatus,
        update: MatchUpdate,
    ) -> Result<Match, RepoUpdateError> {
        let mut changes = bingo_match::ActiveModel {
            status: Set(update.status.as_str().to_string()),
            current_turn_user_id: Set(update.current_turn_user_id.map(|u| u.0)),
            ..Default::default()
        };
        if let Some(started_at) = update.started_at {
            changes.started_at = Set(Some(started_at));
        }
        if let Some(ended_at) = update.ended_at {
            changes.ended_at = Set(Some(ended_at));
        }

        let result = bingo_match::Entity::update_many()
            .set(changes)
            .filter(bingo_match::Column::Id.eq(match_id.0))
            .filter(bingo_match::Column::Status.eq(expected.as_str()))
            .exec(&self.db)
            .await
            .map_err(update_error)?;
        if result.rows_affected == 0 {
            return Err(Self::missed_update(&self.db, match_id).await);
        }

        Self::find_match(&self.db, match_id)
            .await
            .map_err(RepoUpdateError::StorageError)?
            .ok_or(RepoUpdateError::NotFound)
    }

    async fn save_board(&self, b: &Board) -> Result<(), RepoCreateError> {
        let numbers = serde_json::to_value(&b.numbers)
            .map_err(|e| RepoCreateError::StorageError(e.to_string()))?;
        board::ActiveModel {
            id: Set(b.id.0),
            match_id: Set(b.match_id.0),
            user_id: Set(b.user_id.0),
            numbers: Set(numbers),
            created_at: Set(b.created_at),
        }
        .insert(&self.db)
        .await
        .map_err(create_error)?;
        Ok(())
    }

    async fn get_boards(&self, match_id: MatchId) -> Result<Vec<Board>, RepoError> {
        board::Entity::find()
            .filter(board::Column::MatchId.eq(match_id.0))
            .order_by_asc(board::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::StorageError(e.to_string()))?
            .into_iter()
            .map(Self::model_to_board)
            .collect::<Result<Vec<_>, _>>()
            .map_err(RepoError::StorageError)
    }

    async fn get_moves(&self, match_id: MatchId) -> Result<Vec<Move>, RepoError> {
        let models = match_move::Entity::find()
            .filter(match_move::Column::MatchId.eq(match_id.0))
            .order_by_asc(match_move::Column::MoveNumber)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::StorageError(e.to_string()))?;
        Ok(models.into_iter().map(Self::model_to_move).collect())
    }

    async fn record_move(&self, mv: &Move, next_turn: UserId) -> Result<(), RepoUpdateError> {
        let mv = mv.clone();
        let res = self
            .db
            .transaction::<_, (), RepoUpdateError>(|txn| {
                Box::pin(async move {
                    let result = bingo_match::Entity::update_many()
                        .set(bingo_match::ActiveModel {
                            current_turn_user_id: Set(Some(next_turn.0)),
                            ..Default::default()
                        })
                        .filter(bingo_match::Column::Id.eq(mv.match_id.0))
                        .filter(bingo_match::Column::Status.eq(MatchStatus::InProgress.as_str()))
                        .filter(bingo_match::Column::CurrentTurnUserId.eq(mv.chosen_by_user_id.0))
                        .exec(txn)
                        .await
                        .map_err(update_error)?;
                    if result.rows_affected == 0 {
                        return Err(Self::missed_update(txn, mv.match_id).await);
                    }
                    Self::move_to_model(&mv)
                        .insert(txn)
                        .await
                        .map_err(update_error)?;
                    Ok(())
                })
            })
            .await;

        match res {
            Ok(()) => Ok(()),
            Err(TransactionError::Transaction(e)) => Err(e),
            Err(TransactionError::Connection(e)) => {
                Err(RepoUpdateError::StorageError(e.to_string()))
            }
        }
    }

    async fn finish_match(
        &self,
        match_id: MatchId,
        finish: MatchFinish,
    ) -> Result<Match, RepoUpdateError> {
        let res = self
            .db
            .transaction::<_, Match, RepoUpdateError>(|txn| {
                Box::pin(async move {
                    if let Some(mv) = &finish.final_move {
                        Self::move_to_model(mv)
                            .insert(txn)
                            .await
                            .map_err(update_error)?;
                    }

                    let mut update = bingo_match::Entity::update_many()
                        .set(bingo_match::ActiveModel {
                            status: Set(MatchStatus::Finished.as_str().to_string()),
                            current_turn_user_id: Set(None),
                            winner_user_id: Set(finish.winner_user_id.map(|u| u.0)),
                            ended_at: Set(Some(finish.ended_at)),
                            ..Default::default()
                        })
                        .filter(bingo_match::Column::Id.eq(match_id.0))
                        .filter(bingo_match::Column::Status.eq(MatchStatus::InProgress.as_str()));
                    // a resignation may come out of turn, a final call may not
                    if let Some(mv) = &finish.final_move {
                        update = update.filter(
                            bingo_match::Column::CurrentTurnUserId.eq(mv.chosen_by_user_id.0),
                        );
                    }
                    let result = update
                        .exec(txn)
                        .await
                        .map_err(update_error)?;
                    if result.rows_affected == 0 {
                        return Err(Self::missed_update(txn, match_id).await);
                    }

                    let finished = Self::find_match(txn, match_id)
                        .await
                        .map_err(RepoUpdateError::StorageError)?
                        .ok_or(RepoUpdateError::NotFound)?;

                    for user_id in [finished.player1_id, finished.player2_id] {
                        let existing = user_stats::Entity::find_by_id(user_id.0)
                            .one(txn)
                            .await
                            .map_err(|e| RepoUpdateError::StorageError(e.to_string()))?;
                        let is_new = existing.is_none();
                        let mut stats = existing
                            .map(model_to_stats)
                            .unwrap_or_else(|| UserStats::empty(user_id));
                        stats.record(finish.outcome_for(user_id), finish.ended_at);

                        let model = stats_to_model(&stats);
                        if is_new {
                            model.insert(txn).await.map_err(update_error)?;
                        } else {
                            model.update(txn).await.map_err(update_error)?;
                        }
                    }
                    Ok(finished)
                })
            })
            .await;

        match res {
            Ok(finished) => {
                log::debug!("Match {} finished, stats updated", finished.id);
                self.stats_cache.invalidate(&finished.player1_id);
                self.stats_cache.invalidate(&finished.player2_id);
                Ok(finished)
            }
            Err(TransactionError::Transaction(e)) => Err(e),
            Err(TransactionError::Connection(e)) => {
                Err(RepoUpdateError::StorageError(e.to_string()))
            }
        }
    }

    async fn list_stale_matches(
        &self,
        setup_cutoff: DateTime<Utc>,
        play_cutoff: DateTime<Utc>,
    ) -> Result<Vec<Match>, RepoError> {
        let setup_statuses = [MatchStatus::Invited, MatchStatus::BoardSetup];
        let mut stale = bingo_match::Entity::find()
            .filter(bingo_match::Column::Status.is_in(status_strings(&setup_statuses)))
            .filter(bingo_match::Column::CreatedAt.lt(setup_cutoff))
            .all(&self.db)
            .await
            .map_err(|e| RepoError::StorageError(e.to_string()))?;

        let playing = bingo_match::Entity::find()
            .filter(bingo_match::Column::Status.eq(MatchStatus::InProgress.as_str()))
            .all(&self.db)
            .await
            .map_err(|e| RepoError::StorageError(e.to_string()))?;
        for model in playing {
            let last_move = match_move::Entity::find()
                .filter(match_move::Column::MatchId.eq(model.id))
                .order_by_desc(match_move::Column::MoveNumber)
                .one(&self.db)
                .await
                .map_err(|e| RepoError::StorageError(e.to_string()))?;
            let last_activity = last_move
                .map(|mv| mv.created_at)
                .or(model.started_at)
                .unwrap_or(model.created_at);
            if last_activity < play_cutoff {
                stale.push(model);
            }
        }

        stale
            .into_iter()
            .map(Self::model_to_match)
            .collect::<Result<Vec<_>, _>>()
            .map_err(RepoError::StorageError)
    }
}
