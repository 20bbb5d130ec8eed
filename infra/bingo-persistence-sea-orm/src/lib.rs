use std::{sync::Arc, time::Duration};

use async_lock::OnceCell;
use bingo_persistence_sea_orm_entities::{
    bingo_match, board, email_otp, friendship, match_move, session, user, user_stats,
};
use bingo_server_app::domain::{
    RepoCreateError, RepoUpdateError, UserId, stats::UserStats, user::User,
};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema, SqlErr,
    sea_query::Index,
};

pub mod friendships;
pub mod matches;
pub mod otps;
pub mod sessions;
pub mod stats;
pub mod users;

static DB_POOL: OnceCell<DatabaseConnection> = OnceCell::new();

pub type UserCache = Arc<moka::sync::Cache<UserId, User>>;
pub type StatsCache = Arc<moka::sync::Cache<UserId, UserStats>>;

pub fn user_cache() -> UserCache {
    Arc::new(
        moka::sync::Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(60 * 60))
            .build(),
    )
}

pub fn stats_cache() -> StatsCache {
    Arc::new(
        moka::sync::Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(60 * 60))
            .build(),
    )
}

pub async fn connect(url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(url);
    opt.max_connections(max_connections).sqlx_logging(false);
    Database::connect(opt).await
}

/// Process-wide pool for `DATABASE_URL`.
pub async fn create_db_pool() -> Result<DatabaseConnection, DbErr> {
    DB_POOL
        .get_or_try_init(|| async move {
            let db_url = std::env::var("DATABASE_URL")
                .map_err(|_| DbErr::Custom("DATABASE_URL must be set".to_string()))?;
            connect(&db_url, 5).await
        })
        .await
        .cloned()
}

/// Creates every table and compound unique index that does not exist yet.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    // referenced tables first
    let mut tables = [
        schema.create_table_from_entity(user::Entity),
        schema.create_table_from_entity(session::Entity),
        schema.create_table_from_entity(email_otp::Entity),
        schema.create_table_from_entity(friendship::Entity),
        schema.create_table_from_entity(bingo_match::Entity),
        schema.create_table_from_entity(board::Entity),
        schema.create_table_from_entity(match_move::Entity),
        schema.create_table_from_entity(user_stats::Entity),
    ];
    for table in tables.iter_mut() {
        table.if_not_exists();
        db.execute(&*table).await?;
    }

    let indexes = [
        Index::create()
            .name("idx_friendships_requester_addressee")
            .table(friendship::Entity)
            .col(friendship::Column::RequesterId)
            .col(friendship::Column::AddresseeId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_boards_match_user")
            .table(board::Entity)
            .col(board::Column::MatchId)
            .col(board::Column::UserId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_moves_match_move_number")
            .table(match_move::Entity)
            .col(match_move::Column::MatchId)
            .col(match_move::Column::MoveNumber)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_moves_match_number")
            .table(match_move::Entity)
            .col(match_move::Column::MatchId)
            .col(match_move::Column::Number)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_sessions_user")
            .table(session::Entity)
            .col(session::Column::UserId)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_email_otps_user_purpose")
            .table(email_otp::Entity)
            .col(email_otp::Column::UserId)
            .col(email_otp::Column::Purpose)
            .if_not_exists()
            .to_owned(),
    ];
    for index in &indexes {
        db.execute(index).await?;
    }
    log::info!("Database schema is up to date");
    Ok(())
}

fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub(crate) fn create_error(e: DbErr) -> RepoCreateError {
    if is_unique_violation(&e) {
        return RepoCreateError::Conflict;
    }
    RepoCreateError::StorageError(e.to_string())
}

pub(crate) fn update_error(e: DbErr) -> RepoUpdateError {
    if is_unique_violation(&e) {
        return RepoUpdateError::Conflict;
    }
    RepoUpdateError::StorageError(e.to_string())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_schema_is_idempotent() {
        let db = test_support::memory_db().await;
        create_schema(&db).await.unwrap();
    }
}
