use axum::{
    Json,
    extract::{Path, Query, State},
};
use bingo_server_app::{
    domain::{Pagination, stats::UserStats},
    workflow::stats::leaderboard::LeaderboardEntry,
};
use chrono::{DateTime, Utc};

use crate::{AppState, error::ServiceError, http::JsonPublicProfile};

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonStats {
    total_matches: u32,
    wins: u32,
    losses: u32,
    draws: u32,
    win_streak: u32,
    best_win_streak: u32,
    last_match_at: Option<DateTime<Utc>>,
}

impl From<UserStats> for JsonStats {
    fn from(stats: UserStats) -> Self {
        JsonStats {
            total_matches: stats.total_matches,
            wins: stats.wins,
            losses: stats.losses,
            draws: stats.draws,
            win_streak: stats.win_streak,
            best_win_streak: stats.best_win_streak,
            last_match_at: stats.last_match_at,
        }
    }
}

#[derive(serde::Serialize)]
pub struct JsonLeaderboardEntry {
    rank: usize,
    user: JsonPublicProfile,
    stats: JsonStats,
}

impl From<LeaderboardEntry> for JsonLeaderboardEntry {
    fn from(entry: LeaderboardEntry) -> Self {
        JsonLeaderboardEntry {
            rank: entry.rank,
            user: entry.user.into(),
            stats: entry.stats.into(),
        }
    }
}

#[derive(serde::Deserialize)]
pub struct JsonLeaderboardFilter {
    limit: Option<usize>,
}

pub async fn get_user_stats(
    Path(name): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Json<JsonStats>, ServiceError> {
    let stats = app_state
        .app
        .stats_get_use_case
        .get_stats_by_name(&name)
        .await?;
    Ok(Json(stats.into()))
}

pub async fn get_leaderboard(
    State(app_state): State<AppState>,
    Query(filter): Query<JsonLeaderboardFilter>,
) -> Result<Json<Vec<JsonLeaderboardEntry>>, ServiceError> {
    let limit = filter.limit.unwrap_or(Pagination::MAX_LIMIT);
    let entries = app_state
        .app
        .stats_leaderboard_use_case
        .leaderboard(limit)
        .await?;
    Ok(Json(
        entries.into_iter().map(JsonLeaderboardEntry::from).collect(),
    ))
}
