use bingo_server_app::{
    domain::{
        MatchId, SortOrder,
        r#match::{Match, MatchStatus},
    },
    workflow::account::PublicProfile,
};
use chrono::{DateTime, Utc};

use crate::error::ServiceError;

pub mod account;
pub mod friends;
pub mod matches;
pub mod stats;

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    items: Vec<T>,
    total: usize,
    offset: usize,
    limit: usize,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonPublicProfile {
    id: String,
    name: String,
    display_name: Option<String>,
    image: Option<String>,
    avatar_url: Option<String>,
    created_at: DateTime<Utc>,
    last_online_at: Option<DateTime<Utc>>,
}

impl From<PublicProfile> for JsonPublicProfile {
    fn from(profile: PublicProfile) -> Self {
        JsonPublicProfile {
            id: profile.id.to_string(),
            name: profile.name,
            display_name: profile.display_name,
            image: profile.image,
            avatar_url: profile.avatar_url,
            created_at: profile.created_at,
            last_online_at: profile.last_online_at,
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonMatch {
    id: String,
    player1_id: String,
    player2_id: String,
    status: &'static str,
    current_turn_user_id: Option<String>,
    winner_user_id: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl From<Match> for JsonMatch {
    fn from(m: Match) -> Self {
        JsonMatch {
            id: m.id.to_string(),
            player1_id: m.player1_id.to_string(),
            player2_id: m.player2_id.to_string(),
            status: m.status.as_str(),
            current_turn_user_id: m.current_turn_user_id.map(|u| u.to_string()),
            winner_user_id: m.winner_user_id.map(|u| u.to_string()),
            created_at: m.created_at,
            started_at: m.started_at,
            ended_at: m.ended_at,
        }
    }
}

fn parse_match_id(id: &str) -> Result<MatchId, ServiceError> {
    uuid::Uuid::parse_str(id)
        .map(MatchId)
        .map_err(|_| ServiceError::BadRequest("Invalid match ID".to_string()))
}

fn parse_match_status(status: Option<&str>) -> Result<Option<MatchStatus>, ServiceError> {
    status
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            MatchStatus::parse(&s.to_uppercase())
                .ok_or_else(|| ServiceError::BadRequest(format!("Invalid match status '{}'", s)))
        })
        .transpose()
}

fn parse_sort_order(order: Option<&str>) -> Result<SortOrder, ServiceError> {
    match order.map(|o| o.trim().to_lowercase()).as_deref() {
        None | Some("") | Some("desc") => Ok(SortOrder::Descending),
        Some("asc") => Ok(SortOrder::Ascending),
        Some(_) => Err(ServiceError::BadRequest("Invalid sort order".to_string())),
    }
}
