use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use bingo_server_app::{
    domain::friendship::FriendshipStatus,
    workflow::friends::{FriendDirection, FriendView},
};
use chrono::{DateTime, Utc};

use crate::{AppState, auth::Auth, error::ServiceError, http::JsonPublicProfile};

#[derive(serde::Deserialize)]
pub struct JsonFriendFilter {
    status: Option<String>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonFriend {
    user: JsonPublicProfile,
    status: &'static str,
    direction: &'static str,
    since: DateTime<Utc>,
}

impl From<FriendView> for JsonFriend {
    fn from(view: FriendView) -> Self {
        JsonFriend {
            user: view.user.into(),
            status: view.status.as_str(),
            direction: match view.direction {
                FriendDirection::Outgoing => "OUTGOING",
                FriendDirection::Incoming => "INCOMING",
            },
            since: view.since,
        }
    }
}

#[derive(serde::Serialize)]
pub struct JsonFriendRequestResult {
    status: &'static str,
}

pub async fn list(
    auth: Auth,
    State(app_state): State<AppState>,
    Query(filter): Query<JsonFriendFilter>,
) -> Result<Json<Vec<JsonFriend>>, ServiceError> {
    let status = filter
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            FriendshipStatus::parse(&s.to_uppercase())
                .ok_or_else(|| ServiceError::BadRequest(format!("Invalid status '{}'", s)))
        })
        .transpose()?;
    let friends = app_state
        .app
        .friend_list_use_case
        .list(auth.user.id, status)
        .await?;
    Ok(Json(friends.into_iter().map(JsonFriend::from).collect()))
}

pub async fn send_request(
    auth: Auth,
    Path(name): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Json<JsonFriendRequestResult>, ServiceError> {
    let status = app_state
        .app
        .friend_request_use_case
        .send_request(auth.user.id, &name)
        .await?;
    Ok(Json(JsonFriendRequestResult {
        status: status.as_str(),
    }))
}

pub async fn accept(
    auth: Auth,
    Path(name): Path<String>,
    State(app_state): State<AppState>,
) -> Result<StatusCode, ServiceError> {
    app_state
        .app
        .friend_request_use_case
        .accept_request(auth.user.id, &name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn block(
    auth: Auth,
    Path(name): Path<String>,
    State(app_state): State<AppState>,
) -> Result<StatusCode, ServiceError> {
    app_state
        .app
        .friend_block_use_case
        .block(auth.user.id, &name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove(
    auth: Auth,
    Path(name): Path<String>,
    State(app_state): State<AppState>,
) -> Result<StatusCode, ServiceError> {
    app_state
        .app
        .friend_remove_use_case
        .remove(auth.user.id, &name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
