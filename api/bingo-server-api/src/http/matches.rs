use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use bingo_server_app::{
    domain::{Pagination, r#match::Move},
    workflow::gameplay::MatchView,
};
use chrono::{DateTime, Utc};

use crate::{
    AppState,
    auth::Auth,
    error::ServiceError,
    http::{
        JsonMatch, JsonPublicProfile, PaginatedResponse, parse_match_id, parse_match_status,
        parse_sort_order,
    },
};

#[derive(serde::Deserialize)]
pub struct JsonMatchFilter {
    status: Option<String>,
    offset: Option<usize>,
    limit: Option<usize>,
    order: Option<String>,
}

#[derive(serde::Deserialize)]
pub struct JsonInviteRequest {
    opponent: String,
}

#[derive(serde::Deserialize)]
pub struct JsonSubmitBoardRequest {
    #[serde(default)]
    numbers: Option<Vec<u32>>,
}

#[derive(serde::Deserialize)]
pub struct JsonCallNumberRequest {
    number: u32,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonMove {
    move_number: u32,
    chosen_by_user_id: String,
    number: u32,
    created_at: DateTime<Utc>,
}

impl From<Move> for JsonMove {
    fn from(mv: Move) -> Self {
        JsonMove {
            move_number: mv.move_number,
            chosen_by_user_id: mv.chosen_by_user_id.to_string(),
            number: mv.number,
            created_at: mv.created_at,
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonMatchView {
    #[serde(flatten)]
    summary: JsonMatch,
    player1: JsonPublicProfile,
    player2: JsonPublicProfile,
    own_board: Option<Vec<u32>>,
    opponent_board: Option<Vec<u32>>,
    moves: Vec<JsonMove>,
    player1_lines: u32,
    player2_lines: u32,
}

impl From<MatchView> for JsonMatchView {
    fn from(view: MatchView) -> Self {
        JsonMatchView {
            summary: view.summary.into(),
            player1: view.player1.into(),
            player2: view.player2.into(),
            own_board: view.own_board,
            opponent_board: view.opponent_board,
            moves: view.moves.into_iter().map(JsonMove::from).collect(),
            player1_lines: view.player1_lines,
            player2_lines: view.player2_lines,
        }
    }
}

pub async fn list(
    auth: Auth,
    State(app_state): State<AppState>,
    Query(filter): Query<JsonMatchFilter>,
) -> Result<Json<PaginatedResponse<JsonMatch>>, ServiceError> {
    let status = parse_match_status(filter.status.as_deref())?;
    let order = parse_sort_order(filter.order.as_deref())?;
    let pagination = Pagination {
        offset: filter.offset,
        limit: filter.limit,
    };
    let (offset, limit) = (pagination.offset(), pagination.limit());

    let res = app_state
        .app
        .game_list_use_case
        .list_matches(auth.user.id, status, pagination, order)
        .await?;
    Ok(Json(PaginatedResponse {
        items: res.items.into_iter().map(JsonMatch::from).collect(),
        total: res.total_count,
        offset,
        limit,
    }))
}

pub async fn invite(
    auth: Auth,
    State(app_state): State<AppState>,
    Json(req): Json<JsonInviteRequest>,
) -> Result<(StatusCode, Json<JsonMatch>), ServiceError> {
    let m = app_state
        .app
        .match_invite_use_case
        .invite(auth.user.id, req.opponent.trim())
        .await?;
    Ok((StatusCode::CREATED, Json(m.into())))
}

pub async fn get_by_id(
    auth: Auth,
    Path(id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Json<JsonMatchView>, ServiceError> {
    let match_id = parse_match_id(&id)?;
    let view = app_state
        .app
        .game_get_use_case
        .get_match(auth.user.id, match_id)
        .await?;
    Ok(Json(view.into()))
}

pub async fn accept(
    auth: Auth,
    Path(id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Json<JsonMatch>, ServiceError> {
    let match_id = parse_match_id(&id)?;
    let m = app_state
        .app
        .match_accept_use_case
        .accept_invite(auth.user.id, match_id)
        .await?;
    Ok(Json(m.into()))
}

pub async fn cancel(
    auth: Auth,
    Path(id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Json<JsonMatch>, ServiceError> {
    let match_id = parse_match_id(&id)?;
    let m = app_state
        .app
        .match_cancel_use_case
        .cancel(auth.user.id, match_id)
        .await?;
    Ok(Json(m.into()))
}

pub async fn submit_board(
    auth: Auth,
    Path(id): Path<String>,
    State(app_state): State<AppState>,
    Json(req): Json<JsonSubmitBoardRequest>,
) -> Result<Json<JsonMatch>, ServiceError> {
    let match_id = parse_match_id(&id)?;
    let m = app_state
        .app
        .game_submit_board_use_case
        .submit_board(auth.user.id, match_id, req.numbers)
        .await?;
    Ok(Json(m.into()))
}

pub async fn call_number(
    auth: Auth,
    Path(id): Path<String>,
    State(app_state): State<AppState>,
    Json(req): Json<JsonCallNumberRequest>,
) -> Result<Json<JsonMatch>, ServiceError> {
    let match_id = parse_match_id(&id)?;
    let m = app_state
        .app
        .game_call_number_use_case
        .call_number(auth.user.id, match_id, req.number)
        .await?;
    Ok(Json(m.into()))
}

pub async fn resign(
    auth: Auth,
    Path(id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Json<JsonMatch>, ServiceError> {
    let match_id = parse_match_id(&id)?;
    let m = app_state
        .app
        .game_resign_use_case
        .resign(auth.user.id, match_id)
        .await?;
    Ok(Json(m.into()))
}
