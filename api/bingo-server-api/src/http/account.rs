use std::net::SocketAddr;

use axum::{
    Json,
    extract::{ConnectInfo, Path, State},
    http::{Extensions, HeaderMap, StatusCode, header::USER_AGENT},
};
use bingo_server_app::{
    domain::{session::ClientInfo, user::User},
    workflow::account::{PublicProfile, profile::ProfileChanges},
};
use chrono::{DateTime, Utc};

use crate::{AppState, auth::Auth, error::ServiceError, http::JsonPublicProfile};

#[derive(serde::Deserialize)]
pub struct JsonRegisterRequest {
    email: String,
    password: String,
    name: String,
}

#[derive(serde::Deserialize)]
pub struct JsonLoginRequest {
    identifier: String,
    password: String,
}

#[derive(serde::Deserialize)]
pub struct JsonCodeRequest {
    code: String,
}

#[derive(serde::Deserialize)]
pub struct JsonEmailRequest {
    email: String,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonResetPasswordRequest {
    email: String,
    code: String,
    new_password: String,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonUpdateProfileRequest {
    display_name: Option<String>,
    image: Option<String>,
    avatar_url: Option<String>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonOwnProfile {
    id: String,
    email: String,
    email_verified: bool,
    name: String,
    display_name: Option<String>,
    image: Option<String>,
    avatar_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<User> for JsonOwnProfile {
    fn from(user: User) -> Self {
        JsonOwnProfile {
            id: user.id.to_string(),
            email: user.email,
            email_verified: user.email_verified,
            name: user.name,
            display_name: user.display_name,
            image: user.image,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSession {
    token: String,
    user_id: String,
    expires_at: DateTime<Utc>,
}

#[derive(serde::Serialize)]
pub struct JsonRevokedSessions {
    revoked: u64,
}

fn peer_addr(extensions: &Extensions) -> Option<SocketAddr> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// The forwarded address is only trusted from a proxy on the same host.
fn client_info(headers: &HeaderMap, peer: Option<SocketAddr>) -> ClientInfo {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    };
    let forwarded = || {
        header("x-forwarded-for")
            .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
            .filter(|ip| !ip.is_empty())
    };
    let ip_address = match peer {
        Some(peer) if peer.ip().is_loopback() => {
            forwarded().or_else(|| Some(peer.ip().to_string()))
        }
        Some(peer) => Some(peer.ip().to_string()),
        None => None,
    };
    ClientInfo {
        ip_address,
        user_agent: header(USER_AGENT.as_str()),
    }
}

pub async fn register(
    State(app_state): State<AppState>,
    Json(req): Json<JsonRegisterRequest>,
) -> Result<(StatusCode, Json<JsonOwnProfile>), ServiceError> {
    let user = app_state
        .app
        .account_register_use_case
        .register(&req.email, &req.password, &req.name)
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn login(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
    Json(req): Json<JsonLoginRequest>,
) -> Result<Json<JsonSession>, ServiceError> {
    let session = app_state
        .app
        .account_login_use_case
        .login(
            &req.identifier,
            &req.password,
            client_info(&headers, peer_addr(&extensions)),
        )
        .await?;
    Ok(Json(JsonSession {
        token: session.token,
        user_id: session.user_id.to_string(),
        expires_at: session.expires_at,
    }))
}

pub async fn logout(
    auth: Auth,
    State(app_state): State<AppState>,
) -> Result<StatusCode, ServiceError> {
    app_state
        .app
        .account_logout_use_case
        .logout(&auth.token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn logout_all(
    auth: Auth,
    State(app_state): State<AppState>,
) -> Result<Json<JsonRevokedSessions>, ServiceError> {
    let revoked = app_state
        .app
        .account_logout_use_case
        .logout_all(auth.user.id)
        .await?;
    Ok(Json(JsonRevokedSessions { revoked }))
}

pub async fn verify_email(
    auth: Auth,
    State(app_state): State<AppState>,
    Json(req): Json<JsonCodeRequest>,
) -> Result<StatusCode, ServiceError> {
    app_state
        .app
        .account_verify_email_use_case
        .verify_email(auth.user.id, req.code.trim())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn resend_verification(
    auth: Auth,
    State(app_state): State<AppState>,
) -> Result<StatusCode, ServiceError> {
    app_state
        .app
        .account_verify_email_use_case
        .request_email_verification(auth.user.id)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn request_password_reset(
    State(app_state): State<AppState>,
    Json(req): Json<JsonEmailRequest>,
) -> Result<StatusCode, ServiceError> {
    app_state
        .app
        .account_password_reset_use_case
        .request_password_reset(&req.email)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn reset_password(
    State(app_state): State<AppState>,
    Json(req): Json<JsonResetPasswordRequest>,
) -> Result<StatusCode, ServiceError> {
    app_state
        .app
        .account_password_reset_use_case
        .reset_password(&req.email, req.code.trim(), &req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_me(
    auth: Auth,
    State(app_state): State<AppState>,
) -> Result<Json<JsonOwnProfile>, ServiceError> {
    let user = app_state
        .app
        .account_profile_use_case
        .get_profile(auth.user.id)
        .await?;
    Ok(Json(user.into()))
}

pub async fn update_me(
    auth: Auth,
    State(app_state): State<AppState>,
    Json(req): Json<JsonUpdateProfileRequest>,
) -> Result<Json<JsonOwnProfile>, ServiceError> {
    let changes = ProfileChanges {
        display_name: req.display_name,
        image: req.image,
        avatar_url: req.avatar_url,
    };
    let user = app_state
        .app
        .account_profile_use_case
        .update_profile(auth.user.id, changes)
        .await?;
    Ok(Json(user.into()))
}

pub async fn get_user(
    Path(name): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Json<JsonPublicProfile>, ServiceError> {
    let profile: PublicProfile = app_state
        .app
        .account_profile_use_case
        .get_public_profile(&name)
        .await?;
    Ok(Json(profile.into()))
}
