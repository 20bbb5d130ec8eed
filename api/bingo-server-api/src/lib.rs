use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use bingo_server_app::Application;
use log::info;

mod auth;
mod error;
mod http;

pub use error::ServiceError;

#[derive(Clone)]
pub struct AppState {
    pub app: Arc<Application>,
}

pub fn router(app: Arc<Application>) -> Router {
    let v1: Router<AppState> = Router::new()
        .route("/auth/register", post(http::account::register))
        .route("/auth/login", post(http::account::login))
        .route("/auth/logout", post(http::account::logout))
        .route("/auth/logout-all", post(http::account::logout_all))
        .route("/auth/verify-email", post(http::account::verify_email))
        .route(
            "/auth/verify-email/resend",
            post(http::account::resend_verification),
        )
        .route(
            "/auth/password-reset",
            post(http::account::request_password_reset),
        )
        .route(
            "/auth/password-reset/confirm",
            post(http::account::reset_password),
        )
        .route(
            "/me",
            get(http::account::get_me).patch(http::account::update_me),
        )
        .route("/users/{name}", get(http::account::get_user))
        .route("/users/{name}/stats", get(http::stats::get_user_stats))
        .route("/leaderboard", get(http::stats::get_leaderboard))
        .route("/friends", get(http::friends::list))
        .route(
            "/friends/{name}",
            post(http::friends::send_request).delete(http::friends::remove),
        )
        .route("/friends/{name}/accept", post(http::friends::accept))
        .route("/friends/{name}/block", post(http::friends::block))
        .route(
            "/matches",
            get(http::matches::list).post(http::matches::invite),
        )
        .route("/matches/{id}", get(http::matches::get_by_id))
        .route("/matches/{id}/accept", post(http::matches::accept))
        .route("/matches/{id}/cancel", post(http::matches::cancel))
        .route("/matches/{id}/board", post(http::matches::submit_board))
        .route("/matches/{id}/moves", post(http::matches::call_number))
        .route("/matches/{id}/resign", post(http::matches::resign));

    Router::new()
        .nest("/v1", v1)
        .with_state(AppState { app })
}

pub async fn serve(
    app: Arc<Application>,
    host: &str,
    port: u16,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!("HTTP API listening on {}:{}", host, port);

    axum::serve(
        listener,
        router(app).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await?;

    info!("HTTP API shut down gracefully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use bingo_email_lettre::LogEmailAdapter;
    use bingo_persistence_sea_orm::{
        connect, create_schema, friendships::FriendshipRepositoryImpl,
        matches::MatchRepositoryImpl, otps::OtpRepositoryImpl, sessions::SessionRepositoryImpl,
        stats::StatsRepositoryImpl, stats_cache, user_cache, users::UserRepositoryImpl,
    };
    use bingo_server_app::{ApplicationSettings, build_application};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    const PASSWORD: &str = "Tr0ub4dor&3-Correct-Horse";

    async fn test_router() -> Router {
        let db = connect("sqlite::memory:", 1).await.unwrap();
        create_schema(&db).await.unwrap();
        let stats = stats_cache();
        let app = build_application(
            Arc::new(UserRepositoryImpl::new(db.clone(), user_cache())),
            Arc::new(SessionRepositoryImpl::new(db.clone())),
            Arc::new(OtpRepositoryImpl::new(db.clone())),
            Arc::new(FriendshipRepositoryImpl::new(db.clone())),
            Arc::new(MatchRepositoryImpl::new(db.clone(), stats.clone())),
            Arc::new(StatsRepositoryImpl::new(db, stats)),
            Arc::new(LogEmailAdapter),
            ApplicationSettings {
                bcrypt_cost: 4,
                ..Default::default()
            },
        );
        router(Arc::new(app))
    }

    async fn send(
        router: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn register_and_login(router: &Router, name: &str) -> String {
        let (status, _) = send(
            router,
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({
                "email": format!("{}@example.com", name),
                "password": PASSWORD,
                "name": name,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            router,
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "identifier": name, "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_account_endpoints() {
        let router = test_router().await;
        let token = register_and_login(&router, "alice").await;

        let (status, body) = send(
            &router,
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({ "email": "other@example.com", "password": PASSWORD, "name": "alice" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].is_string());

        let (status, _) = send(
            &router,
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "identifier": "alice", "password": "wrong-password" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&router, "GET", "/v1/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, body) = send(&router, "GET", "/v1/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "alice");
        assert_eq!(body["emailVerified"], false);

        let (status, body) = send(
            &router,
            "PATCH",
            "/v1/me",
            Some(&token),
            Some(json!({ "displayName": "Alice" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["displayName"], "Alice");

        let (status, body) = send(&router, "GET", "/v1/users/alice", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("email").is_none());

        let (status, _) = send(&router, "POST", "/v1/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&router, "GET", "/v1/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_match_lifecycle() {
        let router = test_router().await;
        let alice = register_and_login(&router, "alice").await;
        let bob = register_and_login(&router, "bob").await;

        let (status, body) = send(
            &router,
            "POST",
            "/v1/matches",
            Some(&alice),
            Some(json!({ "opponent": "bob" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "INVITED");
        let id = body["id"].as_str().unwrap().to_string();

        // only the invitee accepts
        let (status, _) = send(
            &router,
            "POST",
            &format!("/v1/matches/{}/accept", id),
            Some(&alice),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, body) = send(
            &router,
            "POST",
            &format!("/v1/matches/{}/accept", id),
            Some(&bob),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "BOARD_SETUP");

        for token in [&alice, &bob] {
            let (status, _) = send(
                &router,
                "POST",
                &format!("/v1/matches/{}/board", id),
                Some(token),
                Some(json!({})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(
            &router,
            "GET",
            &format!("/v1/matches/{}", id),
            Some(&alice),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "IN_PROGRESS");
        assert!(body["ownBoard"].is_array());
        assert!(body["opponentBoard"].is_null());

        let (status, body) = send(
            &router,
            "POST",
            &format!("/v1/matches/{}/resign", id),
            Some(&alice),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "FINISHED");
        assert_eq!(body["winnerUserId"], body["player2Id"]);

        let (status, body) = send(&router, "GET", "/v1/users/bob/stats", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["wins"], 1);

        let (status, body) = send(&router, "GET", "/v1/leaderboard?limit=5", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["user"]["name"], "bob");

        let (status, body) = send(
            &router,
            "GET",
            "/v1/matches?status=finished",
            Some(&bob),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);

        let (status, _) = send(&router, "GET", "/v1/matches/nope", Some(&bob), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_friend_endpoints() {
        let router = test_router().await;
        let alice = register_and_login(&router, "alice").await;
        let bob = register_and_login(&router, "bob").await;

        let (status, body) = send(&router, "POST", "/v1/friends/bob", Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "PENDING");

        let (status, _) = send(
            &router,
            "POST",
            "/v1/friends/alice/accept",
            Some(&bob),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(
            &router,
            "GET",
            "/v1/friends?status=accepted",
            Some(&alice),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["user"]["name"], "bob");

        let (status, _) = send(&router, "POST", "/v1/friends/alice/block", Some(&bob), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(
            &router,
            "POST",
            "/v1/matches",
            Some(&alice),
            Some(json!({ "opponent": "bob" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
