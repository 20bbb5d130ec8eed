use std::sync::Arc;

use bingo_email_lettre::EmailAdapter;
use bingo_persistence_sea_orm::{
    connect, create_schema, friendships::FriendshipRepositoryImpl, matches::MatchRepositoryImpl,
    otps::OtpRepositoryImpl, sessions::SessionRepositoryImpl, stats::StatsRepositoryImpl,
    stats_cache, user_cache, users::UserRepositoryImpl,
};
use bingo_server_app::{ApplicationSettings, build_application};
use log::info;

use crate::config::ServerConfig;

mod config;
mod logs;

const DB_MAX_CONNECTIONS: u32 = 5;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received. Preparing graceful exit...");
}

async fn run(config: ServerConfig) -> Result<(), String> {
    let db = connect(&config.database_url, DB_MAX_CONNECTIONS)
        .await
        .map_err(|e| format!("Failed to connect to database: {}", e))?;
    create_schema(&db)
        .await
        .map_err(|e| format!("Failed to create database schema: {}", e))?;

    let stats_cache = stats_cache();
    let user_repo = Arc::new(UserRepositoryImpl::new(db.clone(), user_cache()));
    let session_repo = Arc::new(SessionRepositoryImpl::new(db.clone()));
    let otp_repo = Arc::new(OtpRepositoryImpl::new(db.clone()));
    let friendship_repo = Arc::new(FriendshipRepositoryImpl::new(db.clone()));
    let match_repo = Arc::new(MatchRepositoryImpl::new(db.clone(), stats_cache.clone()));
    let stats_repo = Arc::new(StatsRepositoryImpl::new(db, stats_cache));
    let email_adapter = Arc::new(EmailAdapter::from_settings(config.smtp.as_ref())?);

    let settings = ApplicationSettings {
        bcrypt_cost: config.bcrypt_cost,
        ..Default::default()
    };
    let app = Arc::new(build_application(
        user_repo,
        session_repo,
        otp_repo,
        friendship_repo,
        match_repo,
        stats_repo,
        email_adapter,
        settings,
    ));

    info!("Starting application");

    bingo_server_api::serve(
        app.clone(),
        &config.http_host,
        config.http_port,
        shutdown_signal(),
    )
    .await
    .map_err(|e| format!("HTTP API failed: {}", e))?;

    app.jobs.abort();
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = logs::init_logger(config.log_file.as_ref()) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
