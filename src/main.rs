//! # EDH Pod Bot Main Entry Point
//!
//! Initializes logging, loads configuration, sets up the database, starts
//! the roundup scheduler and the health server, and runs the Telegram bot.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edh_pod_bot::bot::handlers::BotHandler;
use edh_pod_bot::config::Config;
use edh_pod_bot::database::connection::DatabaseManager;
use edh_pod_bot::services::health::HealthService;
use edh_pod_bot::services::recording::RecordingSessions;
use edh_pod_bot::services::roundup::RoundupService;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edh_pod_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!("Starting EDH Pod Bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded - Database: {}, HTTP Port: {}, workflow timeout: {}s",
        config.database_url, config.http_port, config.workflow_timeout_secs
    );

    info!("Initializing database connection...");
    let db_manager = DatabaseManager::new(&config.database_url).await?;
    db_manager.run_migrations().await?;
    let db_arc = Arc::new(db_manager);
    info!("Database initialized successfully");

    let sessions = RecordingSessions::new(Duration::from_secs(config.workflow_timeout_secs));

    let bot = Bot::new(&config.telegram_bot_token);
    let handler = BotHandler::new(db_arc.as_ref().clone(), sessions.clone());

    let mut roundup_service = RoundupService::new(
        bot.clone(),
        db_arc.clone(),
        sessions,
        &config.roundup_schedule,
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to create roundup service: {}", e))?;

    if let Err(e) = roundup_service.start().await {
        tracing::error!("Failed to start roundup service: {}", e);
    }

    let health_service = HealthService::new(db_arc.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;

    info!("Health check server starting on port {}", config.http_port);

    let bot_task = tokio::spawn(async move {
        Dispatcher::builder(bot, handler.schema())
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    });

    let health_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_service.router).await {
            tracing::error!("Health server error: {}", e);
        }
    });

    tokio::select! {
        result = bot_task => {
            if let Err(e) = result {
                tracing::error!("Bot task error: {}", e);
            }
        }
        result = health_task => {
            if let Err(e) = result {
                tracing::error!("Health task error: {}", e);
            }
        }
    }

    if let Err(e) = roundup_service.stop().await {
        tracing::warn!("Error stopping roundup service: {}", e);
    }

    info!("Application stopped");
    Ok(())
}
