use anyhow::{anyhow, Result};
use std::env;

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/games.db";
const DEFAULT_ROUNDUP_SCHEDULE: &str = "0 59 23 * * Sun";

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub http_port: u16,
    /// Seconds of inactivity after which an in-flight game recording is discarded
    pub workflow_timeout_secs: u64,
    /// Cron expression (with seconds) for the weekly roundup broadcast
    pub roundup_schedule: String,
}

impl Config {
    /// `DATABASE_URL`, or the default SQLite file when unset or empty.
    pub fn database_url_from_env() -> String {
        env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
    }

    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }

        let database_url = Self::database_url_from_env();

        let port_str = env::var("HTTP_PORT")
            .unwrap_or_else(|_| "3000".to_string());
        let http_port = port_str.trim()
            .parse()
            .map_err(|_| anyhow!("Invalid HTTP_PORT"))?;

        let timeout_str = env::var("WORKFLOW_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".to_string());
        let workflow_timeout_secs: u64 = timeout_str.trim()
            .parse()
            .map_err(|_| anyhow!("Invalid WORKFLOW_TIMEOUT_SECS"))?;
        if workflow_timeout_secs == 0 {
            return Err(anyhow!("WORKFLOW_TIMEOUT_SECS must be greater than zero"));
        }

        let roundup_schedule = env::var("ROUNDUP_SCHEDULE")
            .ok()
            .map(|schedule| schedule.trim().to_string())
            .filter(|schedule| !schedule.is_empty())
            .unwrap_or_else(|| DEFAULT_ROUNDUP_SCHEDULE.to_string());

        Ok(Config {
            telegram_bot_token: token,
            database_url,
            http_port,
            workflow_timeout_secs,
            roundup_schedule,
        })
    }
}
