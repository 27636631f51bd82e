use chrono::{DateTime, Utc};
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tokio_cron_scheduler::{Job, JobScheduler};
use std::sync::Arc;
use crate::bot::commands::leaderboard::render_roundup;
use crate::database::{connection::DatabaseManager, models::Pod};
use crate::services::recording::RecordingSessions;
use crate::services::stats::{leaderboard_at, RankingMetric, TimeWindow};
use crate::utils::logging::log_system_event;

/// Expired recording sessions are swept on this schedule.
pub const SESSION_PURGE_SCHEDULE: &str = "0 */5 * * * *";

type ServiceResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub struct RoundupService {
    bot: Bot,
    db: Arc<DatabaseManager>,
    sessions: RecordingSessions,
    schedule: String,
    scheduler: JobScheduler,
}

impl RoundupService {
    pub async fn new(
        bot: Bot,
        db: Arc<DatabaseManager>,
        sessions: RecordingSessions,
        schedule: &str,
    ) -> ServiceResult<Self> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            bot,
            db,
            sessions,
            schedule: schedule.to_string(),
            scheduler,
        })
    }

    pub async fn start(&mut self) -> ServiceResult<()> {
        let bot = self.bot.clone();
        let db = self.db.clone();

        let roundup_job = Job::new_async(self.schedule.as_str(), move |_uuid, _l| {
            let bot = bot.clone();
            let db = db.clone();
            Box::pin(async move {
                match post_weekly_roundup(&bot, &db).await {
                    Ok(posted) => log_system_event("Weekly roundup posted", Some(&format!("{} pods", posted))),
                    Err(e) => tracing::error!("Failed to post weekly roundup: {}", e),
                }
            })
        })?;

        let sessions = self.sessions.clone();
        let purge_job = Job::new(SESSION_PURGE_SCHEDULE, move |_uuid, _l| {
            let purged = sessions.purge_expired(Utc::now());
            if purged > 0 {
                tracing::info!("Purged {} expired recording sessions", purged);
            }
        })?;

        self.scheduler.add(roundup_job).await?;
        self.scheduler.add(purge_job).await?;
        self.scheduler.start().await?;

        tracing::info!("Roundup service started with schedule '{}'", self.schedule);
        Ok(())
    }

    pub async fn stop(&mut self) -> ServiceResult<()> {
        self.scheduler.shutdown().await?;
        Ok(())
    }
}

/// Builds the roundup message of every pod that had games in the week before `now`.
pub async fn collect_roundups(
    db: &DatabaseManager,
    now: DateTime<Utc>,
) -> Result<Vec<(Pod, String)>, sqlx::Error> {
    let mut roundups = Vec::new();
    for pod in Pod::find_all(&db.pool).await? {
        let stats = leaderboard_at(&db.pool, pod.pod_id, TimeWindow::PastWeek, RankingMetric::WinRate, now).await?;
        if let Some(text) = render_roundup(&pod.name, &stats) {
            roundups.push((pod, text));
        }
    }
    Ok(roundups)
}

/// Sends the weekly roundup to each active pod and returns how many were delivered.
pub async fn post_weekly_roundup(bot: &Bot, db: &DatabaseManager) -> ServiceResult<usize> {
    let mut posted = 0;
    for (pod, text) in collect_roundups(db, Utc::now()).await? {
        match bot
            .send_message(ChatId(pod.pod_id), text)
            .parse_mode(ParseMode::MarkdownV2)
            .await
        {
            Ok(_) => posted += 1,
            Err(e) => tracing::error!("Failed to send roundup to pod {}: {}", pod.pod_id, e),
        }
    }
    Ok(posted)
}
