use teloxide::prelude::*;
use crate::bot::commands::leaderboard;
use crate::bot::handlers::{recording, HandlerResult};
use crate::database::connection::DatabaseManager;
use crate::services::recording::RecordingSessions;

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    db: DatabaseManager,
    sessions: RecordingSessions,
) -> HandlerResult {
    let user_id = q.from.id.0;
    let username = q.from.username.clone().unwrap_or_else(|| "unknown".to_string());
    let chat_id = q.message.as_ref().map(|m| m.chat.id.0).unwrap_or(0);

    let Some(data) = q.data.clone() else {
        bot.answer_callback_query(q.id)
            .text("Invalid callback data format")
            .await?;
        return Ok(());
    };

    tracing::info!(
        "Callback received: '{}' from user {} ({}) in chat {}",
        data, username, user_id, chat_id
    );

    if data.starts_with(recording::CALLBACK_PREFIX) {
        recording::handle_recording_callback(bot, q, &data, &db, &sessions).await
    } else if data.starts_with(leaderboard::CALLBACK_PREFIX) {
        leaderboard::handle_leaderboard_callback(bot, q, &data, &db).await
    } else {
        bot.answer_callback_query(q.id).text("Unknown action").await?;
        Ok(())
    }
}
