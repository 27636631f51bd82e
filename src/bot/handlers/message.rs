use chrono::Utc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use crate::bot::commands::{self, Command};
use crate::bot::handlers::{general_message, recording, HandlerResult};
use crate::database::connection::DatabaseManager;
use crate::services::recording::{RecordingInput, RecordingSessions, SessionKey};

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    db: DatabaseManager,
    sessions: RecordingSessions,
) -> HandlerResult {
    match cmd {
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
        }
        Command::Start => {
            bot.send_message(
                msg.chat.id,
                "🃏 Welcome to EDH Pod Bot!\n\nCreate your group's pod with /pod <name>, join it with /profile, then record games with /game.\nUse /help to see all commands.",
            ).await?;
        }
        Command::Pod { name } => {
            commands::pod::handle_pod(bot, msg, name, &db).await?;
        }
        Command::Profile { name } => {
            commands::profile::handle_profile(bot, msg, name, &db).await?;
        }
        Command::Rename { name } => {
            commands::profile::handle_rename(bot, msg, name, &db).await?;
        }
        Command::Game => {
            commands::game::handle_game(bot, msg, &db, &sessions).await?;
        }
        Command::Cancel => {
            commands::game::handle_cancel(bot, msg, &sessions).await?;
        }
        Command::Leaderboard => {
            commands::leaderboard::handle_leaderboard(bot, msg, &db).await?;
        }
        Command::History => {
            commands::history::handle_history(bot, msg, &db).await?;
        }
        Command::PodHistory { page } => {
            commands::history::handle_pod_history(bot, msg, page, &db).await?;
        }
        Command::Delete { reference } => {
            commands::delete::handle_delete(bot, msg, reference, &db).await?;
        }
    }
    Ok(())
}

/// Maps a typed reply to workflow input.
pub fn parse_reply(text: &str) -> Option<RecordingInput> {
    match text.trim().to_lowercase().as_str() {
        "confirm" => Some(RecordingInput::Confirm),
        "cancel" => Some(RecordingInput::Cancel),
        _ => None,
    }
}

pub async fn text_handler(
    bot: Bot,
    msg: Message,
    db: DatabaseManager,
    sessions: RecordingSessions,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    if let (Some(from), Some(input)) = (msg.from(), parse_reply(text)) {
        let key = SessionKey {
            chat_id: msg.chat.id.0,
            user_id: from.id.0,
        };
        if sessions.active(key, Utc::now()).is_some() {
            return recording::handle_recording_text(bot, msg.clone(), input, key, &db, &sessions).await;
        }
    }

    general_message::handle_general_message(bot, msg).await
}
