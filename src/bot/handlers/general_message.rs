use teloxide::prelude::*;
use crate::bot::commands::is_group_chat;
use crate::bot::handlers::HandlerResult;
use crate::utils::feedback::CommandFeedback;

/// Replies to messages that are not commands. Group chatter is ignored.
pub async fn handle_general_message(
    bot: Bot,
    msg: Message,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);

    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            let command = text.split_whitespace().next().unwrap_or(text);
            let error_msg = format!("Unknown command: {command}");
            let suggestion = "Use /help to see all available commands, or check your command syntax.";
            feedback.validation_error(&error_msg, suggestion).await?;
        } else if !is_group_chat(&msg.chat) {
            let lower = text.to_lowercase();
            if lower.contains("game") || lower.contains("record") {
                feedback
                    .info("Looking to record a game? Use /game here or in your pod's group chat.")
                    .await?;
            } else if lower.contains("leaderboard") || lower.contains("stats") {
                feedback
                    .info("Use /leaderboard for your pod's rankings or /profile for your own stats.")
                    .await?;
            } else {
                feedback.info("Use /help to see all available commands!").await?;
            }
        }
    }

    Ok(())
}
