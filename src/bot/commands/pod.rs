use teloxide::prelude::*;
use teloxide::types::ParseMode;
use crate::bot::commands::{is_group_chat, telegram_id, user_label};
use crate::bot::handlers::HandlerResult;
use crate::database::{connection::DatabaseManager, models::*};
use crate::utils::{
    feedback::CommandFeedback,
    logging::{log_command_error, log_command_start, log_command_success, log_validation_error},
    markdown::{bold, escape_markdown},
    validation::{validate_pod_name, validate_telegram_chat_id},
};

pub async fn handle_pod(
    bot: Bot,
    msg: Message,
    name: String,
    db: &DatabaseManager,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let chat_id = msg.chat.id.0;
    let (user, user_id) = match msg.from() {
        Some(user) => (user_label(user), telegram_id(user)),
        None => return Ok(()),
    };

    log_command_start("/pod", &user, user_id, chat_id, Some(&name));

    if !is_group_chat(&msg.chat) {
        feedback
            .validation_error("Pods live in group chats", "Add me to your playgroup's chat and run /pod <name> there.")
            .await?;
        return Ok(());
    }

    let existing = match Pod::find_by_id(&db.pool, chat_id).await {
        Ok(pod) => pod,
        Err(e) => {
            log_command_error("/pod", &user, user_id, chat_id, &e.to_string());
            feedback.error("Failed to load this group's pod").await?;
            return Ok(());
        }
    };

    if let Some(pod) = existing {
        if !name.trim().is_empty() {
            feedback
                .warning(&format!("This group already has a pod called '{}'", pod.name))
                .await?;
        }
        send_pod_status(&bot, &msg, &pod, db).await?;
        log_command_success("/pod", &user, user_id, chat_id, Some("status"));
        return Ok(());
    }

    if let Err(e) = validate_telegram_chat_id(chat_id) {
        log_validation_error("/pod", "chat_id", &chat_id.to_string(), &e.to_string(), &user, user_id, chat_id);
        feedback.error("This chat cannot host a pod").await?;
        return Ok(());
    }

    let name = match validate_pod_name(&name) {
        Ok(name) => name,
        Err(e) => {
            log_validation_error("/pod", "name", &name, &e.to_string(), &user, user_id, chat_id);
            feedback
                .validation_error(&e.to_string(), "Name your pod, for example: /pod Friday Night Commander")
                .await?;
            return Ok(());
        }
    };

    match Pod::create(&db.pool, chat_id, &name).await {
        Ok(pod) => {
            feedback
                .success(&format!(
                    "Pod '{}' created! Everyone who plays should now run /profile to join.",
                    pod.name
                ))
                .await?;
            log_command_success("/pod", &user, user_id, chat_id, Some(&pod.name));
        }
        Err(e) => {
            log_command_error("/pod", &user, user_id, chat_id, &e.to_string());
            feedback.error("Failed to create the pod").await?;
        }
    }

    Ok(())
}

async fn send_pod_status(
    bot: &Bot,
    msg: &Message,
    pod: &Pod,
    db: &DatabaseManager,
) -> HandlerResult {
    let players = PodPlayer::find_by_pod(&db.pool, pod.pod_id).await?;
    let games = Game::count_for_pod(&db.pool, pod.pod_id).await?;

    let mut text = format!("🃏 {}\n\n", bold(&pod.name));
    text.push_str(&escape_markdown(&format!("Games recorded: {}\n", games)));
    text.push_str(&escape_markdown(&format!("Players ({}):\n", players.len())));
    for player in &players {
        text.push_str(&format!("• {}\n", escape_markdown(&player.name)));
    }
    if players.is_empty() {
        text.push_str(&escape_markdown("No players yet. Run /profile to join."));
    }

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::MarkdownV2)
        .await?;
    Ok(())
}
