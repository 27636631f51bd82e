use teloxide::prelude::*;
use teloxide::types::ParseMode;
use crate::bot::commands::{is_group_chat, telegram_id, user_label};
use crate::bot::handlers::HandlerResult;
use crate::database::{connection::DatabaseManager, models::*};
use crate::services::stats::{player_stats, player_streak, PlayerStats, Streak, TimeWindow};
use crate::utils::{
    feedback::CommandFeedback,
    logging::{log_command_error, log_command_start, log_command_success, log_validation_error},
    markdown::{bold, escape_markdown, format_rate, truncate_name},
    validation::{validate_player_name, MAX_PLAYER_NAME_LENGTH},
};

fn streak_text(streak: Option<Streak>) -> Option<String> {
    match streak? {
        Streak::Winning(n) if n >= 2 => Some(format!("🔥 {} game winning streak", n)),
        Streak::Losing(n) if n >= 2 => Some(format!("🧊 {} game losing streak", n)),
        _ => None,
    }
}

fn period_line(label: &str, stats: &PlayerStats) -> String {
    format!(
        "{}: {} games, {}W {}L {}D, win rate {}, {} kills\n",
        label,
        stats.games_played,
        stats.wins,
        stats.losses,
        stats.draws,
        format_rate(stats.win_rate()),
        stats.kills
    )
}

/// MarkdownV2 profile card of one player in one pod.
pub fn render_profile(
    pod_name: &str,
    all_time: &PlayerStats,
    past_week: &PlayerStats,
    streak: Option<Streak>,
) -> String {
    let mut text = format!("👤 {} in {}\n", bold(&all_time.name), bold(pod_name));
    text.push_str(&escape_markdown(&period_line("All time", all_time)));
    text.push_str(&escape_markdown(&period_line("Past week", past_week)));
    if let Some(streak) = streak_text(streak) {
        text.push_str(&escape_markdown(&streak));
        text.push('\n');
    }
    text
}

async fn load_profile(
    db: &DatabaseManager,
    pod: &Pod,
    player: &PodPlayer,
) -> Result<Option<String>, sqlx::Error> {
    let all_time = player_stats(&db.pool, pod.pod_id, player.pods_player_id, TimeWindow::AllTime).await?;
    let past_week = player_stats(&db.pool, pod.pod_id, player.pods_player_id, TimeWindow::PastWeek).await?;
    let streak = player_streak(&db.pool, pod.pod_id, player.pods_player_id).await?;

    Ok(all_time
        .zip(past_week)
        .map(|(all_time, past_week)| render_profile(&pod.name, &all_time, &past_week, streak)))
}

pub async fn handle_profile(
    bot: Bot,
    msg: Message,
    name: String,
    db: &DatabaseManager,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let chat_id = msg.chat.id.0;
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let (user, user_id) = (user_label(from), telegram_id(from));

    log_command_start("/profile", &user, user_id, chat_id, None);

    if !is_group_chat(&msg.chat) {
        let pods = Pod::find_by_member(&db.pool, user_id).await?;
        if pods.is_empty() {
            feedback
                .validation_error("You are not in any pod yet", "Run /profile in your playgroup's chat to join its pod.")
                .await?;
            return Ok(());
        }

        let mut text = String::new();
        for pod in &pods {
            if let Some(player) = PodPlayer::find_in_pod(&db.pool, pod.pod_id, user_id).await? {
                if let Some(card) = load_profile(db, pod, &player).await? {
                    text.push_str(&card);
                    text.push('\n');
                }
            }
        }
        if text.is_empty() {
            feedback.error("Your profile could not be found").await?;
            return Ok(());
        }
        bot.send_message(msg.chat.id, text)
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        log_command_success("/profile", &user, user_id, chat_id, Some(&format!("{} pods", pods.len())));
        return Ok(());
    }

    let Some(pod) = Pod::find_by_id(&db.pool, chat_id).await? else {
        feedback
            .validation_error("This group has no pod yet", "Create one with /pod <name>.")
            .await?;
        return Ok(());
    };

    if let Some(player) = PodPlayer::find_in_pod(&db.pool, pod.pod_id, user_id).await? {
        if !name.trim().is_empty() {
            feedback
                .info(&format!("You already joined as {}. Use /rename to change your name.", player.name))
                .await?;
        }
        match load_profile(db, &pod, &player).await {
            Ok(Some(card)) => {
                bot.send_message(msg.chat.id, card)
                    .parse_mode(ParseMode::MarkdownV2)
                    .await?;
                log_command_success("/profile", &user, user_id, chat_id, Some("stats"));
            }
            Ok(None) => {
                feedback.error("Your profile could not be found").await?;
            }
            Err(e) => {
                log_command_error("/profile", &user, user_id, chat_id, &e.to_string());
                feedback.error("Failed to load your stats").await?;
            }
        }
        return Ok(());
    }

    let requested = if name.trim().is_empty() {
        truncate_name(&from.full_name(), MAX_PLAYER_NAME_LENGTH)
    } else {
        name
    };
    let player_name = match validate_player_name(&requested) {
        Ok(player_name) => player_name,
        Err(e) => {
            log_validation_error("/profile", "name", &requested, &e.to_string(), &user, user_id, chat_id);
            feedback
                .validation_error(&e.to_string(), "Pick a shorter name, for example: /profile Alice")
                .await?;
            return Ok(());
        }
    };

    match PodPlayer::create(&db.pool, pod.pod_id, user_id, &player_name).await {
        Ok(player) => {
            feedback
                .success(&format!("Welcome to {}, {}! You can now be added to games.", pod.name, player.name))
                .await?;
            log_command_success("/profile", &user, user_id, chat_id, Some("joined"));
        }
        Err(e) => {
            log_command_error("/profile", &user, user_id, chat_id, &e.to_string());
            feedback.error("Failed to join the pod").await?;
        }
    }

    Ok(())
}

pub async fn handle_rename(
    bot: Bot,
    msg: Message,
    name: String,
    db: &DatabaseManager,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let chat_id = msg.chat.id.0;
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let (user, user_id) = (user_label(from), telegram_id(from));

    log_command_start("/rename", &user, user_id, chat_id, Some(&name));

    if !is_group_chat(&msg.chat) {
        feedback
            .validation_error("Names are set per pod", "Run /rename <name> in your playgroup's chat.")
            .await?;
        return Ok(());
    }

    let Some(player) = PodPlayer::find_in_pod(&db.pool, chat_id, user_id).await? else {
        feedback
            .validation_error("You have not joined this pod", "Run /profile first.")
            .await?;
        return Ok(());
    };

    let new_name = match validate_player_name(&name) {
        Ok(new_name) => new_name,
        Err(e) => {
            log_validation_error("/rename", "name", &name, &e.to_string(), &user, user_id, chat_id);
            feedback
                .validation_error(&e.to_string(), "Example: /rename Alice")
                .await?;
            return Ok(());
        }
    };

    match PodPlayer::rename(&db.pool, player.pods_player_id, &new_name).await {
        Ok(renamed) => {
            feedback
                .success(&format!("{} is now known as {}", player.name, renamed.name))
                .await?;
            log_command_success("/rename", &user, user_id, chat_id, Some(&renamed.name));
        }
        Err(e) => {
            log_command_error("/rename", &user, user_id, chat_id, &e.to_string());
            feedback.error("Failed to rename you").await?;
        }
    }

    Ok(())
}
