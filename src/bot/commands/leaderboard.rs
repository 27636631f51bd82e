use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use crate::bot::commands::{is_group_chat, telegram_id, user_label};
use crate::bot::handlers::HandlerResult;
use crate::database::{connection::DatabaseManager, models::*};
use crate::services::stats::{
    highlights, leaderboard, split_active, Highlights, PlayerStats, RankingMetric, TimeWindow,
};
use crate::utils::{
    feedback::CommandFeedback,
    logging::{log_command_error, log_command_start, log_command_success},
    markdown::{bold, escape_markdown, format_rate},
};

pub const CALLBACK_PREFIX: &str = "lb:";

pub fn callback_data(pod_id: i64, window: TimeWindow, metric: RankingMetric) -> String {
    format!("{}{}:{}:{}", CALLBACK_PREFIX, pod_id, window.token(), metric.token())
}

/// Parses `lb:<pod_id>:<window>:<metric>`.
pub fn parse_callback(data: &str) -> Option<(i64, TimeWindow, RankingMetric)> {
    let mut parts = data.strip_prefix(CALLBACK_PREFIX)?.split(':');
    let pod_id = parts.next()?.parse().ok()?;
    let window = TimeWindow::from_token(parts.next()?)?;
    let metric = RankingMetric::from_token(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some((pod_id, window, metric))
}

pub fn keyboard(pod_id: i64, window: TimeWindow, metric: RankingMetric) -> InlineKeyboardMarkup {
    let mark = |selected: bool, label: &str| {
        if selected {
            format!("• {label} •")
        } else {
            label.to_string()
        }
    };

    let windows = [TimeWindow::PastWeek, TimeWindow::AllTime]
        .into_iter()
        .map(|w| InlineKeyboardButton::callback(mark(w == window, w.label()), callback_data(pod_id, w, metric)))
        .collect::<Vec<_>>();
    let metrics = RankingMetric::ALL
        .into_iter()
        .map(|m| InlineKeyboardButton::callback(mark(m == metric, m.label()), callback_data(pod_id, window, m)))
        .collect::<Vec<_>>();

    InlineKeyboardMarkup::new(vec![windows, metrics])
}

fn medal(index: usize) -> String {
    match index {
        0 => "🥇".to_string(),
        1 => "🥈".to_string(),
        2 => "🥉".to_string(),
        n => format!("{}\\.", n + 1),
    }
}

fn primary_value(stats: &PlayerStats, metric: RankingMetric) -> String {
    match metric {
        RankingMetric::WinRate => format!("{} win rate", format_rate(stats.win_rate())),
        RankingMetric::Wins => format!("{} wins", stats.wins),
        RankingMetric::Kills => format!("{} kills", stats.kills),
        RankingMetric::GamesPlayed => format!("{} games", stats.games_played),
    }
}

fn stats_line(index: usize, stats: &PlayerStats, metric: RankingMetric) -> String {
    format!(
        "{} {}: {}\n",
        medal(index),
        bold(&stats.name),
        escape_markdown(&format!(
            "{} ({}W {}L {}D, {} games, {} kills)",
            primary_value(stats, metric),
            stats.wins,
            stats.losses,
            stats.draws,
            stats.games_played,
            stats.kills
        ))
    )
}

pub fn render_highlights(highlights: &Highlights) -> String {
    let mut text = format!("🏅 {}\n", bold("Highlights"));
    text.push_str(&escape_markdown(&format!(
        "👑 Top win rate: {} ({})\n",
        highlights.leader.name,
        format_rate(highlights.leader.win_rate())
    )));
    if let Some(killer) = &highlights.most_kills {
        text.push_str(&escape_markdown(&format!("⚔️ Most kills: {} ({})\n", killer.name, killer.kills)));
    }
    if let Some(regular) = &highlights.most_games {
        text.push_str(&escape_markdown(&format!(
            "🎲 Most games: {} ({})\n",
            regular.name, regular.games_played
        )));
    }
    if let Some(efficient) = &highlights.best_kills_per_game {
        let per_game = efficient.kills_per_game().unwrap_or(0.0);
        text.push_str(&escape_markdown(&format!(
            "🎯 Most kills per game: {} ({:.2})\n",
            efficient.name, per_game
        )));
    }
    text
}

/// MarkdownV2 leaderboard for one pod; `stats` must already be ranked.
pub fn render_leaderboard(
    pod_name: &str,
    window: TimeWindow,
    metric: RankingMetric,
    stats: &[PlayerStats],
) -> String {
    let (active, inactive) = split_active(stats.to_vec());

    let mut text = format!("🏆 {} leaderboard\n", bold(pod_name));
    text.push_str(&format!(
        "_{}_\n\n",
        escape_markdown(&format!("{} · by {}", window.label(), metric.label().to_lowercase()))
    ));

    if active.is_empty() {
        text.push_str(&escape_markdown("No games recorded in this period."));
        return text;
    }

    for (index, player) in active.iter().enumerate() {
        text.push_str(&stats_line(index, player, metric));
    }

    if !inactive.is_empty() {
        let names: Vec<&str> = inactive.iter().map(|p| p.name.as_str()).collect();
        text.push_str(&escape_markdown(&format!("\nNo games: {}\n", names.join(", "))));
    }

    if let Some(highlights) = highlights(&active) {
        text.push('\n');
        text.push_str(&render_highlights(&highlights));
    }

    text
}

/// The weekly post for a pod, or `None` when nobody played this week.
pub fn render_roundup(pod_name: &str, stats: &[PlayerStats]) -> Option<String> {
    let (active, _) = split_active(stats.to_vec());
    let highlights = highlights(&active)?;

    let mut text = format!("📅 Weekly roundup for {}\n\n", bold(pod_name));
    for (index, player) in active.iter().enumerate() {
        text.push_str(&stats_line(index, player, RankingMetric::WinRate));
    }
    text.push('\n');
    text.push_str(&render_highlights(&highlights));
    Some(text)
}

pub async fn handle_leaderboard(
    bot: Bot,
    msg: Message,
    db: &DatabaseManager,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let chat_id = msg.chat.id.0;
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let (user, user_id) = (user_label(from), telegram_id(from));

    log_command_start("/leaderboard", &user, user_id, chat_id, None);

    if !is_group_chat(&msg.chat) {
        let pods = Pod::find_by_member(&db.pool, user_id).await?;
        if pods.is_empty() {
            feedback
                .validation_error("You are not in any pod yet", "Run /profile in your playgroup's chat to join its pod.")
                .await?;
            return Ok(());
        }
        let buttons = pods
            .iter()
            .map(|pod| {
                vec![InlineKeyboardButton::callback(
                    pod.name.clone(),
                    callback_data(pod.pod_id, TimeWindow::AllTime, RankingMetric::WinRate),
                )]
            })
            .collect::<Vec<_>>();
        bot.send_message(msg.chat.id, "Which pod's leaderboard?")
            .reply_markup(InlineKeyboardMarkup::new(buttons))
            .await?;
        return Ok(());
    }

    let Some(pod) = Pod::find_by_id(&db.pool, chat_id).await? else {
        feedback
            .validation_error("This group has no pod yet", "Create one with /pod <name>.")
            .await?;
        return Ok(());
    };

    let (window, metric) = (TimeWindow::AllTime, RankingMetric::WinRate);
    match leaderboard(&db.pool, pod.pod_id, window, metric).await {
        Ok(stats) => {
            bot.send_message(msg.chat.id, render_leaderboard(&pod.name, window, metric, &stats))
                .parse_mode(ParseMode::MarkdownV2)
                .reply_markup(keyboard(pod.pod_id, window, metric))
                .await?;
            log_command_success("/leaderboard", &user, user_id, chat_id, Some(&format!("{} players", stats.len())));
        }
        Err(e) => {
            log_command_error("/leaderboard", &user, user_id, chat_id, &e.to_string());
            feedback.error("Failed to build the leaderboard").await?;
        }
    }

    Ok(())
}

pub async fn handle_leaderboard_callback(
    bot: Bot,
    q: CallbackQuery,
    data: &str,
    db: &DatabaseManager,
) -> HandlerResult {
    let Some((pod_id, window, metric)) = parse_callback(data) else {
        bot.answer_callback_query(q.id).text("Invalid leaderboard option").await?;
        return Ok(());
    };
    let Some(message) = q.message.as_ref() else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    let in_pod_chat = message.chat.id.0 == pod_id;
    if !in_pod_chat && PodPlayer::find_in_pod(&db.pool, pod_id, telegram_id(&q.from)).await?.is_none() {
        bot.answer_callback_query(q.id).text("You are not a member of that pod").await?;
        return Ok(());
    }

    let Some(pod) = Pod::find_by_id(&db.pool, pod_id).await? else {
        bot.answer_callback_query(q.id).text("That pod no longer exists").await?;
        return Ok(());
    };

    let stats = leaderboard(&db.pool, pod_id, window, metric).await?;
    let edit = bot
        .edit_message_text(message.chat.id, message.id, render_leaderboard(&pod.name, window, metric, &stats))
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(keyboard(pod_id, window, metric))
        .await;
    if let Err(e) = edit {
        // Telegram refuses edits that leave the message unchanged
        tracing::debug!("Leaderboard not updated: {}", e);
    }

    bot.answer_callback_query(q.id).await?;
    Ok(())
}
