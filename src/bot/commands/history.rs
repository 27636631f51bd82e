use std::collections::HashMap;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use crate::bot::commands::{is_group_chat, telegram_id, user_label};
use crate::bot::handlers::HandlerResult;
use crate::database::{connection::DatabaseManager, models::*};
use crate::utils::{
    datetime::format_db_timestamp,
    feedback::CommandFeedback,
    logging::{log_command_error, log_command_start, log_command_success, log_validation_error},
    markdown::{bold, escape_markdown},
    validation::parse_page,
};

pub const GAMES_PER_PAGE: i64 = 5;

/// MarkdownV2 block describing one recorded game.
pub fn render_game(details: &GameDetails, pod_name: Option<&str>) -> String {
    let mut header = format_db_timestamp(&details.game.created_at);
    if let Some(pod_name) = pod_name {
        header = format!("{header} · {pod_name}");
    }

    let mut text = format!("🎲 {}", escape_markdown(&header));
    if let Some(reference) = &details.game.deletion_reference {
        text.push_str(&format!(" · `{}`", reference));
    }
    text.push('\n');

    let results: Vec<String> = details
        .results
        .iter()
        .map(|r| {
            let kills = details.kills_by(r.player_id);
            let label = if kills > 0 {
                format!("{} {} ⚔️{}", r.outcome.emoji(), r.name, kills)
            } else {
                format!("{} {}", r.outcome.emoji(), r.name)
            };
            escape_markdown(&label)
        })
        .collect();
    text.push_str(&results.join(" · "));
    text.push('\n');

    for elimination in &details.eliminations {
        text.push_str(&escape_markdown(&format!(
            "   {} eliminated {}\n",
            elimination.eliminator_name, elimination.eliminated_name
        )));
    }

    text
}

async fn pod_names(db: &DatabaseManager, games: &[Game]) -> Result<HashMap<i64, String>, sqlx::Error> {
    let mut names = HashMap::new();
    for game in games {
        if names.contains_key(&game.pod_id) {
            continue;
        }
        if let Some(pod) = Pod::find_by_id(&db.pool, game.pod_id).await? {
            names.insert(pod.pod_id, pod.name);
        }
    }
    Ok(names)
}

pub async fn handle_history(
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

    log_command_start("/history", &user, user_id, chat_id, None);

    let games = match Game::recent_for_user(&db.pool, user_id, GAMES_PER_PAGE, 0).await {
        Ok(games) => games,
        Err(e) => {
            log_command_error("/history", &user, user_id, chat_id, &e.to_string());
            feedback.error("Failed to load your games").await?;
            return Ok(());
        }
    };

    if games.is_empty() {
        feedback.info("You have no recorded games yet. Start one with /game.").await?;
        return Ok(());
    }

    let names = pod_names(db, &games).await?;
    let details = GameDetails::load_many(&db.pool, games).await?;

    let mut text = format!("📜 {}\n\n", bold("Your recent games"));
    for game in &details {
        let pod_name = names.get(&game.game.pod_id).map(String::as_str);
        text.push_str(&render_game(game, pod_name));
        text.push('\n');
    }

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::MarkdownV2)
        .await?;
    log_command_success("/history", &user, user_id, chat_id, Some(&format!("{} games", details.len())));
    Ok(())
}

pub async fn handle_pod_history(
    bot: Bot,
    msg: Message,
    page: String,
    db: &DatabaseManager,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let chat_id = msg.chat.id.0;
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let (user, user_id) = (user_label(from), telegram_id(from));

    log_command_start("/podhistory", &user, user_id, chat_id, Some(&page));

    if !is_group_chat(&msg.chat) {
        feedback
            .validation_error("Pod history is shown in the pod's group chat", "Use /history for your own games.")
            .await?;
        return Ok(());
    }

    let page = match parse_page(&page) {
        Ok(page) => page,
        Err(e) => {
            log_validation_error("/podhistory", "page", &page, &e.to_string(), &user, user_id, chat_id);
            feedback.validation_error(&e.to_string(), "Example: /podhistory 2").await?;
            return Ok(());
        }
    };

    let Some(pod) = Pod::find_by_id(&db.pool, chat_id).await? else {
        feedback
            .validation_error("This group has no pod yet", "Create one with /pod <name>.")
            .await?;
        return Ok(());
    };

    let offset = (i64::from(page) - 1) * GAMES_PER_PAGE;
    let games = Game::recent_for_pod(&db.pool, pod.pod_id, GAMES_PER_PAGE, offset).await?;
    if games.is_empty() {
        let message = if page == 1 {
            "No games recorded yet. Start one with /game.".to_string()
        } else {
            format!("There is no page {} of games.", page)
        };
        feedback.info(&message).await?;
        return Ok(());
    }

    let details = GameDetails::load_many(&db.pool, games).await?;
    let mut text = format!(
        "📜 {} {}\n\n",
        bold(&pod.name),
        escape_markdown(&format!("games, page {}", page))
    );
    for game in &details {
        text.push_str(&render_game(game, None));
        text.push('\n');
    }
    if details.len() as i64 == GAMES_PER_PAGE {
        text.push_str(&escape_markdown(&format!("Older games: /podhistory {}", page + 1)));
    }

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::MarkdownV2)
        .await?;
    log_command_success("/podhistory", &user, user_id, chat_id, Some(&format!("page {}", page)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_game() {
        let details = GameDetails {
            game: Game {
                game_id: 1,
                pod_id: -1,
                created_at: "2025-01-26T07:17:27Z".to_string(),
                deletion_reference: Some("AB12CD34".to_string()),
            },
            results: vec![
                ParticipantResult {
                    game_id: 1,
                    player_id: 1,
                    telegram_id: 11,
                    name: "Alice".to_string(),
                    outcome: GameOutcome::Win,
                },
                ParticipantResult {
                    game_id: 1,
                    player_id: 2,
                    telegram_id: 12,
                    name: "Bob".to_string(),
                    outcome: GameOutcome::Lose,
                },
            ],
            eliminations: vec![NamedElimination {
                game_id: 1,
                eliminator_id: 1,
                eliminator_name: "Alice".to_string(),
                eliminated_id: 2,
                eliminated_name: "Bob".to_string(),
            }],
        };

        let text = render_game(&details, Some("Friday Pod"));
        assert!(text.starts_with("🎲 2025\\-01\\-26 07:17 · Friday Pod · `AB12CD34`"));
        assert!(text.contains("🏆 Alice ⚔️1 · 💀 Bob"));
        assert!(text.contains("Alice eliminated Bob"));
    }
}
