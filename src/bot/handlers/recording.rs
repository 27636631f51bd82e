use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use crate::bot::handlers::HandlerResult;
use crate::database::{connection::DatabaseManager, models::*};
use crate::services::recording::{
    commit, GameDraft, PodRoster, RecordingInput, RecordingSessions, RecordingState, SessionKey, Step,
};
use crate::utils::logging::{log_database_error, log_database_operation};

pub const CALLBACK_PREFIX: &str = "rec:";

/// Button presses of the recording keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingCallback {
    Pod(i64),
    Player(i64),
    PlayersReset,
    PlayersDone,
    Outcome(GameOutcome),
    Eliminate(i64),
    EliminationsReset,
    NextEliminator,
    SkipEliminations,
    Confirm,
    Cancel,
}

impl RecordingCallback {
    pub fn data(&self) -> String {
        let action = match self {
            RecordingCallback::Pod(id) => format!("pod:{id}"),
            RecordingCallback::Player(id) => format!("player:{id}"),
            RecordingCallback::PlayersReset => "players_reset".to_string(),
            RecordingCallback::PlayersDone => "players_done".to_string(),
            RecordingCallback::Outcome(outcome) => format!("outcome:{outcome}"),
            RecordingCallback::Eliminate(id) => format!("elim:{id}"),
            RecordingCallback::EliminationsReset => "elim_reset".to_string(),
            RecordingCallback::NextEliminator => "elim_next".to_string(),
            RecordingCallback::SkipEliminations => "elim_skip".to_string(),
            RecordingCallback::Confirm => "confirm".to_string(),
            RecordingCallback::Cancel => "cancel".to_string(),
        };
        format!("{CALLBACK_PREFIX}{action}")
    }

    pub fn parse(data: &str) -> Option<Self> {
        let action = data.strip_prefix(CALLBACK_PREFIX)?;
        let parsed = match action.split_once(':') {
            Some(("pod", id)) => RecordingCallback::Pod(id.parse().ok()?),
            Some(("player", id)) => RecordingCallback::Player(id.parse().ok()?),
            Some(("outcome", outcome)) => RecordingCallback::Outcome(GameOutcome::parse(outcome)?),
            Some(("elim", id)) => RecordingCallback::Eliminate(id.parse().ok()?),
            Some(_) => return None,
            None => match action {
                "players_reset" => RecordingCallback::PlayersReset,
                "players_done" => RecordingCallback::PlayersDone,
                "elim_reset" => RecordingCallback::EliminationsReset,
                "elim_next" => RecordingCallback::NextEliminator,
                "elim_skip" => RecordingCallback::SkipEliminations,
                "confirm" => RecordingCallback::Confirm,
                "cancel" => RecordingCallback::Cancel,
                _ => return None,
            },
        };
        Some(parsed)
    }

    /// Turns a button press into workflow input, loading the roster for pod picks.
    pub async fn into_input(self, db: &DatabaseManager) -> Result<RecordingInput, sqlx::Error> {
        Ok(match self {
            RecordingCallback::Pod(pod_id) => RecordingInput::Pod {
                pod_id,
                roster: PodRoster::load(&db.pool, pod_id).await?,
            },
            RecordingCallback::Player(id) => RecordingInput::TogglePlayer(id),
            RecordingCallback::PlayersReset => RecordingInput::ResetPlayers,
            RecordingCallback::PlayersDone => RecordingInput::DoneSelecting,
            RecordingCallback::Outcome(outcome) => RecordingInput::Outcome(outcome),
            RecordingCallback::Eliminate(id) => RecordingInput::Eliminate(id),
            RecordingCallback::EliminationsReset => RecordingInput::ResetEliminations,
            RecordingCallback::NextEliminator => RecordingInput::NextEliminator,
            RecordingCallback::SkipEliminations => RecordingInput::SkipEliminations,
            RecordingCallback::Confirm => RecordingInput::Confirm,
            RecordingCallback::Cancel => RecordingInput::Cancel,
        })
    }
}

fn button(label: impl Into<String>, callback: RecordingCallback) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, callback.data())
}

fn cancel_row() -> Vec<InlineKeyboardButton> {
    vec![button("❌ Cancel", RecordingCallback::Cancel)]
}

/// Inline keyboard offering the inputs valid in `state`.
pub fn keyboard_for(state: &RecordingState) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();

    match state {
        RecordingState::SelectPod { choices } => {
            for pod in choices {
                rows.push(vec![button(pod.name.clone(), RecordingCallback::Pod(pod.pod_id))]);
            }
        }
        RecordingState::SelectParticipants { roster, selected } => {
            let buttons: Vec<InlineKeyboardButton> = roster
                .players
                .iter()
                .map(|player| {
                    let label = if selected.contains(&player.pods_player_id) {
                        format!("✅ {}", player.name)
                    } else {
                        player.name.clone()
                    };
                    button(label, RecordingCallback::Player(player.pods_player_id))
                })
                .collect();
            rows.extend(buttons.chunks(2).map(|chunk| chunk.to_vec()));
            rows.push(vec![
                button("🔄 Reset", RecordingCallback::PlayersReset),
                button("✔️ Done", RecordingCallback::PlayersDone),
            ]);
        }
        RecordingState::AssignOutcomes { .. } => {
            rows.push(
                [GameOutcome::Win, GameOutcome::Lose, GameOutcome::Draw]
                    .into_iter()
                    .map(|outcome| {
                        let label = format!("{} {}", outcome.emoji(), outcome.as_str());
                        button(label, RecordingCallback::Outcome(outcome))
                    })
                    .collect(),
            );
        }
        RecordingState::RecordEliminations { draft, eliminator } => {
            let eliminator_id = draft.participants.get(*eliminator).map(|p| p.pods_player_id);
            let buttons: Vec<InlineKeyboardButton> = draft
                .participants
                .iter()
                .filter(|p| Some(p.pods_player_id) != eliminator_id)
                .filter(|p| draft.outcome_of(p.pods_player_id) == Some(GameOutcome::Lose))
                .filter(|p| !draft.is_eliminated(p.pods_player_id))
                .map(|p| button(format!("⚔️ {}", p.name), RecordingCallback::Eliminate(p.pods_player_id)))
                .collect();
            rows.extend(buttons.chunks(2).map(|chunk| chunk.to_vec()));
            rows.push(vec![
                button("🔄 Reset", RecordingCallback::EliminationsReset),
                button("➡️ Next", RecordingCallback::NextEliminator),
                button("⏭ Skip", RecordingCallback::SkipEliminations),
            ]);
        }
        RecordingState::Confirm { .. } => {
            return InlineKeyboardMarkup::new(vec![vec![
                button("✅ Confirm", RecordingCallback::Confirm),
                button("❌ Cancel", RecordingCallback::Cancel),
            ]]);
        }
    }

    rows.push(cancel_row());
    InlineKeyboardMarkup::new(rows)
}

/// Input for a button press, or `None` when the user has no active session to apply it to.
///
/// The session is checked before anything is loaded from the database.
pub async fn resolve_input(
    callback: RecordingCallback,
    key: SessionKey,
    db: &DatabaseManager,
    sessions: &RecordingSessions,
) -> Result<Option<(RecordingState, RecordingInput)>, sqlx::Error> {
    let Some(current) = sessions.active(key, Utc::now()) else {
        return Ok(None);
    };
    let input = callback.into_input(db).await?;
    Ok(Some((current, input)))
}

/// Whether moving from `before` to `after` changes the prompt message at all.
pub fn needs_redraw(before: &RecordingState, after: &RecordingState) -> bool {
    before != after
}

pub async fn send_prompt(bot: &Bot, chat_id: ChatId, state: &RecordingState) -> ResponseResult<Message> {
    bot.send_message(chat_id, state.prompt())
        .reply_markup(keyboard_for(state))
        .await
}

/// Private message sent to a participant once their game is saved.
pub fn participant_notification(draft: &GameDraft, game: &Game, outcome: GameOutcome) -> String {
    let headline = match outcome {
        GameOutcome::Win => format!("🏆 You were VICTORIOUS in a game in {}!", draft.pod.name),
        GameOutcome::Lose => format!("💀 You were DEFEATED in a game in {}.", draft.pod.name),
        GameOutcome::Draw => format!("🤝 Your game in {} ended in a DRAW.", draft.pod.name),
    };
    let reference = game.deletion_reference.as_deref().unwrap_or("-");
    format!(
        "{headline}\n\n{}\nReference: {reference}\nIf this game is wrong, you and another participant can remove it with /delete {reference}",
        draft.summary()
    )
}

async fn notify_participants(bot: &Bot, draft: &GameDraft, game: &Game) {
    for (player, outcome) in draft.participants.iter().zip(&draft.outcomes) {
        let text = participant_notification(draft, game, *outcome);
        if let Err(e) = bot.send_message(ChatId(player.telegram_id), text).await {
            tracing::warn!(
                "Could not notify player {} about game {}: {}",
                player.telegram_id, game.game_id, e
            );
        }
    }
}

/// Commits a confirmed draft and reports the result to the chat.
///
/// On failure the session stays in `Confirm` so the user can retry or cancel.
pub async fn finalize_game(
    bot: &Bot,
    chat_id: ChatId,
    key: SessionKey,
    draft: &GameDraft,
    db: &DatabaseManager,
    sessions: &RecordingSessions,
) -> ResponseResult<Option<Game>> {
    match commit(&db.pool, draft, Utc::now()).await {
        Ok(game) => {
            sessions.finish(key);
            log_database_operation(
                "INSERT",
                "games",
                Some(&format!("game {} in pod {} with {} players", game.game_id, game.pod_id, draft.participants.len())),
            );
            let reference = game.deletion_reference.as_deref().unwrap_or("-");
            bot.send_message(
                chat_id,
                format!("✅ Game recorded! Reference: {reference}\n\n{}", draft.summary()),
            )
            .await?;
            notify_participants(bot, draft, &game).await;
            Ok(Some(game))
        }
        Err(e) => {
            log_database_error("INSERT", "games", &e.to_string(), Some(&format!("pod {}", draft.pod.pod_id)));
            bot.send_message(
                chat_id,
                format!("❌ Failed to save the game: {e}\nType 'confirm' to try again or 'cancel' to discard it."),
            )
            .await?;
            Ok(None)
        }
    }
}

pub async fn handle_recording_callback(
    bot: Bot,
    q: CallbackQuery,
    data: &str,
    db: &DatabaseManager,
    sessions: &RecordingSessions,
) -> HandlerResult {
    let Some(callback) = RecordingCallback::parse(data) else {
        bot.answer_callback_query(q.id).text("Unknown action").await?;
        return Ok(());
    };
    let Some(message) = q.message.as_ref() else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    let key = SessionKey {
        chat_id: message.chat.id.0,
        user_id: q.from.id.0,
    };
    let Some((current, input)) = resolve_input(callback, key, db, sessions).await? else {
        bot.answer_callback_query(q.id)
            .text("You are not recording a game here. Use /game to start one.")
            .await?;
        return Ok(());
    };

    let Some(step) = sessions.apply(key, input, Utc::now()) else {
        bot.answer_callback_query(q.id)
            .text("You are not recording a game here. Use /game to start one.")
            .await?;
        return Ok(());
    };

    match step {
        Step::Advanced(transition) => {
            if needs_redraw(&current, &transition.state) {
                let edit = bot
                    .edit_message_text(message.chat.id, message.id, transition.prompt)
                    .reply_markup(keyboard_for(&transition.state))
                    .await;
                if let Err(e) = edit {
                    tracing::debug!("Recording prompt not updated: {}", e);
                }
            }
            bot.answer_callback_query(q.id).await?;
        }
        Step::Rejected { error, .. } => {
            bot.answer_callback_query(q.id).text(error.to_string()).await?;
        }
        Step::Commit(draft) => {
            bot.answer_callback_query(q.id).text("Saving game...").await?;
            if finalize_game(&bot, message.chat.id, key, &draft, db, sessions).await?.is_some() {
                if let Err(e) = bot.edit_message_reply_markup(message.chat.id, message.id).await {
                    tracing::debug!("Could not clear recording keyboard: {}", e);
                }
            }
        }
        Step::Cancelled => {
            bot.edit_message_text(message.chat.id, message.id, "Game recording cancelled.")
                .await?;
            bot.answer_callback_query(q.id).await?;
        }
    }

    Ok(())
}

/// Handles the typed `confirm` / `cancel` replies of an active session.
pub async fn handle_recording_text(
    bot: Bot,
    msg: Message,
    input: RecordingInput,
    key: SessionKey,
    db: &DatabaseManager,
    sessions: &RecordingSessions,
) -> HandlerResult {
    let Some(step) = sessions.apply(key, input, Utc::now()) else {
        return Ok(());
    };

    match step {
        Step::Advanced(transition) => {
            send_prompt(&bot, msg.chat.id, &transition.state).await?;
        }
        Step::Rejected { error, transition } => {
            bot.send_message(msg.chat.id, format!("⚠️ {error}\n\n{}", transition.prompt))
                .reply_markup(keyboard_for(&transition.state))
                .await?;
        }
        Step::Commit(draft) => {
            finalize_game(&bot, msg.chat.id, key, &draft, db, sessions).await?;
        }
        Step::Cancelled => {
            bot.send_message(msg.chat.id, "Game recording cancelled.").await?;
        }
    }

    Ok(())
}
