use chrono::Utc;
use teloxide::prelude::*;
use crate::bot::commands::{is_group_chat, telegram_id, user_label};
use crate::bot::handlers::{recording::send_prompt, HandlerResult};
use crate::database::{connection::DatabaseManager, models::*};
use crate::services::recording::{
    PodRoster, RecordingInput, RecordingSessions, RecordingState, SessionKey, Step,
};
use crate::utils::{
    feedback::CommandFeedback,
    logging::{log_command_start, log_command_success},
};

pub async fn handle_game(
    bot: Bot,
    msg: Message,
    db: &DatabaseManager,
    sessions: &RecordingSessions,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let chat_id = msg.chat.id.0;
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let (user, user_id) = (user_label(from), telegram_id(from));
    let key = SessionKey {
        chat_id,
        user_id: from.id.0,
    };
    let now = Utc::now();

    log_command_start("/game", &user, user_id, chat_id, None);

    if sessions.active(key, now).is_some() {
        feedback
            .warning("You are already recording a game here. Finish it or use /cancel first.")
            .await?;
        return Ok(());
    }

    let choices = if is_group_chat(&msg.chat) {
        Pod::find_by_id(&db.pool, chat_id).await?.into_iter().collect::<Vec<_>>()
    } else {
        Pod::find_by_member(&db.pool, user_id).await?
    };

    if choices.is_empty() {
        let suggestion = if is_group_chat(&msg.chat) {
            "Create this group's pod with /pod <name> first."
        } else {
            "Join a pod with /profile in your playgroup's chat first."
        };
        feedback.validation_error("No pod to record a game for", suggestion).await?;
        return Ok(());
    }

    let only_pod = match choices.as_slice() {
        [pod] => Some(pod.pod_id),
        _ => None,
    };
    let initial = RecordingState::SelectPod { choices };
    let state = match only_pod {
        Some(pod_id) => {
            let roster = PodRoster::load(&db.pool, pod_id).await?;
            match initial.apply(RecordingInput::Pod { pod_id, roster }) {
                Step::Advanced(transition) => transition.state,
                Step::Rejected { error, .. } => {
                    feedback
                        .validation_error(&error.to_string(), "Every player needs to run /profile in the group first.")
                        .await?;
                    return Ok(());
                }
                Step::Commit(_) | Step::Cancelled => return Ok(()),
            }
        }
        None => initial,
    };

    sessions.start(key, state.clone(), now);
    send_prompt(&bot, msg.chat.id, &state).await?;
    log_command_success("/game", &user, user_id, chat_id, Some(state.name()));
    Ok(())
}

pub async fn handle_cancel(
    bot: Bot,
    msg: Message,
    sessions: &RecordingSessions,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let chat_id = msg.chat.id.0;
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let (user, user_id) = (user_label(from), telegram_id(from));
    let key = SessionKey {
        chat_id,
        user_id: from.id.0,
    };

    log_command_start("/cancel", &user, user_id, chat_id, None);

    match sessions.apply(key, RecordingInput::Cancel, Utc::now()) {
        Some(_) => {
            feedback.success("Game recording cancelled").await?;
            log_command_success("/cancel", &user, user_id, chat_id, None);
        }
        None => {
            feedback.info("You are not recording a game here").await?;
        }
    }

    Ok(())
}
