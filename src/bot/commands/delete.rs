use teloxide::prelude::*;
use crate::bot::commands::{telegram_id, user_label};
use crate::bot::handlers::HandlerResult;
use crate::database::connection::DatabaseManager;
use crate::services::deletion::{request_deletion, DeletionStatus};
use crate::utils::{
    feedback::CommandFeedback,
    logging::{log_command_error, log_command_start, log_command_success, log_validation_error},
    validation::validate_deletion_reference,
};

pub async fn handle_delete(
    bot: Bot,
    msg: Message,
    reference: String,
    db: &DatabaseManager,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let chat_id = msg.chat.id.0;
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let (user, user_id) = (user_label(from), telegram_id(from));

    log_command_start("/delete", &user, user_id, chat_id, Some(&reference));

    let reference = match validate_deletion_reference(&reference) {
        Ok(reference) => reference,
        Err(e) => {
            log_validation_error("/delete", "reference", &reference, &e.to_string(), &user, user_id, chat_id);
            feedback
                .validation_error(&e.to_string(), "Use the reference shown when the game was recorded, e.g. /delete AB12CD34")
                .await?;
            return Ok(());
        }
    };

    match request_deletion(&db.pool, &reference, user_id).await {
        Ok(DeletionStatus::NotFound) => {
            feedback.error(&format!("No game found with reference {}", reference)).await?;
        }
        Ok(DeletionStatus::NotInGame) => {
            feedback.error("Only players who took part in a game can delete it").await?;
        }
        Ok(DeletionStatus::AlreadyRequested) => {
            feedback
                .warning("You already asked to delete this game. Another participant has to confirm.")
                .await?;
        }
        Ok(DeletionStatus::Pending { .. }) => {
            feedback
                .info(&format!(
                    "Deletion requested for game {}. Another participant must also run /delete {}.",
                    reference, reference
                ))
                .await?;
            log_command_success("/delete", &user, user_id, chat_id, Some("pending"));
        }
        Ok(DeletionStatus::Deleted { game }) => {
            feedback.success(&format!("Game {} has been deleted", reference)).await?;
            log_command_success("/delete", &user, user_id, chat_id, Some(&format!("deleted game {}", game.game_id)));
        }
        Err(e) => {
            log_command_error("/delete", &user, user_id, chat_id, &e.to_string());
            feedback.error("Failed to process the deletion request").await?;
        }
    }

    Ok(())
}
