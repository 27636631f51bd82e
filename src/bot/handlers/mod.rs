pub mod callback;
pub mod general_message;
pub mod message;
pub mod recording;

use teloxide::{dispatching::UpdateHandler, prelude::*};
use crate::bot::commands::Command;
use crate::database::connection::DatabaseManager;
use crate::services::recording::RecordingSessions;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type HandlerResult = Result<(), HandlerError>;

pub struct BotHandler {
    pub db: DatabaseManager,
    pub sessions: RecordingSessions,
}

impl BotHandler {
    pub fn new(db: DatabaseManager, sessions: RecordingSessions) -> Self {
        Self { db, sessions }
    }

    pub fn schema(&self) -> UpdateHandler<HandlerError> {
        let (db_command, sessions_command) = (self.db.clone(), self.sessions.clone());
        let (db_text, sessions_text) = (self.db.clone(), self.sessions.clone());
        let (db_callback, sessions_callback) = (self.db.clone(), self.sessions.clone());

        dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let db = db_command.clone();
                        let sessions = sessions_command.clone();
                        async move { message::command_handler(bot, msg, cmd, db, sessions).await }
                    }),
            )
            .branch(Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
                let db = db_text.clone();
                let sessions = sessions_text.clone();
                async move { message::text_handler(bot, msg, db, sessions).await }
            }))
            .branch(Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
                let db = db_callback.clone();
                let sessions = sessions_callback.clone();
                async move { callback::callback_handler(bot, q, db, sessions).await }
            }))
    }
}
