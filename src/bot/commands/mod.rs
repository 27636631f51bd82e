pub mod delete;
pub mod game;
pub mod history;
pub mod leaderboard;
pub mod pod;
pub mod profile;

use teloxide::types::{Chat, User};
use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "EDH Pod Bot commands:")]
pub enum Command {
    #[command(description = "Display this help message")]
    Help,
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Create this group's pod or show it: /pod <name>")]
    Pod { name: String },
    #[command(description = "Join the pod or show your stats: /profile [name]")]
    Profile { name: String },
    #[command(description = "Change your name in this pod: /rename <name>")]
    Rename { name: String },
    #[command(description = "Record a new game")]
    Game,
    #[command(description = "Cancel the game you are recording")]
    Cancel,
    #[command(description = "Show the pod leaderboard")]
    Leaderboard,
    #[command(description = "Show your recent games")]
    History,
    #[command(description = "Show the pod's recent games: /podhistory [page]")]
    PodHistory { page: String },
    #[command(description = "Ask to delete a game: /delete <reference>")]
    Delete { reference: String },
}

pub fn is_group_chat(chat: &Chat) -> bool {
    chat.is_group() || chat.is_supergroup()
}

/// Telegram user id as stored in the database.
pub fn telegram_id(user: &User) -> i64 {
    user.id.0 as i64
}

/// Display label used in logs.
pub fn user_label(user: &User) -> String {
    user.username
        .clone()
        .unwrap_or_else(|| user.full_name())
}
