use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use crate::database::models::{DeletionRequest, Game, PodPlayer};
use crate::utils::datetime::to_db_timestamp;
use crate::utils::logging::log_database_operation;

/// Outcome of asking for a game to be deleted.
#[derive(Debug, Clone, PartialEq)]
pub enum DeletionStatus {
    NotFound,
    /// The requester did not take part in the game.
    NotInGame,
    AlreadyRequested,
    /// First request stored; another participant has to confirm.
    Pending { game: Game },
    Deleted { game: Game },
}

/// Records a deletion request for the game with `reference`.
///
/// The game is removed once two different participants have asked for it.
pub async fn request_deletion(
    pool: &SqlitePool,
    reference: &str,
    telegram_id: i64,
) -> Result<DeletionStatus, sqlx::Error> {
    request_deletion_at(pool, reference, telegram_id, Utc::now()).await
}

pub async fn request_deletion_at(
    pool: &SqlitePool,
    reference: &str,
    telegram_id: i64,
    now: DateTime<Utc>,
) -> Result<DeletionStatus, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let Some(game) = Game::find_by_reference(&mut *tx, reference).await? else {
        return Ok(DeletionStatus::NotFound);
    };

    let requester = sqlx::query_as::<_, PodPlayer>(
        r#"
        SELECT p.pods_player_id, p.pod_id, p.telegram_id, p.name, p.avatar_url, p.created_at
        FROM pods_players p
        JOIN game_results r ON r.player_id = p.pods_player_id
        WHERE r.game_id = ? AND p.telegram_id = ?
        "#
    )
    .bind(game.game_id)
    .bind(telegram_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(requester) = requester else {
        return Ok(DeletionStatus::NotInGame);
    };

    let existing = DeletionRequest::find_by_game(&mut *tx, game.game_id).await?;
    if existing.iter().any(|r| r.requester_id == requester.pods_player_id) {
        return Ok(DeletionStatus::AlreadyRequested);
    }

    if existing.is_empty() {
        DeletionRequest::create(&mut *tx, game.game_id, requester.pods_player_id, &to_db_timestamp(&now)).await?;
        tx.commit().await?;
        log_database_operation("INSERT", "game_deletion_requests", Some(&format!("game {}", game.game_id)));
        return Ok(DeletionStatus::Pending { game });
    }

    Game::delete(&mut *tx, game.game_id).await?;
    tx.commit().await?;
    log_database_operation("DELETE", "games", Some(&format!("game {}", game.game_id)));
    Ok(DeletionStatus::Deleted { game })
}
