use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite};

/// One participant's vote to delete a recorded game.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct DeletionRequest {
    pub request_id: i64,
    pub game_id: i64,
    pub requester_id: i64,
    pub created_at: String,
}

impl DeletionRequest {
    pub async fn create<'e, E>(
        executor: E,
        game_id: i64,
        requester_id: i64,
        created_at: &str,
    ) -> Result<Self, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "INSERT INTO game_deletion_requests (game_id, requester_id, created_at) VALUES (?, ?, ?)"
        )
        .bind(game_id)
        .bind(requester_id)
        .bind(created_at)
        .execute(executor)
        .await?;

        Ok(DeletionRequest {
            request_id: result.last_insert_rowid(),
            game_id,
            requester_id,
            created_at: created_at.to_string(),
        })
    }

    pub async fn find_by_game<'e, E>(
        executor: E,
        game_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, DeletionRequest>(
            "SELECT request_id, game_id, requester_id, created_at FROM game_deletion_requests WHERE game_id = ? ORDER BY request_id"
        )
        .bind(game_id)
        .fetch_all(executor)
        .await
    }

    pub async fn count(pool: &sqlx::SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM game_deletion_requests")
            .fetch_one(pool)
            .await
    }
}
