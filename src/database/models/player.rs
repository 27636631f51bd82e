use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use crate::utils::datetime::to_db_timestamp;

/// A player's identity within one specific pod.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PodPlayer {
    pub pods_player_id: i64,
    pub pod_id: i64,
    pub telegram_id: i64,
    pub name: String,
    pub avatar_url: Option<String>,
    pub created_at: String,
}

impl PodPlayer {
    pub async fn create(
        pool: &sqlx::SqlitePool,
        pod_id: i64,
        telegram_id: i64,
        name: &str,
    ) -> Result<Self, sqlx::Error> {
        let now = to_db_timestamp(&Utc::now());
        let result = sqlx::query(
            r#"
            INSERT INTO pods_players (pod_id, telegram_id, name, created_at)
            VALUES (?, ?, ?, ?)
            "#
        )
        .bind(pod_id)
        .bind(telegram_id)
        .bind(name)
        .bind(&now)
        .execute(pool)
        .await?;

        Ok(PodPlayer {
            pods_player_id: result.last_insert_rowid(),
            pod_id,
            telegram_id,
            name: name.to_string(),
            avatar_url: None,
            created_at: now,
        })
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        pods_player_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, PodPlayer>(
            "SELECT pods_player_id, pod_id, telegram_id, name, avatar_url, created_at FROM pods_players WHERE pods_player_id = ?"
        )
        .bind(pods_player_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_in_pod(
        pool: &sqlx::SqlitePool,
        pod_id: i64,
        telegram_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, PodPlayer>(
            "SELECT pods_player_id, pod_id, telegram_id, name, avatar_url, created_at FROM pods_players WHERE pod_id = ? AND telegram_id = ?"
        )
        .bind(pod_id)
        .bind(telegram_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_pod(
        pool: &sqlx::SqlitePool,
        pod_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PodPlayer>(
            "SELECT pods_player_id, pod_id, telegram_id, name, avatar_url, created_at FROM pods_players WHERE pod_id = ? ORDER BY name, pods_player_id"
        )
        .bind(pod_id)
        .fetch_all(pool)
        .await
    }

    pub async fn rename(
        pool: &sqlx::SqlitePool,
        pods_player_id: i64,
        name: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query("UPDATE pods_players SET name = ? WHERE pods_player_id = ?")
            .bind(name)
            .bind(pods_player_id)
            .execute(pool)
            .await?;

        Self::find_by_id(pool, pods_player_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }
}
