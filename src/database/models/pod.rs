use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use crate::utils::datetime::to_db_timestamp;

/// A persistent group of players, keyed by the Telegram group chat it lives in.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Pod {
    pub pod_id: i64,
    pub name: String,
    pub created_at: String,
}

impl Pod {
    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        pod_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Pod>(
            "SELECT pod_id, name, created_at FROM pods WHERE pod_id = ?"
        )
        .bind(pod_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &sqlx::SqlitePool,
        pod_id: i64,
        name: &str,
    ) -> Result<Self, sqlx::Error> {
        let now = to_db_timestamp(&Utc::now());
        sqlx::query(
            "INSERT INTO pods (pod_id, name, created_at) VALUES (?, ?, ?)"
        )
        .bind(pod_id)
        .bind(name)
        .bind(&now)
        .execute(pool)
        .await?;

        Ok(Pod {
            pod_id,
            name: name.to_string(),
            created_at: now,
        })
    }

    pub async fn find_all(
        pool: &sqlx::SqlitePool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Pod>(
            "SELECT pod_id, name, created_at FROM pods ORDER BY pod_id"
        )
        .fetch_all(pool)
        .await
    }

    /// Pods in which the given Telegram user has a player profile.
    pub async fn find_by_member(
        pool: &sqlx::SqlitePool,
        telegram_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Pod>(
            r#"
            SELECT p.pod_id, p.name, p.created_at
            FROM pods p
            JOIN pods_players pp ON pp.pod_id = p.pod_id
            WHERE pp.telegram_id = ?
            ORDER BY p.name
            "#
        )
        .bind(telegram_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count(pool: &sqlx::SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pods")
            .fetch_one(pool)
            .await
    }
}
