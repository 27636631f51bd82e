use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite};
use std::fmt;
use uuid::Uuid;
use crate::utils::datetime::to_db_timestamp;

/// How a single participant finished a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum GameOutcome {
    Win,
    Lose,
    Draw,
}

impl GameOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameOutcome::Win => "win",
            GameOutcome::Lose => "lose",
            GameOutcome::Draw => "draw",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "win" => Some(GameOutcome::Win),
            "lose" | "loss" => Some(GameOutcome::Lose),
            "draw" => Some(GameOutcome::Draw),
            _ => None,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            GameOutcome::Win => "🏆",
            GameOutcome::Lose => "💀",
            GameOutcome::Draw => "🤝",
        }
    }
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Game {
    pub game_id: i64,
    pub pod_id: i64,
    pub created_at: String,
    pub deletion_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct GameResult {
    pub game_id: i64,
    pub player_id: i64,
    pub pod_id: i64,
    pub outcome: GameOutcome,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Elimination {
    pub elimination_id: i64,
    pub game_id: i64,
    pub eliminator_id: i64,
    pub eliminated_id: i64,
}

/// Everything written when a recorded game is committed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGame {
    pub pod_id: i64,
    pub created_at: DateTime<Utc>,
    /// `(pods_player_id, outcome)` per participant
    pub results: Vec<(i64, GameOutcome)>,
    /// `(eliminator_id, eliminated_id)` pairs
    pub eliminations: Vec<(i64, i64)>,
}

/// A participant's result joined with their pod profile.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ParticipantResult {
    pub game_id: i64,
    pub player_id: i64,
    pub telegram_id: i64,
    pub name: String,
    pub outcome: GameOutcome,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct NamedElimination {
    pub game_id: i64,
    pub eliminator_id: i64,
    pub eliminator_name: String,
    pub eliminated_id: i64,
    pub eliminated_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameDetails {
    pub game: Game,
    pub results: Vec<ParticipantResult>,
    pub eliminations: Vec<NamedElimination>,
}

fn new_deletion_reference() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

impl Game {
    /// Writes the game, its results and its eliminations as one transaction.
    ///
    /// Any failure rolls the whole game back; the schema rejects players from
    /// another pod, a second winner, and eliminations of non-participants.
    pub async fn record(
        pool: &sqlx::SqlitePool,
        new_game: &NewGame,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let created_at = to_db_timestamp(&new_game.created_at);
        let reference = new_deletion_reference();

        let game_id = sqlx::query(
            "INSERT INTO games (pod_id, created_at, deletion_reference) VALUES (?, ?, ?)"
        )
        .bind(new_game.pod_id)
        .bind(&created_at)
        .bind(&reference)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for (player_id, outcome) in &new_game.results {
            sqlx::query(
                "INSERT INTO game_results (game_id, player_id, pod_id, outcome) VALUES (?, ?, ?, ?)"
            )
            .bind(game_id)
            .bind(player_id)
            .bind(new_game.pod_id)
            .bind(outcome)
            .execute(&mut *tx)
            .await?;
        }

        for (eliminator_id, eliminated_id) in &new_game.eliminations {
            sqlx::query(
                "INSERT INTO eliminations (game_id, eliminator_id, eliminated_id) VALUES (?, ?, ?)"
            )
            .bind(game_id)
            .bind(eliminator_id)
            .bind(eliminated_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Game {
            game_id,
            pod_id: new_game.pod_id,
            created_at,
            deletion_reference: Some(reference),
        })
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        game_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Game>(
            "SELECT game_id, pod_id, created_at, deletion_reference FROM games WHERE game_id = ?"
        )
        .bind(game_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_reference<'e, E>(
        executor: E,
        reference: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Game>(
            "SELECT game_id, pod_id, created_at, deletion_reference FROM games WHERE deletion_reference = ?"
        )
        .bind(reference.trim().to_uppercase())
        .fetch_optional(executor)
        .await
    }

    /// Most recent games of a pod, newest first.
    pub async fn recent_for_pod(
        pool: &sqlx::SqlitePool,
        pod_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Game>(
            r#"
            SELECT game_id, pod_id, created_at, deletion_reference
            FROM games
            WHERE pod_id = ?
            ORDER BY created_at DESC, game_id DESC
            LIMIT ? OFFSET ?
            "#
        )
        .bind(pod_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Most recent games a Telegram user took part in, across all of their pods.
    pub async fn recent_for_user(
        pool: &sqlx::SqlitePool,
        telegram_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Game>(
            r#"
            SELECT g.game_id, g.pod_id, g.created_at, g.deletion_reference
            FROM games g
            JOIN game_results r ON r.game_id = g.game_id
            JOIN pods_players p ON p.pods_player_id = r.player_id
            WHERE p.telegram_id = ?
            ORDER BY g.created_at DESC, g.game_id DESC
            LIMIT ? OFFSET ?
            "#
        )
        .bind(telegram_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn delete<'e, E>(
        executor: E,
        game_id: i64,
    ) -> Result<bool, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM games WHERE game_id = ?")
            .bind(game_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(pool: &sqlx::SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM games")
            .fetch_one(pool)
            .await
    }

    pub async fn count_for_pod(pool: &sqlx::SqlitePool, pod_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM games WHERE pod_id = ?")
            .bind(pod_id)
            .fetch_one(pool)
            .await
    }
}

impl GameResult {
    pub async fn find_by_game(
        pool: &sqlx::SqlitePool,
        game_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, GameResult>(
            "SELECT game_id, player_id, pod_id, outcome FROM game_results WHERE game_id = ? ORDER BY player_id"
        )
        .bind(game_id)
        .fetch_all(pool)
        .await
    }

    /// Results of a pod's games created at or after `since`, oldest game first.
    pub async fn find_for_pod(
        pool: &sqlx::SqlitePool,
        pod_id: i64,
        since: Option<&DateTime<Utc>>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let since = since.map(to_db_timestamp);
        sqlx::query_as::<_, GameResult>(
            r#"
            SELECT r.game_id, r.player_id, r.pod_id, r.outcome
            FROM game_results r
            JOIN games g ON g.game_id = r.game_id
            WHERE g.pod_id = ? AND (? IS NULL OR g.created_at >= ?)
            ORDER BY g.created_at, g.game_id, r.player_id
            "#
        )
        .bind(pod_id)
        .bind(&since)
        .bind(&since)
        .fetch_all(pool)
        .await
    }

    /// Batch fetch named results for several games to avoid N+1 queries
    pub async fn find_named_by_games(
        pool: &sqlx::SqlitePool,
        game_ids: &[i64],
    ) -> Result<Vec<ParticipantResult>, sqlx::Error> {
        if game_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            r#"
            SELECT r.game_id, r.player_id, p.telegram_id, p.name, r.outcome
            FROM game_results r
            JOIN pods_players p ON p.pods_player_id = r.player_id
            WHERE r.game_id IN ({})
            ORDER BY r.game_id, CASE r.outcome WHEN 'win' THEN 0 WHEN 'draw' THEN 1 ELSE 2 END, p.name
            "#,
            placeholders(game_ids.len())
        );

        let mut query_builder = sqlx::query_as::<_, ParticipantResult>(&query);
        for game_id in game_ids {
            query_builder = query_builder.bind(game_id);
        }

        query_builder.fetch_all(pool).await
    }
}

impl Elimination {
    pub async fn find_by_game(
        pool: &sqlx::SqlitePool,
        game_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Elimination>(
            "SELECT elimination_id, game_id, eliminator_id, eliminated_id FROM eliminations WHERE game_id = ? ORDER BY elimination_id"
        )
        .bind(game_id)
        .fetch_all(pool)
        .await
    }

    /// Eliminations in a pod's games created at or after `since`.
    pub async fn find_for_pod(
        pool: &sqlx::SqlitePool,
        pod_id: i64,
        since: Option<&DateTime<Utc>>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let since = since.map(to_db_timestamp);
        sqlx::query_as::<_, Elimination>(
            r#"
            SELECT e.elimination_id, e.game_id, e.eliminator_id, e.eliminated_id
            FROM eliminations e
            JOIN games g ON g.game_id = e.game_id
            WHERE g.pod_id = ? AND (? IS NULL OR g.created_at >= ?)
            ORDER BY g.created_at, e.elimination_id
            "#
        )
        .bind(pod_id)
        .bind(&since)
        .bind(&since)
        .fetch_all(pool)
        .await
    }

    pub async fn find_named_by_games(
        pool: &sqlx::SqlitePool,
        game_ids: &[i64],
    ) -> Result<Vec<NamedElimination>, sqlx::Error> {
        if game_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            r#"
            SELECT e.game_id,
                   e.eliminator_id, killer.name AS eliminator_name,
                   e.eliminated_id, victim.name AS eliminated_name
            FROM eliminations e
            JOIN pods_players killer ON killer.pods_player_id = e.eliminator_id
            JOIN pods_players victim ON victim.pods_player_id = e.eliminated_id
            WHERE e.game_id IN ({})
            ORDER BY e.game_id, e.elimination_id
            "#,
            placeholders(game_ids.len())
        );

        let mut query_builder = sqlx::query_as::<_, NamedElimination>(&query);
        for game_id in game_ids {
            query_builder = query_builder.bind(game_id);
        }

        query_builder.fetch_all(pool).await
    }
}

impl GameDetails {
    /// Loads participants and eliminations for the given games, preserving their order.
    pub async fn load_many(
        pool: &sqlx::SqlitePool,
        games: Vec<Game>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let game_ids: Vec<i64> = games.iter().map(|g| g.game_id).collect();
        let results = GameResult::find_named_by_games(pool, &game_ids).await?;
        let eliminations = Elimination::find_named_by_games(pool, &game_ids).await?;

        Ok(games
            .into_iter()
            .map(|game| GameDetails {
                results: results
                    .iter()
                    .filter(|r| r.game_id == game.game_id)
                    .cloned()
                    .collect(),
                eliminations: eliminations
                    .iter()
                    .filter(|e| e.game_id == game.game_id)
                    .cloned()
                    .collect(),
                game,
            })
            .collect())
    }

    pub fn kills_by(&self, player_id: i64) -> usize {
        self.eliminations
            .iter()
            .filter(|e| e.eliminator_id == player_id)
            .count()
    }
}
