use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::cmp::Ordering;
use std::collections::HashMap;
use crate::database::models::{Elimination, GameOutcome, GameResult, PodPlayer};

/// Aggregated results of one pod player over a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub player_id: i64,
    pub telegram_id: i64,
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub games_played: u32,
    pub kills: u32,
}

impl PlayerStats {
    fn empty(player: &PodPlayer) -> Self {
        Self {
            player_id: player.pods_player_id,
            telegram_id: player.telegram_id,
            name: player.name.clone(),
            wins: 0,
            losses: 0,
            draws: 0,
            games_played: 0,
            kills: 0,
        }
    }

    /// `None` when the player has no games in the window.
    pub fn win_rate(&self) -> Option<f64> {
        if self.games_played == 0 {
            None
        } else {
            Some(f64::from(self.wins) / f64::from(self.games_played))
        }
    }

    pub fn kills_per_game(&self) -> Option<f64> {
        if self.games_played == 0 {
            None
        } else {
            Some(f64::from(self.kills) / f64::from(self.games_played))
        }
    }

    pub fn is_active(&self) -> bool {
        self.games_played > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeWindow {
    PastWeek,
    AllTime,
}

impl TimeWindow {
    /// Earliest game timestamp included in the window.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeWindow::PastWeek => Some(now - Duration::days(7)),
            TimeWindow::AllTime => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            TimeWindow::PastWeek => "week",
            TimeWindow::AllTime => "all",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "week" => Some(TimeWindow::PastWeek),
            "all" => Some(TimeWindow::AllTime),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeWindow::PastWeek => "Past week",
            TimeWindow::AllTime => "All time",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RankingMetric {
    WinRate,
    Wins,
    Kills,
    GamesPlayed,
}

impl RankingMetric {
    pub const ALL: [RankingMetric; 4] = [
        RankingMetric::WinRate,
        RankingMetric::Wins,
        RankingMetric::Kills,
        RankingMetric::GamesPlayed,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            RankingMetric::WinRate => "winrate",
            RankingMetric::Wins => "wins",
            RankingMetric::Kills => "kills",
            RankingMetric::GamesPlayed => "games",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        RankingMetric::ALL.into_iter().find(|m| m.token() == token)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RankingMetric::WinRate => "Win rate",
            RankingMetric::Wins => "Wins",
            RankingMetric::Kills => "Kills",
            RankingMetric::GamesPlayed => "Games",
        }
    }

    fn value(&self, stats: &PlayerStats) -> Option<f64> {
        match self {
            RankingMetric::WinRate => stats.win_rate(),
            RankingMetric::Wins => Some(f64::from(stats.wins)),
            RankingMetric::Kills => Some(f64::from(stats.kills)),
            RankingMetric::GamesPlayed => Some(f64::from(stats.games_played)),
        }
    }
}

/// Builds per-player stats from raw rows. Every player gets an entry, even without games.
pub fn aggregate(
    players: &[PodPlayer],
    results: &[GameResult],
    eliminations: &[Elimination],
) -> Vec<PlayerStats> {
    let mut by_player: HashMap<i64, PlayerStats> = players
        .iter()
        .map(|p| (p.pods_player_id, PlayerStats::empty(p)))
        .collect();

    for result in results {
        if let Some(stats) = by_player.get_mut(&result.player_id) {
            stats.games_played += 1;
            match result.outcome {
                GameOutcome::Win => stats.wins += 1,
                GameOutcome::Lose => stats.losses += 1,
                GameOutcome::Draw => stats.draws += 1,
            }
        }
    }

    for elimination in eliminations {
        if let Some(stats) = by_player.get_mut(&elimination.eliminator_id) {
            stats.kills += 1;
        }
    }

    players
        .iter()
        .filter_map(|p| by_player.remove(&p.pods_player_id))
        .collect()
}

fn compare(metric: RankingMetric, a: &PlayerStats, b: &PlayerStats) -> Ordering {
    let by_metric = match (metric.value(a), metric.value(b)) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    by_metric
        .then_with(|| b.games_played.cmp(&a.games_played))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.player_id.cmp(&b.player_id))
}

/// Orders stats by `metric` descending, then games played descending, then name.
pub fn rank(mut stats: Vec<PlayerStats>, metric: RankingMetric) -> Vec<PlayerStats> {
    stats.sort_by(|a, b| compare(metric, a, b));
    stats
}

pub async fn leaderboard(
    pool: &SqlitePool,
    pod_id: i64,
    window: TimeWindow,
    metric: RankingMetric,
) -> Result<Vec<PlayerStats>, sqlx::Error> {
    leaderboard_at(pool, pod_id, window, metric, Utc::now()).await
}

/// Same as [`leaderboard`] with an explicit reference time for the window.
pub async fn leaderboard_at(
    pool: &SqlitePool,
    pod_id: i64,
    window: TimeWindow,
    metric: RankingMetric,
    now: DateTime<Utc>,
) -> Result<Vec<PlayerStats>, sqlx::Error> {
    let since = window.cutoff(now);
    let players = PodPlayer::find_by_pod(pool, pod_id).await?;
    let results = GameResult::find_for_pod(pool, pod_id, since.as_ref()).await?;
    let eliminations = Elimination::find_for_pod(pool, pod_id, since.as_ref()).await?;

    Ok(rank(aggregate(&players, &results, &eliminations), metric))
}

pub async fn player_stats(
    pool: &SqlitePool,
    pod_id: i64,
    player_id: i64,
    window: TimeWindow,
) -> Result<Option<PlayerStats>, sqlx::Error> {
    let stats = leaderboard(pool, pod_id, window, RankingMetric::WinRate).await?;
    Ok(stats.into_iter().find(|s| s.player_id == player_id))
}

/// Splits a ranked list into players with games in the window and those without.
pub fn split_active(stats: Vec<PlayerStats>) -> (Vec<PlayerStats>, Vec<PlayerStats>) {
    stats.into_iter().partition(PlayerStats::is_active)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Highlights {
    pub leader: PlayerStats,
    pub most_kills: Option<PlayerStats>,
    pub most_games: Option<PlayerStats>,
    pub best_kills_per_game: Option<PlayerStats>,
}

/// Picks notable players out of the active ones; `None` when nobody played.
pub fn highlights(active: &[PlayerStats]) -> Option<Highlights> {
    let active: Vec<PlayerStats> = active.iter().filter(|s| s.is_active()).cloned().collect();
    let leader = rank(active.clone(), RankingMetric::WinRate).into_iter().next()?;

    let most_kills = rank(active.clone(), RankingMetric::Kills)
        .into_iter()
        .next()
        .filter(|s| s.kills > 0);
    let most_games = rank(active.clone(), RankingMetric::GamesPlayed).into_iter().next();
    let best_kills_per_game = active
        .into_iter()
        .filter(|s| s.kills > 0)
        .max_by(|a, b| {
            a.kills_per_game()
                .partial_cmp(&b.kills_per_game())
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.name.cmp(&a.name))
        });

    Some(Highlights {
        leader,
        most_kills,
        most_games,
        best_kills_per_game,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Streak {
    Winning(u32),
    Losing(u32),
}

/// The run of identical results at the end of `outcomes` (oldest first). Draws end a streak.
pub fn current_streak(outcomes: &[GameOutcome]) -> Option<Streak> {
    let last = *outcomes.last()?;
    let length = outcomes.iter().rev().take_while(|o| **o == last).count();
    let length = u32::try_from(length).unwrap_or(u32::MAX);
    match last {
        GameOutcome::Win => Some(Streak::Winning(length)),
        GameOutcome::Lose => Some(Streak::Losing(length)),
        GameOutcome::Draw => None,
    }
}

pub async fn player_streak(
    pool: &SqlitePool,
    pod_id: i64,
    player_id: i64,
) -> Result<Option<Streak>, sqlx::Error> {
    let outcomes: Vec<GameOutcome> = GameResult::find_for_pod(pool, pod_id, None)
        .await?
        .into_iter()
        .filter(|r| r.player_id == player_id)
        .map(|r| r.outcome)
        .collect();
    Ok(current_streak(&outcomes))
}
