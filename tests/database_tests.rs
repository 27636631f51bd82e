use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use edh_pod_bot::database::{connection::DatabaseManager, models::*};
use tempfile::{tempdir, TempDir};

async fn setup_test_db() -> Result<(DatabaseManager, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    Ok((db_manager, temp_dir))
}

/// A pod with three players: Alice, Bob and Carol.
async fn setup_pod(db: &DatabaseManager, pod_id: i64) -> Result<(Pod, Vec<PodPlayer>)> {
    let pod = Pod::create(&db.pool, pod_id, "Friday Night").await?;
    let mut players = Vec::new();
    for (offset, name) in ["Alice", "Bob", "Carol"].into_iter().enumerate() {
        players.push(PodPlayer::create(&db.pool, pod_id, 1000 + offset as i64, name).await?);
    }
    Ok((pod, players))
}

fn new_game(pod_id: i64, results: Vec<(i64, GameOutcome)>, eliminations: Vec<(i64, i64)>) -> NewGame {
    NewGame {
        pod_id,
        created_at: Utc::now(),
        results,
        eliminations,
    }
}

async fn row_count(db: &DatabaseManager, table: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(&db.pool)
        .await?;
    Ok(count)
}

#[tokio::test]
async fn test_pod_creation_and_retrieval() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let chat_id = -1001234567890i64;

    let pod = Pod::create(&db.pool, chat_id, "Friday Night").await?;
    assert_eq!(pod.pod_id, chat_id);
    assert_eq!(pod.name, "Friday Night");

    let found = Pod::find_by_id(&db.pool, chat_id).await?;
    assert_eq!(found, Some(pod));
    assert!(Pod::find_by_id(&db.pool, 42).await?.is_none());

    // A chat hosts at most one pod
    assert!(Pod::create(&db.pool, chat_id, "Another").await.is_err());
    assert_eq!(Pod::count(&db.pool).await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_player_is_unique_per_pod() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    Pod::create(&db.pool, -1, "First").await?;
    Pod::create(&db.pool, -2, "Second").await?;

    let first = PodPlayer::create(&db.pool, -1, 555, "Alice").await?;
    assert!(PodPlayer::create(&db.pool, -1, 555, "Alice again").await.is_err());

    // The same Telegram user may join another pod under another name
    let second = PodPlayer::create(&db.pool, -2, 555, "Ally").await?;
    assert_ne!(first.pods_player_id, second.pods_player_id);

    let found = PodPlayer::find_in_pod(&db.pool, -2, 555).await?.unwrap();
    assert_eq!(found.name, "Ally");

    let pods = Pod::find_by_member(&db.pool, 555).await?;
    assert_eq!(pods.len(), 2);
    assert!(Pod::find_by_member(&db.pool, 777).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_player_requires_existing_pod() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    assert!(PodPlayer::create(&db.pool, -99, 1, "Nobody").await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_roster_and_rename() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let (pod, players) = setup_pod(&db, -10).await?;

    let roster = PodPlayer::find_by_pod(&db.pool, pod.pod_id).await?;
    let names: Vec<&str> = roster.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Bob", "Carol"]);

    let renamed = PodPlayer::rename(&db.pool, players[1].pods_player_id, "Zed").await?;
    assert_eq!(renamed.name, "Zed");
    assert_eq!(renamed.telegram_id, players[1].telegram_id);

    let roster = PodPlayer::find_by_pod(&db.pool, pod.pod_id).await?;
    assert_eq!(roster.last().unwrap().name, "Zed");

    assert!(PodPlayer::rename(&db.pool, 9999, "Ghost").await.is_err());

    Ok(())
}

#[tokio::test]
async fn test_record_game_writes_everything() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let (pod, players) = setup_pod(&db, -20).await?;
    let (alice, bob, carol) = (
        players[0].pods_player_id,
        players[1].pods_player_id,
        players[2].pods_player_id,
    );

    let game = Game::record(
        &db.pool,
        &new_game(
            pod.pod_id,
            vec![(alice, GameOutcome::Win), (bob, GameOutcome::Lose), (carol, GameOutcome::Lose)],
            vec![(alice, bob), (alice, carol)],
        ),
    )
    .await?;

    let reference = game.deletion_reference.clone().unwrap();
    assert_eq!(reference.len(), 8);
    assert!(reference.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));

    let results = GameResult::find_by_game(&db.pool, game.game_id).await?;
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.pod_id == pod.pod_id));
    assert_eq!(results.iter().filter(|r| r.outcome == GameOutcome::Win).count(), 1);

    let eliminations = Elimination::find_by_game(&db.pool, game.game_id).await?;
    assert_eq!(eliminations.len(), 2);
    assert!(eliminations.iter().all(|e| e.eliminator_id == alice));

    assert_eq!(Game::find_by_id(&db.pool, game.game_id).await?, Some(game.clone()));
    assert_eq!(Game::count_for_pod(&db.pool, pod.pod_id).await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_record_game_rejects_second_winner() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let (pod, players) = setup_pod(&db, -30).await?;

    let result = Game::record(
        &db.pool,
        &new_game(
            pod.pod_id,
            vec![
                (players[0].pods_player_id, GameOutcome::Win),
                (players[1].pods_player_id, GameOutcome::Win),
            ],
            vec![],
        ),
    )
    .await;
    assert!(result.is_err());

    // Nothing of the failed game survives
    assert_eq!(row_count(&db, "games").await?, 0);
    assert_eq!(row_count(&db, "game_results").await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_record_game_rejects_player_from_other_pod() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let (pod, players) = setup_pod(&db, -40).await?;
    let (_, outsiders) = setup_pod(&db, -41).await?;

    let result = Game::record(
        &db.pool,
        &new_game(
            pod.pod_id,
            vec![
                (players[0].pods_player_id, GameOutcome::Win),
                (outsiders[0].pods_player_id, GameOutcome::Lose),
            ],
            vec![],
        ),
    )
    .await;
    assert!(result.is_err());
    assert_eq!(row_count(&db, "games").await?, 0);
    assert_eq!(row_count(&db, "game_results").await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_record_game_rejects_elimination_of_non_participant() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let (pod, players) = setup_pod(&db, -50).await?;

    let result = Game::record(
        &db.pool,
        &new_game(
            pod.pod_id,
            vec![
                (players[0].pods_player_id, GameOutcome::Win),
                (players[1].pods_player_id, GameOutcome::Lose),
            ],
            // Carol is in the pod but did not play
            vec![(players[0].pods_player_id, players[2].pods_player_id)],
        ),
    )
    .await;
    assert!(result.is_err());
    assert_eq!(row_count(&db, "games").await?, 0);
    assert_eq!(row_count(&db, "game_results").await?, 0);
    assert_eq!(row_count(&db, "eliminations").await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_player_is_eliminated_at_most_once() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let (pod, players) = setup_pod(&db, -55).await?;
    let (alice, bob, carol) = (
        players[0].pods_player_id,
        players[1].pods_player_id,
        players[2].pods_player_id,
    );

    let result = Game::record(
        &db.pool,
        &new_game(
            pod.pod_id,
            vec![(alice, GameOutcome::Win), (bob, GameOutcome::Lose), (carol, GameOutcome::Lose)],
            vec![(alice, bob), (carol, bob)],
        ),
    )
    .await;
    assert!(result.is_err());
    assert_eq!(row_count(&db, "games").await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_delete_game_cascades() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let (pod, players) = setup_pod(&db, -60).await?;
    let (alice, bob) = (players[0].pods_player_id, players[1].pods_player_id);

    let game = Game::record(
        &db.pool,
        &new_game(pod.pod_id, vec![(alice, GameOutcome::Win), (bob, GameOutcome::Lose)], vec![(alice, bob)]),
    )
    .await?;
    DeletionRequest::create(&db.pool, game.game_id, bob, "2025-01-01T00:00:00Z").await?;

    assert!(Game::delete(&db.pool, game.game_id).await?);
    assert!(!Game::delete(&db.pool, game.game_id).await?);

    assert_eq!(row_count(&db, "games").await?, 0);
    assert_eq!(row_count(&db, "game_results").await?, 0);
    assert_eq!(row_count(&db, "eliminations").await?, 0);
    assert_eq!(DeletionRequest::count(&db.pool).await?, 0);

    // Players stay in the pod
    assert_eq!(PodPlayer::find_by_pod(&db.pool, pod.pod_id).await?.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_find_by_reference_ignores_case() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let (pod, players) = setup_pod(&db, -70).await?;

    let game = Game::record(
        &db.pool,
        &new_game(
            pod.pod_id,
            vec![
                (players[0].pods_player_id, GameOutcome::Draw),
                (players[1].pods_player_id, GameOutcome::Draw),
            ],
            vec![],
        ),
    )
    .await?;
    let reference = game.deletion_reference.clone().unwrap();

    let found = Game::find_by_reference(&db.pool, &format!(" {} ", reference.to_lowercase())).await?;
    assert_eq!(found, Some(game));
    assert!(Game::find_by_reference(&db.pool, "ZZZZZZZZ").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_recent_games_paging() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let (pod, players) = setup_pod(&db, -80).await?;
    let (alice, bob, carol) = (
        players[0].pods_player_id,
        players[1].pods_player_id,
        players[2].pods_player_id,
    );
    let start = Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).unwrap();

    let mut recorded = Vec::new();
    for day in 0..4 {
        // Carol only plays the first two games
        let mut results = vec![(alice, GameOutcome::Win), (bob, GameOutcome::Lose)];
        if day < 2 {
            results.push((carol, GameOutcome::Lose));
        }
        let game = Game::record(
            &db.pool,
            &NewGame {
                pod_id: pod.pod_id,
                created_at: start + Duration::days(day),
                results,
                eliminations: vec![],
            },
        )
        .await?;
        recorded.push(game);
    }

    let first_page = Game::recent_for_pod(&db.pool, pod.pod_id, 3, 0).await?;
    let ids: Vec<i64> = first_page.iter().map(|g| g.game_id).collect();
    assert_eq!(ids, vec![recorded[3].game_id, recorded[2].game_id, recorded[1].game_id]);

    let second_page = Game::recent_for_pod(&db.pool, pod.pod_id, 3, 3).await?;
    assert_eq!(second_page, vec![recorded[0].clone()]);

    let carol_games = Game::recent_for_user(&db.pool, players[2].telegram_id, 10, 0).await?;
    let ids: Vec<i64> = carol_games.iter().map(|g| g.game_id).collect();
    assert_eq!(ids, vec![recorded[1].game_id, recorded[0].game_id]);

    assert!(Game::recent_for_user(&db.pool, 424242, 10, 0).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_game_details_are_named_and_ordered() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let (pod, players) = setup_pod(&db, -90).await?;
    let (alice, bob, carol) = (
        players[0].pods_player_id,
        players[1].pods_player_id,
        players[2].pods_player_id,
    );

    let game = Game::record(
        &db.pool,
        &new_game(
            pod.pod_id,
            vec![(bob, GameOutcome::Lose), (carol, GameOutcome::Win), (alice, GameOutcome::Lose)],
            vec![(carol, alice), (carol, bob)],
        ),
    )
    .await?;

    let details = GameDetails::load_many(&db.pool, vec![game.clone()]).await?;
    assert_eq!(details.len(), 1);
    let details = &details[0];
    assert_eq!(details.game, game);

    // Winner first, then the rest by name
    let names: Vec<&str> = details.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Carol", "Alice", "Bob"]);

    assert_eq!(details.eliminations.len(), 2);
    assert_eq!(details.eliminations[0].eliminator_name, "Carol");
    assert_eq!(details.eliminations[0].eliminated_name, "Alice");
    assert_eq!(details.kills_by(carol), 2);
    assert_eq!(details.kills_by(alice), 0);

    assert!(GameDetails::load_many(&db.pool, Vec::new()).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_results_window_filter() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let (pod, players) = setup_pod(&db, -95).await?;
    let (alice, bob) = (players[0].pods_player_id, players[1].pods_player_id);
    let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();

    for created_at in [now - Duration::days(30), now - Duration::days(2)] {
        Game::record(
            &db.pool,
            &NewGame {
                pod_id: pod.pod_id,
                created_at,
                results: vec![(alice, GameOutcome::Win), (bob, GameOutcome::Lose)],
                eliminations: vec![(alice, bob)],
            },
        )
        .await?;
    }

    let since = now - Duration::days(7);
    assert_eq!(GameResult::find_for_pod(&db.pool, pod.pod_id, Some(&since)).await?.len(), 2);
    assert_eq!(GameResult::find_for_pod(&db.pool, pod.pod_id, None).await?.len(), 4);
    assert_eq!(Elimination::find_for_pod(&db.pool, pod.pod_id, Some(&since)).await?.len(), 1);
    assert_eq!(Elimination::find_for_pod(&db.pool, pod.pod_id, None).await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_schema_rejects_unknown_outcome() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let (pod, players) = setup_pod(&db, -99).await?;
    let game = Game::record(
        &db.pool,
        &new_game(
            pod.pod_id,
            vec![
                (players[0].pods_player_id, GameOutcome::Win),
                (players[1].pods_player_id, GameOutcome::Lose),
            ],
            vec![],
        ),
    )
    .await?;

    let result = sqlx::query("INSERT INTO game_results (game_id, player_id, pod_id, outcome) VALUES (?, ?, ?, 'tie')")
        .bind(game.game_id)
        .bind(players[2].pods_player_id)
        .bind(pod.pod_id)
        .execute(&db.pool)
        .await;
    assert!(result.is_err());

    Ok(())
}
