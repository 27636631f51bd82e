use anyhow::Result;
use chrono::{Duration, Utc};
use edh_pod_bot::bot::handlers::recording::{resolve_input, RecordingCallback};
use edh_pod_bot::database::{connection::DatabaseManager, models::*};
use edh_pod_bot::services::recording::*;
use tempfile::{tempdir, TempDir};

async fn setup_test_db() -> Result<(DatabaseManager, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    Ok((db_manager, temp_dir))
}

async fn setup_pod(db: &DatabaseManager, pod_id: i64, names: &[&str]) -> Result<(Pod, Vec<PodPlayer>)> {
    let pod = Pod::create(&db.pool, pod_id, "Kitchen Table").await?;
    let mut players = Vec::new();
    for (offset, name) in names.iter().enumerate() {
        players.push(PodPlayer::create(&db.pool, pod_id, 2000 + offset as i64, name).await?);
    }
    Ok((pod, players))
}

fn advanced(step: Step) -> Transition {
    match step {
        Step::Advanced(transition) => transition,
        other => panic!("expected the workflow to advance, got {:?}", other),
    }
}

fn key() -> SessionKey {
    SessionKey { chat_id: -300, user_id: 2000 }
}

#[tokio::test]
async fn test_full_recording_workflow_commits_game() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let (pod, players) = setup_pod(&db, -300, &["Alice", "Bob", "Carol"]).await?;
    let (alice, bob, carol) = (
        players[0].pods_player_id,
        players[1].pods_player_id,
        players[2].pods_player_id,
    );

    let sessions = RecordingSessions::new(std::time::Duration::from_secs(300));
    let now = Utc::now();
    assert!(!sessions.start(key(), RecordingState::SelectPod { choices: vec![pod.clone()] }, now));

    let roster = PodRoster::load(&db.pool, pod.pod_id).await?;
    assert_eq!(roster.as_ref().map(|r| r.players.len()), Some(3));

    let inputs = vec![
        RecordingInput::Pod { pod_id: pod.pod_id, roster },
        RecordingInput::TogglePlayer(alice),
        RecordingInput::TogglePlayer(bob),
        RecordingInput::TogglePlayer(carol),
        RecordingInput::DoneSelecting,
        RecordingInput::Outcome(GameOutcome::Win),
        RecordingInput::Outcome(GameOutcome::Lose),
        RecordingInput::Outcome(GameOutcome::Lose),
        RecordingInput::Eliminate(bob),
        RecordingInput::Eliminate(carol),
        RecordingInput::SkipEliminations,
    ];
    for input in inputs {
        let step = sessions.apply(key(), input, now).expect("session is active");
        advanced(step);
    }

    let state = sessions.active(key(), now).expect("session is active");
    assert!(state.prompt().starts_with("Game summary:\nPod: Kitchen Table\n🏆 Alice (win)"));
    assert!(state.prompt().contains("⚔️ Alice eliminated Bob"));

    let Some(Step::Commit(draft)) = sessions.apply(key(), RecordingInput::Confirm, now) else {
        panic!("confirming should produce a commit step");
    };
    let game = commit(&db.pool, &draft, now).await?;
    assert!(sessions.finish(key()));
    assert!(sessions.is_empty());

    let results = GameResult::find_by_game(&db.pool, game.game_id).await?;
    assert_eq!(results.len(), 3);
    let eliminations = Elimination::find_by_game(&db.pool, game.game_id).await?;
    let pairs: Vec<(i64, i64)> = eliminations.iter().map(|e| (e.eliminator_id, e.eliminated_id)).collect();
    assert_eq!(pairs, vec![(alice, bob), (alice, carol)]);

    Ok(())
}

#[tokio::test]
async fn test_small_roster_is_rejected() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let (pod, _) = setup_pod(&db, -310, &["Solo"]).await?;

    let roster = PodRoster::load(&db.pool, pod.pod_id).await?;
    let state = RecordingState::SelectPod { choices: vec![pod.clone()] };
    match state.apply(RecordingInput::Pod { pod_id: pod.pod_id, roster }) {
        Step::Rejected { error, transition } => {
            assert_eq!(error, RecordingError::RosterTooSmall { pod: "Kitchen Table".to_string(), players: 1 });
            assert!(matches!(transition.state, RecordingState::SelectPod { .. }));
        }
        other => panic!("expected rejection, got {:?}", other),
    }

    assert!(PodRoster::load(&db.pool, -999).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_invalid_draft_is_not_written() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let (pod, players) = setup_pod(&db, -320, &["Alice", "Bob"]).await?;

    let mut draft = GameDraft::new(pod, players.clone());
    draft.outcomes = vec![GameOutcome::Win, GameOutcome::Win];

    match commit(&db.pool, &draft, Utc::now()).await {
        Err(CommitError::Invalid(RecordingError::MultipleWinners)) => {}
        other => panic!("expected an invalid draft, got {:?}", other),
    }

    draft.outcomes = vec![GameOutcome::Win];
    assert!(matches!(
        commit(&db.pool, &draft, Utc::now()).await,
        Err(CommitError::Invalid(RecordingError::OutcomesIncomplete))
    ));

    assert_eq!(Game::count(&db.pool).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_draft_with_foreign_player_is_not_written() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let (pod, players) = setup_pod(&db, -330, &["Alice", "Bob"]).await?;
    let (_, outsiders) = setup_pod(&db, -331, &["Mallory", "Trent"]).await?;

    let mut draft = GameDraft::new(pod, vec![players[0].clone(), outsiders[0].clone()]);
    draft.outcomes = vec![GameOutcome::Win, GameOutcome::Lose];

    let result = commit(&db.pool, &draft, Utc::now()).await;
    assert!(matches!(result, Err(CommitError::Invalid(RecordingError::UnknownPlayer(_)))));
    assert_eq!(Game::count(&db.pool).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_draw_game_without_eliminations() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let (pod, players) = setup_pod(&db, -340, &["Alice", "Bob"]).await?;

    let mut draft = GameDraft::new(pod, players);
    draft.outcomes = vec![GameOutcome::Draw, GameOutcome::Draw];

    let game = commit(&db.pool, &draft, Utc::now()).await?;
    let results = GameResult::find_by_game(&db.pool, game.game_id).await?;
    assert!(results.iter().all(|r| r.outcome == GameOutcome::Draw));
    assert!(Elimination::find_by_game(&db.pool, game.game_id).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_expired_session_is_dropped() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let (pod, _) = setup_pod(&db, -350, &["Alice", "Bob"]).await?;

    let sessions = RecordingSessions::new(std::time::Duration::from_secs(60));
    let started = Utc::now();
    sessions.start(key(), RecordingState::SelectPod { choices: vec![pod.clone()] }, started);

    let later = started + Duration::seconds(61);
    let roster = PodRoster::load(&db.pool, pod.pod_id).await?;
    assert!(sessions.apply(key(), RecordingInput::Pod { pod_id: pod.pod_id, roster }, later).is_none());
    assert!(sessions.active(key(), later).is_none());
    assert!(sessions.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_button_press_without_session_skips_database() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let (pod, _) = setup_pod(&db, -360, &["Alice", "Bob"]).await?;
    let sessions = RecordingSessions::new(std::time::Duration::from_secs(300));

    // Any query on a closed pool fails, so only a session check can succeed here
    db.pool.close().await;
    let resolved = resolve_input(RecordingCallback::Pod(pod.pod_id), key(), &db, &sessions).await?;
    assert!(resolved.is_none());

    sessions.start(key(), RecordingState::SelectPod { choices: vec![pod.clone()] }, Utc::now());
    assert!(resolve_input(RecordingCallback::Pod(pod.pod_id), key(), &db, &sessions).await.is_err());

    Ok(())
}

#[tokio::test]
async fn test_button_press_with_session_loads_roster() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let (pod, players) = setup_pod(&db, -370, &["Alice", "Bob"]).await?;
    let sessions = RecordingSessions::new(std::time::Duration::from_secs(300));
    sessions.start(key(), RecordingState::SelectPod { choices: vec![pod.clone()] }, Utc::now());

    let Some((current, input)) = resolve_input(RecordingCallback::Pod(pod.pod_id), key(), &db, &sessions).await? else {
        panic!("the session is active");
    };
    assert!(matches!(current, RecordingState::SelectPod { .. }));
    match input {
        RecordingInput::Pod { pod_id, roster: Some(roster) } => {
            assert_eq!(pod_id, pod.pod_id);
            assert_eq!(roster.players, players);
        }
        other => panic!("expected a pod pick with its roster, got {:?}", other),
    }

    Ok(())
}
