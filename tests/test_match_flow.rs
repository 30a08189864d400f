mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use roastbout::arena::{Arena, MatchView};
use roastbout::bots::HeckleBot;
use roastbout::cli::commands::simulate::{bot_name, play_out};
use roastbout::config::GameConfig;
use roastbout::model::{Match, Role, Status};
use roastbout::observability::EventEmitter;
use roastbout::phase::Phase;
use roastbout::scheduler::{RecordingScheduler, ScheduledAction, TokioScheduler};
use roastbout::store::Db;

use common::Harness;

async fn bot_match(fighters: usize, seed: u64) -> MatchView {
    let scheduler = Arc::new(RecordingScheduler::new());
    let arena = Arena::new(
        Db::memory(),
        Arc::new(GameConfig::default()),
        scheduler.clone(),
    )
    .with_seed(seed)
    .with_strategy(Arc::new(HeckleBot::seeded(seed)));

    let m = arena.create_match("bots").await.unwrap();
    for i in 0..fighters {
        arena.add_bot(&m.id, &m.host_token, &bot_name(i)).await.unwrap();
    }
    arena.start_match(&m.id, &m.host_token).await.unwrap();
    let playout = play_out(&arena, &scheduler, &m.id, &m.host_token, &CancellationToken::new())
        .await
        .unwrap();
    playout.view
}

// ============================================================================
// Full matches
// ============================================================================

#[tokio::test]
async fn bot_matches_always_finish() {
    for fighters in [3, 4, 5, 6, 8] {
        for seed in 0..3 {
            let view = bot_match(fighters, seed).await;
            assert_eq!(
                view.game.status,
                Status::Results,
                "{fighters} fighters, seed {seed}"
            );
            assert!(!view.game.transitioning);
            assert!(view.game.end_reason.is_some());
        }
    }
}

#[tokio::test]
async fn champion_is_still_standing() {
    let view = bot_match(6, 3).await;
    if let Some(winner) = &view.game.winner_id {
        let champ = view.participant(winner).unwrap();
        assert_eq!(champ.role, Role::Fighter);
        assert!(!champ.knocked_out);
        assert!(champ.hp > 0);
    }
}

#[tokio::test]
async fn hp_never_exceeds_max() {
    let view = bot_match(8, 5).await;
    for f in &view.participants {
        assert!(f.hp <= f.max_hp, "{} has {} of {}", f.name, f.hp, f.max_hp);
        if f.knocked_out {
            assert_eq!(f.hp, 0);
        }
    }
}

#[tokio::test]
async fn cleanup_removes_every_document() {
    let h = Harness::new();
    let (m, fighters) = h.started(&["Ada", "Bo", "Cy"]).await;

    // Not finished yet: cleanup refuses.
    assert!(!h.arena.cleanup(&m.id).await.unwrap());

    h.patch(&m.id, serde_json::json!({ "status": Status::Results }))
        .await;
    h.arena
        .handle(ScheduledAction::CleanupMatch {
            match_id: m.id.clone(),
        })
        .await
        .unwrap();

    assert!(
        h.db()
            .get::<roastbout::model::Match>(&m.id)
            .await
            .unwrap()
            .is_none()
    );
    for f in &fighters {
        assert!(
            h.db()
                .get::<roastbout::model::Fighter>(&f.id)
                .await
                .unwrap()
                .is_none()
        );
    }
}

#[tokio::test(start_paused = true)]
async fn tokio_scheduler_plays_a_bot_match() {
    let mut config = GameConfig::default();
    config.bots.auto_advance = Some(Duration::from_secs(2));
    let (scheduler, due) = TokioScheduler::new();
    let arena = Arc::new(
        Arena::new(Db::memory(), Arc::new(config), Arc::new(scheduler))
            .with_seed(4)
            .with_strategy(Arc::new(HeckleBot::seeded(4))),
    );

    let cancel = CancellationToken::new();
    let dispatcher = tokio::spawn(Arc::clone(&arena).run_scheduled(due, cancel.clone()));

    let m = arena.create_match("timed").await.unwrap();
    for i in 0..5 {
        arena.add_bot(&m.id, &m.host_token, &bot_name(i)).await.unwrap();
    }
    arena.start_match(&m.id, &m.host_token).await.unwrap();

    // Paused time jumps straight to the next bot delay; cleanup is an hour out.
    let mut finished = None;
    for _ in 0..10_000 {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let game: Match = arena.db().get(&m.id).await.unwrap().unwrap();
        if game.status == Status::Results {
            finished = Some(game);
            break;
        }
    }
    let game = finished.expect("bots should finish the match on their own");
    assert!(game.end_reason.is_some());
    assert!(!game.transitioning);

    cancel.cancel();
    let stopped = tokio::time::timeout(Duration::from_secs(1), dispatcher).await;
    tokio_test::assert_ok!(stopped).unwrap();
}

// ============================================================================
// Event stream
// ============================================================================

#[tokio::test]
async fn event_stream_covers_the_match() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let events = Arc::new(EventEmitter::from_file(&path).unwrap());

    let scheduler = Arc::new(RecordingScheduler::new());
    let arena = Arena::new(
        Db::memory(),
        Arc::new(GameConfig::default()),
        scheduler.clone(),
    )
    .with_seed(9)
    .with_strategy(Arc::new(HeckleBot::seeded(9)))
    .with_events(Arc::clone(&events));

    let m = arena.create_match("events").await.unwrap();
    for i in 0..6 {
        arena.add_bot(&m.id, &m.host_token, &bot_name(i)).await.unwrap();
    }
    arena.start_match(&m.id, &m.host_token).await.unwrap();
    play_out(&arena, &scheduler, &m.id, &m.host_token, &CancellationToken::new())
        .await
        .unwrap();
    drop(arena);

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len() as u64, events.event_count());

    let types: Vec<&str> = lines.iter().map(|l| l["type"].as_str().unwrap()).collect();
    assert_eq!(types[0], "MatchCreated");
    assert_eq!(types.iter().filter(|t| **t == "FighterJoined").count(), 6);
    assert!(types.contains(&"DamageResolved"));
    assert_eq!(*types.last().unwrap(), "MatchEnded");

    for (i, line) in lines.iter().enumerate() {
        assert_eq!(line["sequence"], i as u64);
    }

    // Only committed transitions are reported, each along a legal edge.
    for line in lines.iter().filter(|l| l["type"] == "PhaseChanged") {
        assert_ne!(line["from"], line["to"]);
    }
}

// ============================================================================
// Host controls
// ============================================================================

#[tokio::test]
async fn host_controls_check_token_and_phase() {
    let h = Harness::new();
    let (m, _) = h.started(&["Ada", "Bo", "Cy"]).await;

    let err = h.arena.next_battle(&m.id, "nope").await.unwrap_err();
    assert!(matches!(err, roastbout::error::GameError::Unauthorized(_)));

    let advance = h.arena.next_battle(&m.id, &m.host_token).await.unwrap();
    assert!(!advance.is_advanced());
    let advance = h.arena.next_round(&m.id, &m.host_token).await.unwrap();
    assert!(!advance.is_advanced());
    assert_eq!(Phase::of(&h.game(&m.id).await), Phase::PROMPTS);
}

#[tokio::test]
async fn auto_advance_schedules_host_steps() {
    let mut config = common::quick_config();
    config.bots.auto_advance = Some(std::time::Duration::from_secs(3));
    let h = Harness::with_config(config);
    let (m, f) = h.started(&["Ada", "Bo", "Cy"]).await;

    h.answer_all(&m.id).await;
    let prompt = h.current_prompt(&m.id).await;
    assert!(!prompt.is_combatant(&f[2].id));
    h.vote_for(&m.id, &f[2].id, &prompt.assigned_to[0]).await;
    assert_eq!(Phase::of(&h.game(&m.id).await), Phase::REVEAL);

    let pending = h.scheduler.pending();
    assert!(pending.iter().any(|(delay, action)| {
        *delay == std::time::Duration::from_secs(3)
            && matches!(action, ScheduledAction::AdvanceBattle { prompt_id, .. } if *prompt_id == prompt.id)
    }));

    h.run_scheduled().await;
    let after = h.game(&m.id).await;
    assert_eq!(Phase::of(&after), Phase::VOTING);
    assert_ne!(after.current_prompt_id, Some(prompt.id));
}
