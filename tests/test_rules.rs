mod common;

use roastbout::error::{GameError, Rejection};
use roastbout::identity::Actor;
use roastbout::model::{AttackType, DocId, Role, Status};
use roastbout::phase::{Advance, Phase};
use roastbout::scheduler::ScheduledAction;

use common::Harness;

fn rejection(err: &GameError) -> &Rejection {
    err.rejection()
        .unwrap_or_else(|| panic!("expected a rejection, got {err:?}"))
}

// ============================================================================
// Lobby
// ============================================================================

#[tokio::test]
async fn lobby_enforces_capacity_and_names() {
    let mut config = common::quick_config();
    config.rounds.max_participants = 3;
    let h = Harness::with_config(config);
    let (m, _) = h.lobby(&["Ada", "Bo", "Cy"]).await;

    let err = h.arena.join_match(&m.id, "Di", false).await.unwrap_err();
    assert_eq!(rejection(&err), &Rejection::MatchFull { max: 3 });

    let (other, _) = h.lobby(&[]).await;
    let err = h.arena.join_match(&other.id, "   ", false).await.unwrap_err();
    assert!(matches!(rejection(&err), Rejection::InvalidName(_)));
    let long = "x".repeat(h.arena.config().answers.max_name_length + 1);
    let err = h.arena.join_match(&other.id, &long, false).await.unwrap_err();
    assert!(matches!(rejection(&err), Rejection::InvalidName(_)));
}

#[tokio::test]
async fn start_needs_host_and_enough_fighters() {
    let h = Harness::new();
    let (m, _) = h.lobby(&["Ada", "Bo"]).await;

    let err = h.arena.start_match(&m.id, "guess").await.unwrap_err();
    assert!(matches!(err, GameError::Unauthorized(_)));

    let err = h.arena.start_match(&m.id, &m.host_token).await.unwrap_err();
    assert_eq!(
        rejection(&err),
        &Rejection::NotEnoughFighters { min: 3, have: 2 }
    );
    assert_eq!(h.game(&m.id).await.status, Status::Lobby);
    assert!(!h.game(&m.id).await.transitioning);

    h.arena.join_match(&m.id, "Cy", false).await.unwrap();
    let first = h.arena.start_match(&m.id, &m.host_token).await.unwrap();
    assert_eq!(first.entered(), Some(Phase::PROMPTS));
    let second = h.arena.start_match(&m.id, &m.host_token).await.unwrap();
    assert!(matches!(second, Advance::RaceLost));

    let err = h.arena.join_match(&m.id, "Late", false).await.unwrap_err();
    assert!(matches!(rejection(&err), Rejection::WrongPhase { .. }));
}

#[tokio::test]
async fn tokens_authenticate_participants() {
    let h = Harness::new();
    let (_, f) = h.lobby(&["Ada"]).await;

    let actor = h.arena.authenticate(&f[0].id, &f[0].token).await.unwrap();
    assert_eq!(actor.id, f[0].id);
    assert_eq!(actor.role, Role::Fighter);

    let err = h.arena.authenticate(&f[0].id, "forged").await.unwrap_err();
    assert!(matches!(err, GameError::Unauthorized(_)));
    let err = h
        .arena
        .authenticate(&DocId::from("fighter_nobody"), "x")
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::NotFound { .. }));
}

#[tokio::test]
async fn bots_join_only_through_the_host() {
    let h = Harness::new();
    let (m, _) = h.lobby(&["Ada"]).await;

    let err = h.arena.add_bot(&m.id, "nope", "Robo").await.unwrap_err();
    assert!(matches!(err, GameError::Unauthorized(_)));

    let bot = h.arena.add_bot(&m.id, &m.host_token, "Robo").await.unwrap();
    assert!(bot.is_bot);
    assert_eq!(bot.hp, h.arena.config().rounds.starting_hp);
}

// ============================================================================
// Answers
// ============================================================================

#[tokio::test]
async fn answers_are_validated() {
    let h = Harness::new();
    let (m, f) = h.started(&["Ada", "Bo", "Cy"]).await;
    let prompts = h.prompts(&m.id).await;
    let ada = h.actor(&f[0].id).await;
    let cy = h.actor(&f[2].id).await;

    // First matchup is Ada vs Bo.
    let err = h
        .arena
        .submit_answer(&cy, &prompts[0].id, "not mine", None)
        .await
        .unwrap_err();
    assert_eq!(rejection(&err), &Rejection::NotAssigned);

    let err = h
        .arena
        .submit_answer(&ada, &prompts[0].id, "  \n ", None)
        .await
        .unwrap_err();
    assert_eq!(rejection(&err), &Rejection::EmptyAnswer);

    let max = h.arena.config().answers.max_length;
    let err = h
        .arena
        .submit_answer(&ada, &prompts[0].id, &"a".repeat(max + 1), None)
        .await
        .unwrap_err();
    assert_eq!(
        rejection(&err),
        &Rejection::AnswerTooLong { len: max + 1, max }
    );

    let err = h
        .arena
        .submit_answer(&ada, &prompts[0].id, "kick!", Some(AttackType::FlyingKick))
        .await
        .unwrap_err();
    assert_eq!(rejection(&err), &Rejection::AttackTypeNotAllowed);

    let ok = h
        .arena
        .submit_answer(&ada, &prompts[0].id, "  fine  ", None)
        .await
        .unwrap();
    assert_eq!(ok.author_id, f[0].id);
    assert_eq!(ok.submitted_by, f[0].id);
    assert_eq!(ok.text, "fine");

    let err = h
        .arena
        .submit_answer(&ada, &prompts[0].id, "again", None)
        .await
        .unwrap_err();
    assert_eq!(rejection(&err), &Rejection::DuplicateSubmission);
}

#[tokio::test]
async fn answers_outside_prompts_phase_are_refused() {
    let h = Harness::new();
    let (m, f) = h.started(&["Ada", "Bo", "Cy"]).await;
    h.answer_all(&m.id).await;
    assert_eq!(Phase::of(&h.game(&m.id).await), Phase::VOTING);

    let prompt = h.prompts(&m.id).await.remove(0);
    let err = h
        .arena
        .submit_answer(&h.actor(&f[0].id).await, &prompt.id, "late", None)
        .await
        .unwrap_err();
    assert!(matches!(rejection(&err), Rejection::WrongPhase { .. }));
}

#[tokio::test]
async fn all_answers_in_opens_the_first_battle() {
    let h = Harness::new();
    let (m, _) = h.started(&["Ada", "Bo", "Cy", "Di"]).await;
    let prompts = h.prompts(&m.id).await;
    let last = &prompts[1];
    h.answer_all_except(&m.id, &[(1, &last.assigned_to[1])]).await;
    assert_eq!(Phase::of(&h.game(&m.id).await), Phase::PROMPTS);

    let advance = h.arena.check_submissions(&m.id).await.unwrap();
    assert!(matches!(advance, Advance::NotReady(_)));

    let author = h.actor(&last.assigned_to[1]).await;
    h.arena
        .submit_answer(&author, &last.id, "last word", None)
        .await
        .unwrap();

    let game = h.game(&m.id).await;
    assert_eq!(Phase::of(&game), Phase::VOTING);
    assert_eq!(game.current_prompt_id, Some(prompts[0].id.clone()));
}

// ============================================================================
// Votes
// ============================================================================

#[tokio::test]
async fn votes_are_validated() {
    let h = Harness::new();
    let (m, f) = h.started(&["Ada", "Bo", "Cy", "Di"]).await;
    h.answer_all(&m.id).await;

    let prompts = h.prompts(&m.id).await;
    let current = &prompts[0];
    let ada_answer = DocId::submission(&current.id, &f[0].id);

    let err = h
        .arena
        .submit_vote(&h.actor(&f[0].id).await, &current.id, &ada_answer)
        .await
        .unwrap_err();
    assert_eq!(rejection(&err), &Rejection::CombatantCannotVote);

    let other_battle = DocId::submission(&prompts[1].id, &f[2].id);
    let err = h
        .arena
        .submit_vote(&h.actor(&f[3].id).await, &current.id, &other_battle)
        .await
        .unwrap_err();
    assert_eq!(rejection(&err), &Rejection::SubmissionNotInPrompt);

    let err = h
        .arena
        .submit_vote(&h.actor(&f[3].id).await, &prompts[1].id, &other_battle)
        .await
        .unwrap_err();
    assert!(matches!(rejection(&err), Rejection::WrongPhase { .. }));

    h.vote_for(&m.id, &f[3].id, &f[0].id).await;
    let err = h
        .arena
        .submit_vote(&h.actor(&f[3].id).await, &current.id, &ada_answer)
        .await
        .unwrap_err();
    assert_eq!(rejection(&err), &Rejection::DuplicateVote);
    assert_eq!(Phase::of(&h.game(&m.id).await), Phase::VOTING);
}

// ============================================================================
// Corner men
// ============================================================================

/// Six fighters through The Cut: Ed backs Di, Flo backs Cy.
async fn after_cut(h: &Harness) -> (roastbout::model::Match, Vec<roastbout::model::Fighter>) {
    let (m, f) = h.started(&["Ada", "Bo", "Cy", "Di", "Ed", "Flo"]).await;
    for (i, fighter) in f.iter().enumerate() {
        let hp = 100 - 10 * u32::try_from(i).unwrap();
        h.patch(&fighter.id, serde_json::json!({ "hp": hp })).await;
    }
    h.skip_to_round_results(&m.id, 1).await;
    h.arena.next_round(&m.id, &m.host_token).await.unwrap();
    (m, f)
}

#[tokio::test]
async fn corner_man_answers_for_the_captain() {
    let h = Harness::new();
    let (m, f) = after_cut(&h).await;
    let (di, ed) = (&f[3].id, &f[4].id);
    let jab = h.prompts(&m.id).await.remove(0);
    assert!(jab.is_combatant(di));

    let answer = h
        .arena
        .submit_answer(&h.actor(ed).await, &jab.id, "Crumbs", None)
        .await
        .unwrap();
    assert_eq!(answer.author_id, *di);
    assert_eq!(answer.submitted_by, *ed);

    let err = h
        .arena
        .submit_answer(&h.actor(di).await, &jab.id, "Mine", None)
        .await
        .unwrap_err();
    assert_eq!(rejection(&err), &Rejection::DuplicateSubmission);

    // Flo backs Cy, who is not on this prompt.
    let err = h
        .arena
        .submit_answer(&h.actor(&f[5].id).await, &jab.id, "Nope", None)
        .await
        .unwrap_err();
    assert_eq!(rejection(&err), &Rejection::NotAssigned);
}

#[tokio::test]
async fn suggestions_reach_the_captain() {
    let h = Harness::new();
    let (_, f) = after_cut(&h).await;
    let (di, ed) = (&f[3].id, &f[4].id);

    let err = h
        .arena
        .send_suggestion(&h.actor(di).await, "I am no corner man")
        .await
        .unwrap_err();
    assert_eq!(rejection(&err), &Rejection::NotCornerMan);

    let max = h.arena.config().answers.max_suggestion_length;
    let err = h
        .arena
        .send_suggestion(&h.actor(ed).await, &"y".repeat(max + 1))
        .await
        .unwrap_err();
    assert!(matches!(rejection(&err), Rejection::SuggestionTooLong { .. }));

    h.arena
        .send_suggestion(&h.actor(ed).await, "go for the haircut")
        .await
        .unwrap();
    let inbox = h.arena.suggestions_for(di).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].from_id, *ed);
    assert_eq!(inbox[0].text, "go for the haircut");
    assert!(h.arena.suggestions_for(&f[2].id).await.unwrap().is_empty());
}

// ============================================================================
// Scheduled actions
// ============================================================================

#[tokio::test]
async fn bots_play_a_round_on_their_own() {
    let h = Harness::new();
    let (m, f) = h.lobby(&["Ada"]).await;
    let ada = &f[0];
    for name in ["Robo", "Tron"] {
        h.arena.add_bot(&m.id, &m.host_token, name).await.unwrap();
    }
    h.arena.start_match(&m.id, &m.host_token).await.unwrap();

    // Ada answers; the bots answer through the scheduler.
    let prompts = h.prompts(&m.id).await;
    for prompt in prompts.iter().filter(|p| p.is_combatant(&ada.id)) {
        h.arena
            .submit_answer(&Actor::from(ada), &prompt.id, "human touch", None)
            .await
            .unwrap();
    }
    assert!(h.run_scheduled().await > 0);

    // Ada vs Robo: Tron is the only voter and a bot.
    let game = h.game(&m.id).await;
    assert_eq!(Phase::of(&game), Phase::REVEAL);
    assert_eq!(game.current_prompt_id, Some(prompts[0].id.clone()));

    // Tron vs Ada: Robo votes.
    h.arena.next_battle(&m.id, &m.host_token).await.unwrap();
    assert_eq!(Phase::of(&h.game(&m.id).await), Phase::VOTING);
    assert!(h.run_scheduled().await > 0);
    assert_eq!(Phase::of(&h.game(&m.id).await), Phase::REVEAL);

    let advance = h.arena.next_battle(&m.id, &m.host_token).await.unwrap();
    assert_eq!(advance.entered(), Some(Phase::ROUND_RESULTS));
}

#[tokio::test]
async fn stale_scheduled_actions_are_skipped() {
    let h = Harness::new();
    let (m, f) = h.started(&["Ada", "Bo", "Cy"]).await;
    let prompt = h.prompts(&m.id).await.remove(0);

    let stale = [
        ScheduledAction::BotAnswer {
            match_id: m.id.clone(),
            prompt_id: prompt.id.clone(),
            author_id: f[0].id.clone(),
            actor_id: f[0].id.clone(),
            round: 2,
        },
        ScheduledAction::BotVote {
            match_id: m.id.clone(),
            prompt_id: prompt.id.clone(),
            voter_id: f[2].id.clone(),
        },
        ScheduledAction::AdvanceBattle {
            match_id: m.id.clone(),
            prompt_id: prompt.id.clone(),
        },
        ScheduledAction::AdvanceRound {
            match_id: m.id.clone(),
            round: 1,
        },
        ScheduledAction::CleanupMatch {
            match_id: m.id.clone(),
        },
        ScheduledAction::CleanupMatch {
            match_id: DocId::from("match_gone"),
        },
    ];
    for action in stale {
        h.arena.handle(action).await.unwrap();
    }

    let game = h.game(&m.id).await;
    assert_eq!(Phase::of(&game), Phase::PROMPTS);
    assert!(
        h.db()
            .get::<roastbout::model::Submission>(&DocId::submission(&prompt.id, &f[0].id))
            .await
            .unwrap()
            .is_none()
    );
}
