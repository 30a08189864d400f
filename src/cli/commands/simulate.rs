//! `simulate`: plays a complete all-bot match in memory.
//!
//! Scheduled actions are recorded rather than slept on and executed in
//! delay order, so a full match runs in a fraction of a second. Host
//! controls are pressed whenever nothing else is pending.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::arena::{Arena, MatchView};
use crate::bots::HeckleBot;
use crate::cli::args::{OutputFormat, SimulateArgs};
use crate::config::loader::load_or_default;
use crate::error::RoastboutError;
use crate::model::{DocId, Role};
use crate::observability::{EventEmitter, init_metrics};
use crate::phase::Phase;
use crate::scheduler::{RecordingScheduler, ScheduledAction};
use crate::store::Db;

/// Upper bound on driver iterations before a match counts as stuck.
const MAX_STEPS: usize = 100_000;

const BOT_NAMES: &[&str] = &[
    "Sucker Punch",
    "Glass Jaw",
    "Low Blow",
    "Rope-a-Dope",
    "Haymaker Hal",
    "Kid Clapback",
    "Lady Left Hook",
    "The Bell",
];

/// Display name for the `i`th bot.
#[must_use]
pub fn bot_name(i: usize) -> String {
    let base = BOT_NAMES[i % BOT_NAMES.len()];
    match i / BOT_NAMES.len() {
        0 => base.to_string(),
        n => format!("{base} {}", n + 1),
    }
}

/// Finished match plus the number of scheduled actions it took.
#[derive(Debug)]
pub struct Playout {
    /// Final state
    pub view: MatchView,
    /// Scheduled actions executed
    pub actions: usize,
}

/// Drives a started match to RESULTS.
///
/// Cleanup actions are not executed so the finished match stays readable.
/// `cancel` is checked between steps.
///
/// # Errors
///
/// [`RoastboutError::Simulation`] if the match stops making progress,
/// [`RoastboutError::Interrupted`] once `cancel` fires; storage failures
/// propagate.
pub async fn play_out(
    arena: &Arena,
    scheduler: &RecordingScheduler,
    match_id: &DocId,
    host_token: &str,
    cancel: &CancellationToken,
) -> Result<Playout, RoastboutError> {
    let mut actions = 0;

    for _ in 0..MAX_STEPS {
        if cancel.is_cancelled() {
            warn!(%match_id, actions, "simulation interrupted");
            return Err(RoastboutError::Interrupted);
        }
        let due = scheduler.drain();
        if !due.is_empty() {
            for action in due {
                if matches!(action, ScheduledAction::CleanupMatch { .. }) {
                    continue;
                }
                arena.handle(action).await?;
                actions += 1;
            }
            continue;
        }

        let view = arena.match_view(match_id).await?;
        let phase = Phase::of(&view.game);
        let advance = match phase {
            p if p.is_terminal() => return Ok(Playout { view, actions }),
            Phase::REVEAL => arena.next_battle(match_id, host_token).await?,
            Phase::ROUND_RESULTS => arena.next_round(match_id, host_token).await?,
            other => {
                return Err(RoastboutError::Simulation(format!(
                    "nothing left to do during {other}"
                )));
            }
        };
        if !advance.is_advanced() {
            return Err(RoastboutError::Simulation(format!(
                "host could not advance from {phase}"
            )));
        }
    }

    Err(RoastboutError::Simulation(format!(
        "no result after {MAX_STEPS} steps"
    )))
}

/// What `simulate` prints.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    /// Match id
    pub match_id: DocId,
    /// Champion's name
    pub winner: Option<String>,
    /// Why the match ended
    pub end_reason: Option<String>,
    /// Last round reached
    pub rounds_played: u8,
    /// Participants knocked out
    pub knockouts: usize,
    /// Scheduled bot actions executed
    pub actions: usize,
    /// Events written to the event stream
    pub events: u64,
    /// `(name, hp, role)`, live fighters first
    pub standings: Vec<(String, u32, Role)>,
}

impl Summary {
    fn new(playout: &Playout, events: u64) -> Self {
        let view = &playout.view;
        let winner = view
            .game
            .winner_id
            .as_ref()
            .and_then(|id| view.participant(id))
            .map(|f| f.name.clone());

        let mut standings: Vec<_> = view.participants.iter().collect();
        standings.sort_by_key(|f| (!f.is_live_fighter(), std::cmp::Reverse(f.hp), f.seq));

        Self {
            match_id: view.game.id.clone(),
            winner,
            end_reason: view.game.end_reason.clone(),
            rounds_played: view.game.current_round,
            knockouts: view.participants.iter().filter(|f| f.knocked_out).count(),
            actions: playout.actions,
            events,
            standings: standings
                .into_iter()
                .map(|f| (f.name.clone(), f.hp, f.role))
                .collect(),
        }
    }

    fn print_human(&self) {
        println!(
            "Match {} ended after round {} ({})",
            self.match_id,
            self.rounds_played,
            self.end_reason.as_deref().unwrap_or("unknown")
        );
        match &self.winner {
            Some(name) => println!("Champion:  {name}"),
            None => println!("Champion:  none"),
        }
        println!("Knockouts: {}", self.knockouts);
        println!("Actions:   {}\n", self.actions);
        for (name, hp, role) in &self.standings {
            let role = match role {
                Role::Fighter => "fighter",
                Role::CornerMan => "corner man",
            };
            println!("  {name:<20}{hp:>5} HP  {role}");
        }
    }
}

/// Runs `simulate`.
///
/// # Errors
///
/// Configuration, I/O and simulation failures.
pub async fn run(args: &SimulateArgs, cancel: &CancellationToken) -> Result<(), RoastboutError> {
    let loaded = load_or_default(args.config.as_ref())?;
    for warning in &loaded.warnings {
        warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }
    let config = loaded.config;

    let rounds = &config.rounds;
    if args.fighters < rounds.min_fighters || args.fighters > rounds.max_participants {
        return Err(RoastboutError::Usage(format!(
            "--fighters must be between {} and {}",
            rounds.min_fighters, rounds.max_participants
        )));
    }

    if args.metrics_port.is_some() {
        init_metrics(args.metrics_port)?;
    }

    let events = Arc::new(match &args.events_file {
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::stderr(),
    });
    let scheduler = Arc::new(RecordingScheduler::new());
    let mut arena =
        Arena::new(Db::memory(), config, scheduler.clone()).with_events(Arc::clone(&events));
    if let Some(seed) = args.seed {
        arena = arena
            .with_seed(seed)
            .with_strategy(Arc::new(HeckleBot::seeded(seed)));
    }

    let m = arena.create_match("Simulated bout").await?;
    for i in 0..args.fighters {
        arena.add_bot(&m.id, &m.host_token, &bot_name(i)).await?;
    }
    arena.start_match(&m.id, &m.host_token).await?;
    info!(match_id = %m.id, fighters = args.fighters, "simulation started");

    let playout = play_out(&arena, &scheduler, &m.id, &m.host_token, cancel).await?;
    let summary = Summary::new(&playout, events.event_count());

    match args.format {
        OutputFormat::Human => summary.print_human(),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_names_wrap_with_suffix() {
        assert_eq!(bot_name(0), "Sucker Punch");
        assert_eq!(bot_name(BOT_NAMES.len()), "Sucker Punch 2");
        assert_eq!(bot_name(BOT_NAMES.len() * 2 + 1), "Glass Jaw 3");
    }

    #[tokio::test]
    async fn seeded_simulation_reaches_results() {
        let scheduler = Arc::new(RecordingScheduler::new());
        let arena = Arena::new(
            Db::memory(),
            Arc::new(crate::config::GameConfig::default()),
            scheduler.clone(),
        )
        .with_seed(7)
        .with_strategy(Arc::new(HeckleBot::seeded(7)));

        let m = arena.create_match("test").await.unwrap();
        for i in 0..6 {
            arena.add_bot(&m.id, &m.host_token, &bot_name(i)).await.unwrap();
        }
        arena.start_match(&m.id, &m.host_token).await.unwrap();

        let playout = play_out(&arena, &scheduler, &m.id, &m.host_token, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(playout.view.game.status, crate::model::Status::Results);
        assert!(playout.actions > 0);

        let summary = Summary::new(&playout, 0);
        assert_eq!(summary.standings.len(), 6);
        assert!(summary.end_reason.is_some());
    }

    #[tokio::test]
    async fn cancelled_simulation_stops_before_results() {
        let scheduler = Arc::new(RecordingScheduler::new());
        let arena = Arena::new(
            Db::memory(),
            Arc::new(crate::config::GameConfig::default()),
            scheduler.clone(),
        );
        let m = arena.create_match("test").await.unwrap();
        for i in 0..3 {
            arena.add_bot(&m.id, &m.host_token, &bot_name(i)).await.unwrap();
        }
        arena.start_match(&m.id, &m.host_token).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = play_out(&arena, &scheduler, &m.id, &m.host_token, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RoastboutError::Interrupted));
        assert_eq!(
            arena.match_view(&m.id).await.unwrap().game.status,
            crate::model::Status::Prompts
        );
    }
}
