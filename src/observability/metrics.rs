//! Metrics collection for `roastbout`.
//!
//! Prometheus-compatible metrics behind the `metrics` facade. Every label
//! value comes from a closed set (phase names, rejection reasons, combo
//! tiers, round numbers), so cardinality stays bounded.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::damage::ComboTier;
use crate::error::{Rejection, RoastboutError};

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `RoastboutError::Io` if the recorder or HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), RoastboutError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| RoastboutError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "roastbout_transitions_total",
        "Phase transitions committed, by target phase"
    );
    describe_counter!(
        "roastbout_race_losses_total",
        "Transition attempts that found the guard taken or the phase moved"
    );
    describe_counter!(
        "roastbout_rejections_total",
        "Submissions, votes and lobby actions refused, by reason"
    );
    describe_counter!("roastbout_knockouts_total", "Knockouts, by round");
    describe_counter!("roastbout_combos_total", "Combos landed, by tier");
    describe_counter!(
        "roastbout_bot_actions_total",
        "Scheduled bot actions executed, by kind"
    );
    describe_histogram!("roastbout_damage_dealt", "Damage per side per battle");
    describe_gauge!("roastbout_matches_active", "Matches not yet cleaned up");
}

/// Records a committed transition.
pub fn record_transition(to: &'static str) {
    counter!("roastbout_transitions_total", "to" => to).increment(1);
}

/// Records a lost transition race.
pub fn record_race_loss() {
    counter!("roastbout_race_losses_total").increment(1);
}

/// Records a rejected action.
pub fn record_rejection(rejection: &Rejection) {
    counter!("roastbout_rejections_total", "reason" => rejection.label()).increment(1);
}

/// Records a knockout.
pub fn record_knockout(round: u8) {
    counter!("roastbout_knockouts_total", "round" => round.to_string()).increment(1);
}

/// Records a combo. [`ComboTier::None`] is not counted.
pub fn record_combo(tier: ComboTier) {
    if tier != ComboTier::None {
        counter!("roastbout_combos_total", "tier" => tier.label()).increment(1);
    }
}

/// Records a scheduled bot action.
pub fn record_bot_action(kind: &'static str) {
    counter!("roastbout_bot_actions_total", "kind" => kind).increment(1);
}

/// Records damage dealt to one side.
pub fn record_damage(round: u8, damage: u32) {
    histogram!("roastbout_damage_dealt", "round" => round.to_string()).record(f64::from(damage));
}

/// A match was created.
pub fn match_opened() {
    gauge!("roastbout_matches_active").increment(1.0);
}

/// A match was cleaned up.
pub fn match_closed() {
    gauge!("roastbout_matches_active").decrement(1.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_transition("VOTING");
        record_race_loss();
        record_rejection(&Rejection::DuplicateVote);
        record_knockout(2);
        record_combo(ComboTier::Finisher);
        record_combo(ComboTier::None);
        record_bot_action("vote");
        record_damage(1, 14);
        match_opened();
        match_closed();
    }
}
