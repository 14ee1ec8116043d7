//! Time-triggered entry point: runs the check-and-start sweep and only logs.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::report::RestartTally;
use crate::server::AppState;
use crate::types::Outcome;

pub async fn run_check(state: &AppState) {
    info!("scheduled check of all accounts starting");
    let accounts = state.accounts();
    if accounts.is_empty() {
        warn!("no accounts configured, skipping scheduled check");
        return;
    }

    let results = state.remediator().check_and_start(&accounts).await;
    let healthy = results.iter().filter(|r| r.status == Outcome::Healthy).count();
    let tally = RestartTally::from_results(&results);
    info!(
        "scheduled check finished: {} accounts, {} healthy, {} started, {} failed",
        accounts.len(),
        healthy,
        tally.started,
        tally.failed
    );
}

/// Runs `run_check` on a fixed period, starting immediately.
pub async fn run_every(state: Arc<AppState>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        run_check(&state).await;
    }
}
