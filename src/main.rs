use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use apps_watchdog::config::load_settings;
use apps_watchdog::server::{self, AppState};
use apps_watchdog::telegram::Notifier;
use apps_watchdog::{scheduler, SystemEnvironment};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let settings = load_settings()?;

    let state = Arc::new(AppState::new(
        SystemEnvironment,
        Notifier::new(settings.telegram_api_base.clone()),
    ));
    info!("accounts = {}", state.accounts().len());

    // One-shot mode for external schedulers (cron, CronJob)
    if settings.run_once {
        scheduler::run_check(&state).await;
        return Ok(());
    }

    if settings.check_interval_secs > 0 {
        info!("scheduled check every {}s", settings.check_interval_secs);
        tokio::spawn(scheduler::run_every(
            state.clone(),
            Duration::from_secs(settings.check_interval_secs),
        ));
    }

    server::serve(settings.bind_addr, state).await
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}
