use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chaos_core::api::{self, AppState};
use chaos_core::config::Config;
use chaos_core::{Destroyer, InMemoryStateProvider, StateProvider, TaskUriBuilder};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::dispatch;

/// Serve the HTTP surface and fire scheduled runs until either stops.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let destroyer = Arc::new(dispatch::build_destroyer(config, config.dry_run)?);
    let run_state: Arc<dyn StateProvider> = Arc::new(InMemoryStateProvider::default());

    info!(
        "Destruction schedule: every {}s{}",
        config.schedule_secs,
        if config.dry_run { " (dry run)" } else { "" }
    );
    let scheduler = tokio::spawn(schedule_loop(
        Arc::clone(&destroyer),
        Arc::clone(&run_state),
        config.schedule(),
    ));

    let addr: SocketAddr = config.listen.parse()?;
    let app = AppState {
        destroyer,
        run_state,
        uri_builder: TaskUriBuilder::new(&config.base_url),
    };

    tokio::select! {
        served = api::serve(addr, app) => served?,
        scheduled = scheduler => scheduled?,
    }

    Ok(())
}

/// Each tick waits for its run to finish before the next tick is armed.
async fn schedule_loop(
    destroyer: Arc<Destroyer>,
    run_state: Arc<dyn StateProvider>,
    period: Duration,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        if let Err(e) = destroyer.scheduled_run(run_state.as_ref()).await {
            error!("Scheduled run failed: {}", e);
        }
    }
}
