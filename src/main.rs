// House points board entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Build the schedule, fetch client, and priority coordinator
// 4. Create mpsc channels
// 5. Spawn the driver task
// 6. Run the TUI event loop (blocking until the user quits)
// 7. Cleanup on exit

use hillboard::config;
use hillboard::driver;
use hillboard::fetch::BoardClient;
use hillboard::priority::PriorityCoordinator;
use hillboard::schedule::Schedule;
use hillboard::tui;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("hillboard starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        endpoint = %config.endpoint_url,
        poll_interval = config.schedule.poll_interval_secs,
        quiet_start = %config.schedule.quiet_start,
        quiet_end = %config.schedule.quiet_end,
        "config loaded"
    );

    // 3. Build the schedule, fetch client, and priority coordinator
    let schedule = Schedule::from_config(&config.schedule);
    let client = BoardClient::new(config.endpoint_url.clone());
    let coordinator = PriorityCoordinator::from_config(&config.coordination);

    // 4. Create mpsc channels
    let (fetch_tx, fetch_rx) = mpsc::channel(64);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let state = driver::DriverState::new(schedule, client, coordinator, fetch_tx);

    // 5. Spawn the driver task
    let driver_handle = tokio::spawn(async move {
        if let Err(e) = driver::run(fetch_rx, cmd_rx, ui_tx, state).await {
            error!("driver loop error: {e}");
        }
    });

    // 6. Run the TUI event loop (blocking until the user quits)
    if let Err(e) = tui::run(ui_rx, cmd_tx).await {
        error!("TUI error: {e}");
    }

    // 7. Cleanup: wait for the driver to release its lease and exit.
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = driver_handle.await;
    })
    .await;

    info!("hillboard shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (not the terminal, which is used by
/// the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("hillboard.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hillboard=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
