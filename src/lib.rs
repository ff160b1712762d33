pub mod error;
pub mod metrics;
pub mod settings;
pub mod telemetry;
mod utils;

use std::{future::Future, sync::Arc, time::Duration};

use anyhow::Context;
use settings::SettingsStore;
use telemetry::{LogSink, Notification, NotificationSink, TelemetryController, TelemetrySnapshot};
use tokio::sync::{mpsc, watch};

pub use error::{TelemetryError, TelemetryResult};

const ENABLE_LOGS: bool = true;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Headless dashboard: connect the simulated device, print each update and
/// forward notifications to the log until Ctrl-C.
pub fn run() -> anyhow::Result<()> {
    let settings = SettingsStore::from_env()?;
    let config = settings.config().clone();

    let level = if config.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    // RUST_LOG still wins over the default level.
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    log::info!("Mindwave starting up (settings: {})...", settings.path().display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    runtime.block_on(async move {
        let (notification_tx, notification_rx) = mpsc::unbounded_channel();
        let controller = TelemetryController::new(&config, Arc::new(notification_tx));

        let forwarder = tokio::spawn(forward_notifications(notification_rx, LogSink));
        let dashboard = tokio::spawn(render_updates(controller.subscribe()));

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        if connect_until(&controller, shutdown.as_mut()).await? {
            shutdown.await.context("failed to listen for Ctrl-C")?;
        } else {
            log::info!("Interrupted before the device finished connecting");
        }

        controller.disconnect().await;
        let snapshot = controller.snapshot().await;
        log::info!(
            "Session ended with {} readings in history (threshold {})",
            snapshot.history.len(),
            snapshot.threshold
        );

        dashboard.abort();
        drop(controller);
        // The channel closes once the last controller clone is gone.
        let _ = tokio::time::timeout(SHUTDOWN_GRACE, forwarder).await;
        Ok::<(), anyhow::Error>(())
    })
}

/// Run the handshake unless `shutdown` resolves first, in which case the
/// pending attempt is abandoned. Returns `false` when interrupted.
async fn connect_until<F: Future>(
    controller: &TelemetryController,
    shutdown: F,
) -> anyhow::Result<bool> {
    tokio::select! {
        result = controller.connect() => {
            if let Err(err) = result {
                crate::log_error!("Could not connect to EEG device: {}", err);
                return Err(anyhow::Error::new(err));
            }
            Ok(true)
        }
        _ = shutdown => {
            controller.disconnect().await;
            Ok(false)
        }
    }
}

/// Adapter between the controller's channel and a toast-style sink.
async fn forward_notifications(
    mut rx: mpsc::UnboundedReceiver<Notification>,
    sink: impl NotificationSink,
) {
    while let Some(notification) = rx.recv().await {
        sink.notify(notification);
    }
}

async fn render_updates(mut updates: watch::Receiver<TelemetrySnapshot>) {
    while updates.changed().await.is_ok() {
        let snapshot = updates.borrow_and_update().clone();
        let (Some(reading), Some(stats)) = (snapshot.current_reading, snapshot.stats) else {
            continue;
        };
        log::info!(
            "anxiety {:>3} ({}) | avg {:>5.1} | alpha {:>4.1} beta {:>4.1} gamma {:>4.1} | {} of last readings above {}",
            reading.anxiety_score,
            reading.level(snapshot.threshold).as_str(),
            stats.anxiety_score_avg,
            reading.alpha,
            reading.beta,
            reading.gamma,
            stats.readings_above_threshold,
            snapshot.threshold
        );
    }
}
