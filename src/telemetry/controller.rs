use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    error::{TelemetryError, TelemetryResult},
    settings::TelemetryConfig,
};

use super::{
    generator::{ReadingSource, SimulatedSource},
    state::{ConnectionStatus, TelemetrySnapshot, TelemetryState},
    Notification, NotificationSink,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

const INTERRUPTED: &str = "connection attempt interrupted";

struct Inner {
    state: TelemetryState,
    source: Box<dyn ReadingSource>,
}

/// Owns the simulated device: connection lifecycle, the one-second ticker and
/// the published snapshot. Cheap to clone; all clones share one device.
#[derive(Clone)]
pub struct TelemetryController {
    inner: Arc<Mutex<Inner>>,
    snapshot_tx: Arc<watch::Sender<TelemetrySnapshot>>,
    sink: Arc<dyn NotificationSink>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    pending_connect: Arc<Mutex<Option<CancellationToken>>>,
    tick_interval: Duration,
    connect_latency: Duration,
    debug: bool,
}

impl TelemetryController {
    pub fn new(config: &TelemetryConfig, sink: Arc<dyn NotificationSink>) -> Self {
        let source: Box<dyn ReadingSource> = match config.seed {
            Some(seed) => Box::new(SimulatedSource::seeded(seed)),
            None => Box::new(SimulatedSource::from_entropy()),
        };
        Self::with_source(config, source, sink)
    }

    pub fn with_source(
        config: &TelemetryConfig,
        source: Box<dyn ReadingSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let state = TelemetryState::new(config);
        let (snapshot_tx, _) = watch::channel(state.snapshot());

        Self {
            inner: Arc::new(Mutex::new(Inner { state, source })),
            snapshot_tx: Arc::new(snapshot_tx),
            sink,
            ticker: Arc::new(Mutex::new(None)),
            pending_connect: Arc::new(Mutex::new(None)),
            tick_interval: config.tick_interval(),
            connect_latency: config.connect_latency(),
            debug: config.debug,
        }
    }

    pub async fn snapshot(&self) -> TelemetrySnapshot {
        self.inner.lock().await.state.snapshot()
    }

    pub async fn status(&self) -> ConnectionStatus {
        self.inner.lock().await.state.status()
    }

    /// Receiver that sees every published snapshot. History and stats in a
    /// received snapshot always belong to the same update.
    pub fn subscribe(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Run the simulated handshake and start ticking. Returns immediately with
    /// the current snapshot if a connection exists or is in progress.
    pub async fn connect(&self) -> TelemetryResult<TelemetrySnapshot> {
        let token = {
            let mut inner = self.inner.lock().await;
            if !inner.state.begin_connecting() {
                return Ok(inner.state.snapshot());
            }
            let token = CancellationToken::new();
            *self.pending_connect.lock().await = Some(token.clone());
            self.publish(&inner.state);
            token
        };

        log_info!(
            "Connecting to simulated EEG device ({}ms handshake)",
            self.connect_latency.as_millis()
        );

        tokio::select! {
            _ = time::sleep(self.connect_latency) => {}
            _ = token.cancelled() => {}
        }

        let mut inner = self.inner.lock().await;
        // Whoever cancelled the token already moved the state back to
        // Disconnected and reported the failure.
        if token.is_cancelled() {
            log_warn!("EEG connection attempt interrupted");
            return Err(TelemetryError::Connection(INTERRUPTED.to_string()));
        }
        self.pending_connect.lock().await.take();

        let session_id = Uuid::new_v4().to_string();
        let Some(notifications) = inner.state.finish_connecting(session_id.clone(), Utc::now())
        else {
            let notifications = inner.state.fail_connecting(INTERRUPTED);
            self.deliver(notifications);
            self.publish(&inner.state);
            return Err(TelemetryError::Connection(INTERRUPTED.to_string()));
        };

        self.spawn_ticker(session_id.clone()).await;
        self.deliver(notifications);
        self.publish(&inner.state);

        log_info!("EEG device connected, session {}", session_id);
        Ok(inner.state.snapshot())
    }

    /// Stop ticking. After this returns no further reading is recorded until
    /// the next `connect`. Interrupts a pending handshake.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        match inner.state.status() {
            ConnectionStatus::Disconnected => {}
            ConnectionStatus::Connecting => {
                if let Some(token) = self.pending_connect.lock().await.take() {
                    token.cancel();
                }
                let notifications = inner.state.fail_connecting(INTERRUPTED);
                self.deliver(notifications);
                self.publish(&inner.state);
            }
            ConnectionStatus::Connected => {
                let notifications = inner.state.disconnect();
                self.cancel_ticker().await;
                self.deliver(notifications);
                self.publish(&inner.state);
                log_info!(
                    "EEG device disconnected ({} readings kept)",
                    inner.state.history().len()
                );
            }
        }
    }

    pub async fn set_threshold(&self, value: f64) -> TelemetryResult<()> {
        let mut inner = self.inner.lock().await;
        let notifications = inner.state.set_threshold(value).map_err(|err| {
            log_warn!("Rejected threshold update: {}", err);
            err
        })?;
        self.deliver(notifications);
        self.publish(&inner.state);
        Ok(())
    }

    /// Drop all readings and stats. Connection status and threshold are kept.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        let notifications = inner.state.clear();
        self.deliver(notifications);
        self.publish(&inner.state);
    }

    async fn spawn_ticker(&self, session_id: String) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        // Weak handles: the ticker must not keep the device alive once every
        // controller clone is gone.
        let weak_inner = Arc::downgrade(&self.inner);
        let weak_snapshot_tx = Arc::downgrade(&self.snapshot_tx);
        let weak_sink = Arc::downgrade(&self.sink);
        let tick_interval = self.tick_interval;
        let debug = self.debug;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let (Some(inner), Some(snapshot_tx), Some(sink)) =
                    (weak_inner.upgrade(), weak_snapshot_tx.upgrade(), weak_sink.upgrade())
                else {
                    log_debug!("controller dropped, ticker for session {} exiting", session_id);
                    break;
                };

                let mut guard = inner.lock().await;
                if !guard.state.accepts_ticks_from(&session_id) {
                    break;
                }

                let Inner { state, source } = &mut *guard;
                let reading = source.next_reading(Utc::now().timestamp_millis());
                let notifications = state.record_reading(reading);

                if debug {
                    log_debug!(
                        "tick: score={} alpha={:.2} beta={:.2} gamma={:.2} history={}",
                        reading.anxiety_score,
                        reading.alpha,
                        reading.beta,
                        reading.gamma,
                        state.history().len()
                    );
                }

                for notification in notifications {
                    sink.notify(notification);
                }
                snapshot_tx.send_replace(state.snapshot());
            }

            log_debug!("ticker for session {} stopped", session_id);
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    fn deliver(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            self.sink.notify(notification);
        }
    }

    fn publish(&self, state: &TelemetryState) {
        self.snapshot_tx.send_replace(state.snapshot());
    }
}
