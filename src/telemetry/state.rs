use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{TelemetryError, TelemetryResult},
    metrics::{compute_stats, History, Reading, Stats, StatsWindows, MAX_THRESHOLD, MIN_THRESHOLD},
    settings::{AlertPolicy, TelemetryConfig},
};

use super::Notification;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Read-only view published to subscribers after every mutation.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub connected: bool,
    pub connecting: bool,
    pub session_id: Option<String>,
    pub connected_at: Option<DateTime<Utc>>,
    pub current_reading: Option<Reading>,
    pub history: Vec<Reading>,
    pub stats: Option<Stats>,
    pub threshold: f64,
}

/// Connection status, history and derived stats. Every transition is
/// synchronous and returns the notifications it produced; the controller is
/// responsible for timers and delivery.
#[derive(Debug, Clone)]
pub struct TelemetryState {
    status: ConnectionStatus,
    session_id: Option<String>,
    connected_at: Option<DateTime<Utc>>,
    history: History,
    current_reading: Option<Reading>,
    stats: Option<Stats>,
    threshold: f64,
    windows: StatsWindows,
    alert_min_readings: usize,
    alert_policy: AlertPolicy,
    /// Set while the alert condition holds, for `AlertPolicy::OncePerEpisode`.
    alerting: bool,
}

impl TelemetryState {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            session_id: None,
            connected_at: None,
            history: History::with_capacity(config.history_capacity),
            current_reading: None,
            stats: None,
            threshold: config.default_threshold,
            windows: config.windows(),
            alert_min_readings: config.alert_min_readings,
            alert_policy: config.alert_policy,
            alerting: false,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn connected_at(&self) -> Option<DateTime<Utc>> {
        self.connected_at
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn current_reading(&self) -> Option<&Reading> {
        self.current_reading.as_ref()
    }

    pub fn stats(&self) -> Option<&Stats> {
        self.stats.as_ref()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns `false` when already connecting or connected.
    pub fn begin_connecting(&mut self) -> bool {
        if self.status != ConnectionStatus::Disconnected {
            return false;
        }
        self.status = ConnectionStatus::Connecting;
        true
    }

    /// Completes a pending attempt. Returns `None` if the attempt was
    /// abandoned in the meantime.
    pub fn finish_connecting(
        &mut self,
        session_id: String,
        now: DateTime<Utc>,
    ) -> Option<Vec<Notification>> {
        if self.status != ConnectionStatus::Connecting {
            return None;
        }
        self.status = ConnectionStatus::Connected;
        self.session_id = Some(session_id.clone());
        self.connected_at = Some(now);
        Some(vec![Notification::Connected { session_id }])
    }

    pub fn fail_connecting(&mut self, reason: &str) -> Vec<Notification> {
        self.status = ConnectionStatus::Disconnected;
        self.session_id = None;
        self.connected_at = None;
        vec![Notification::ConnectionFailed {
            reason: reason.to_string(),
        }]
    }

    /// Drops a `Connected` session. History is kept so a reconnect resumes it.
    pub fn disconnect(&mut self) -> Vec<Notification> {
        if self.status != ConnectionStatus::Connected {
            return Vec::new();
        }
        self.status = ConnectionStatus::Disconnected;
        self.session_id = None;
        self.connected_at = None;
        vec![Notification::Disconnected]
    }

    /// Whether a ticker spawned for `session_id` may still mutate state.
    pub fn accepts_ticks_from(&self, session_id: &str) -> bool {
        self.status == ConnectionStatus::Connected && self.session_id.as_deref() == Some(session_id)
    }

    /// Append a reading and recompute stats. Timestamps are clamped so the
    /// sequence never goes backwards.
    pub fn record_reading(&mut self, mut reading: Reading) -> Vec<Notification> {
        if let Some(last) = self.history.latest() {
            reading.timestamp = reading.timestamp.max(last.timestamp);
        }
        self.history.push(reading);
        self.current_reading = Some(reading);
        self.recompute()
    }

    pub fn set_threshold(&mut self, value: f64) -> TelemetryResult<Vec<Notification>> {
        if !(MIN_THRESHOLD..=MAX_THRESHOLD).contains(&value) {
            return Err(TelemetryError::InvalidThreshold(value));
        }
        self.threshold = value;

        let mut notifications = vec![Notification::ThresholdUpdated { threshold: value }];
        if self.current_reading.is_some() && !self.history.is_empty() {
            notifications.extend(self.recompute());
        }
        Ok(notifications)
    }

    pub fn clear(&mut self) -> Vec<Notification> {
        self.history.clear();
        self.current_reading = None;
        self.stats = None;
        self.alerting = false;
        vec![Notification::ReadingsCleared]
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            connected: self.status == ConnectionStatus::Connected,
            connecting: self.status == ConnectionStatus::Connecting,
            session_id: self.session_id.clone(),
            connected_at: self.connected_at,
            current_reading: self.current_reading,
            history: self.history.to_vec(),
            stats: self.stats,
            threshold: self.threshold,
        }
    }

    fn recompute(&mut self) -> Vec<Notification> {
        self.stats = self
            .current_reading
            .as_ref()
            .and_then(|current| compute_stats(&self.history, current, self.threshold, self.windows));

        let Some(stats) = self.stats.as_ref() else {
            self.alerting = false;
            return Vec::new();
        };

        let condition =
            stats.threshold_exceeded && stats.readings_above_threshold >= self.alert_min_readings;
        let fire = match self.alert_policy {
            AlertPolicy::EveryRecompute => condition,
            AlertPolicy::OncePerEpisode => condition && !self.alerting,
        };
        self.alerting = condition;

        if fire {
            vec![Notification::Alert {
                threshold: self.threshold,
                score: stats.current_reading.anxiety_score,
            }]
        } else {
            Vec::new()
        }
    }
}
