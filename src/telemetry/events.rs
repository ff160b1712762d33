use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Info,
    Destructive,
}

/// Discrete notifications the dashboard surfaces as toasts.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Notification {
    #[serde(rename_all = "camelCase")]
    Connected { session_id: String },
    Disconnected,
    ConnectionFailed { reason: String },
    Alert { threshold: f64, score: f64 },
    ThresholdUpdated { threshold: f64 },
    ReadingsCleared,
}

impl Notification {
    pub fn severity(&self) -> Severity {
        match self {
            Notification::ConnectionFailed { .. } | Notification::Alert { .. } => {
                Severity::Destructive
            }
            _ => Severity::Info,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Notification::Connected { .. } => "Device Connected",
            Notification::Disconnected => "Device Disconnected",
            Notification::ConnectionFailed { .. } => "Connection Failed",
            Notification::Alert { .. } => "Anxiety Level Alert",
            Notification::ThresholdUpdated { .. } => "Threshold Updated",
            Notification::ReadingsCleared => "Data Cleared",
        }
    }

    pub fn description(&self) -> String {
        match self {
            Notification::Connected { .. } => {
                "EEG monitoring device connected successfully.".to_string()
            }
            Notification::Disconnected => "EEG monitoring device disconnected.".to_string(),
            Notification::ConnectionFailed { reason } => {
                format!("Could not connect to EEG device ({reason}). Please try again.")
            }
            Notification::Alert { threshold, score } => format!(
                "Your anxiety score ({score:.0}) is above threshold ({threshold}). \
                 Consider relaxation or booking a consultation."
            ),
            Notification::ThresholdUpdated { threshold } => {
                format!("Anxiety alert threshold set to {threshold}.")
            }
            Notification::ReadingsCleared => "All EEG readings have been cleared.".to_string(),
        }
    }
}

/// Receives notifications from the telemetry controller. Implementations must
/// not block: `notify` is called while the telemetry state lock is held.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

impl NotificationSink for UnboundedSender<Notification> {
    fn notify(&self, notification: Notification) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.send(notification);
    }
}

/// Writes every notification to the log. Used by the headless binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, notification: Notification) {
        match notification.severity() {
            Severity::Info => log::info!("{}: {}", notification.title(), notification.description()),
            Severity::Destructive => {
                log::warn!("{}: {}", notification.title(), notification.description())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_is_destructive_and_names_threshold() {
        let alert = Notification::Alert {
            threshold: 70.0,
            score: 82.0,
        };
        assert_eq!(alert.severity(), Severity::Destructive);
        assert!(alert.description().contains("(70)"));
        assert!(alert.description().contains("(82)"));
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(Notification::Connected {
            session_id: "abc".into(),
        })
        .unwrap();
        assert_eq!(json["kind"], "connected");
        assert_eq!(json["sessionId"], "abc");
    }

    #[test]
    fn channel_sink_ignores_closed_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        tx.notify(Notification::Disconnected);
    }
}
