pub mod controller;
pub mod events;
pub mod generator;
pub mod state;

pub use controller::TelemetryController;
pub use events::{LogSink, Notification, NotificationSink, Severity};
pub use generator::{ReadingSource, ScriptedSource, SimulatedSource};
pub use state::{ConnectionStatus, TelemetrySnapshot, TelemetryState};
