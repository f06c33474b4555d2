//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DoorbellService / ConnectivityManager
//! ```
//!
//! Driven adapters (ADC, Wi-Fi, MQTT client, log output) implement these
//! traits.  The domain consumes them via generics, so it never touches
//! hardware or sockets directly.

use crate::error::{LinkError, PublishError, SensorError};
use crate::sensors::SampleReading;

use super::messages::Message;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this once per sample tick.
pub trait SensorPort {
    /// Take one analog reading.  Must not block beyond a single ADC
    /// conversion.
    fn read_sample(&mut self) -> Result<SampleReading, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Publisher (domain → connectivity)
// ───────────────────────────────────────────────────────────────

/// The only outbound capability the detection core sees.
pub trait Publisher {
    /// Publish a domain message, stamped with the current monotonic time.
    ///
    /// Returns [`PublishError::NotConnected`] when no session is up; the
    /// implementation decides whether the message is held for later.
    fn publish(&mut self, message: Message, now_ms: u64) -> Result<(), PublishError>;
}

// ───────────────────────────────────────────────────────────────
// Link port (driven adapter: network link)
// ───────────────────────────────────────────────────────────────

/// Network link underneath the MQTT session (Wi-Fi station).
pub trait LinkPort {
    /// Begin connecting.  Non-blocking: completion is observed via
    /// [`is_connected`](Self::is_connected).
    fn connect(&mut self) -> Result<(), LinkError>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    /// Drive reconnect / backoff.  Called on every link poll.
    fn poll(&mut self, now_ms: u64);
    /// Signal strength in dBm while connected.
    fn rssi(&self) -> Option<i8>;
}

// ───────────────────────────────────────────────────────────────
// MQTT port (driven adapter: broker session)
// ───────────────────────────────────────────────────────────────

/// A pub/sub client used as-is.  The connectivity manager owns the
/// session lifecycle; the client only reports what it observes.
pub trait MqttPort {
    /// Start a session.  Non-blocking: the session is up once
    /// [`is_connected`](Self::is_connected) reports `true`.
    fn start_session(&mut self) -> Result<(), PublishError>;
    /// Tear down the current session, if any.
    fn end_session(&mut self);
    fn is_connected(&self) -> bool;
    /// Enqueue `payload` on `topic` (QoS 0, not retained).
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from event system)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the scheduler invokes when a task comes due.
///
/// The main loop implements this by pushing into the
/// [`EventQueue`](crate::events::EventQueue); the scheduler itself knows
/// nothing about events.
pub trait SchedulerDelegate {
    fn on_task_due(&mut self, task: TaskKind);
}

/// Periodic tasks known to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Read the sensor and feed the detector.
    Sample,
    /// Service the link and MQTT session.
    LinkPoll,
    /// Emit statistics.
    StatsReport,
}
