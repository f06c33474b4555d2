//! Outbound application events.
//!
//! The service and the connectivity manager emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial log, test recorder).

use crate::error::{PublishError, SensorError};

use super::messages::Message;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started.
    Started,

    /// A ring was detected.  `total` counts rings since boot.
    Ring { at_ms: u64, total: u32 },

    /// The network link came up.
    LinkUp { rssi: Option<i8> },

    /// The network link went down.
    LinkDown,

    /// An MQTT session was established and announced.
    SessionEstablished { session: u32 },

    /// The MQTT session was lost; a reconnect is scheduled.
    SessionLost { retry_in_ms: u32 },

    /// A session attempt failed to start or never came up.
    ConnectFailed { retry_in_ms: u32 },

    /// A heartbeat was published.
    HeartbeatSent,

    /// A message could not be published.
    PublishFailed { message: Message, error: PublishError },

    /// A ring raised while offline was delivered after reconnecting.
    HeldRingDelivered { age_ms: u64 },

    /// A ring raised while offline was too old to deliver.
    HeldRingExpired { age_ms: u64 },

    /// The sensor could not be read this tick.
    SensorFailed(SensorError),

    /// Periodic statistics snapshot.
    Stats(StatsSnapshot),
}

/// Counters reported with [`AppEvent::Stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub samples: u64,
    pub rings: u32,
    /// Rings the publisher could not send immediately.
    pub rings_deferred: u32,
    pub sensor_failures: u32,
    pub sessions: u32,
    /// Session attempts that failed or timed out before coming up.
    pub connect_failures: u32,
    pub session_losses: u32,
    pub heartbeats: u32,
    pub publish_failures: u32,
    pub scheduler_overruns: u32,
    pub events_dropped: u32,
    pub rssi: Option<i8>,
}

/// Control-loop health counters folded into a [`StatsSnapshot`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub scheduler_overruns: u32,
    pub events_dropped: u32,
}
