//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to the UART console in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events written since boot.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        self.emitted = self.emitted.wrapping_add(1);
        match event {
            AppEvent::Started => info!("START | doorbell publisher running"),
            AppEvent::Ring { at_ms, total } => {
                info!("RING  | #{} at {}ms", total, at_ms);
            }
            AppEvent::LinkUp { rssi } => info!("LINK  | up, rssi={:?}dBm", rssi),
            AppEvent::LinkDown => warn!("LINK  | down"),
            AppEvent::SessionEstablished { session } => {
                info!("MQTT  | session {} established", session);
            }
            AppEvent::SessionLost { retry_in_ms } => {
                warn!("MQTT  | session lost, retry in {}ms", retry_in_ms);
            }
            AppEvent::ConnectFailed { retry_in_ms } => {
                warn!("MQTT  | session not established, retry in {}ms", retry_in_ms);
            }
            AppEvent::HeartbeatSent => {}
            AppEvent::PublishFailed { message, error } => {
                warn!("MQTT  | {:?} not published: {}", message, error);
            }
            AppEvent::HeldRingDelivered { age_ms } => {
                info!("RING  | held ring delivered, {}ms late", age_ms);
            }
            AppEvent::HeldRingExpired { age_ms } => {
                warn!("RING  | held ring dropped, {}ms old", age_ms);
            }
            AppEvent::SensorFailed(e) => warn!("SENSE | {}", e),
            AppEvent::Stats(s) => {
                info!(
                    "STATS | samples={} rings={} deferred={} sensor_err={} | \
                     sessions={} conn_err={} lost={} hb={} pub_err={} | overruns={} dropped={} rssi={:?}",
                    s.samples,
                    s.rings,
                    s.rings_deferred,
                    s.sensor_failures,
                    s.sessions,
                    s.connect_failures,
                    s.session_losses,
                    s.heartbeats,
                    s.publish_failures,
                    s.scheduler_overruns,
                    s.events_dropped,
                    s.rssi,
                );
            }
        }
    }
}
