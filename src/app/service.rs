//! Application service — the hexagonal core.
//!
//! [`DoorbellService`] owns the edge detector and the detection counters.
//! All I/O flows through port traits injected at call sites, making the
//! service testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                 │    DoorbellService      │
//!  Publisher  ◀── │  EdgeDetector · stats   │
//!                 └────────────────────────┘
//! ```

use log::{debug, info};

use crate::config::DoorbellConfig;
use crate::connectivity::ConnectivityStats;
use crate::detector::{Detection, DetectorState, EdgeDetector};

use super::events::{AppEvent, LoopStats, StatsSnapshot};
use super::messages::Message;
use super::ports::{EventSink, Publisher, SensorPort};

/// The application service orchestrates the detection logic.
pub struct DoorbellService {
    detector: EdgeDetector,
    debug: bool,
    samples: u64,
    rings: u32,
    rings_deferred: u32,
    sensor_failures: u32,
    last_value: Option<f32>,
}

impl DoorbellService {
    pub fn new(config: &DoorbellConfig) -> Self {
        Self {
            detector: EdgeDetector::new(config.detector),
            debug: config.debug,
            samples: 0,
            rings: 0,
            rings_deferred: 0,
            sensor_failures: 0,
            last_value: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        let c = self.detector.config();
        info!(
            "DoorbellService started (threshold={}, streak={}, cooldown={})",
            c.threshold, c.streak_limit, c.cooldown_samples
        );
        sink.emit(&AppEvent::Started);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one sample cycle: read the sensor, feed the detector, publish a
    /// ring if one was detected.
    ///
    /// A failed read skips the tick entirely; the detector is not fed.
    pub fn on_sample(
        &mut self,
        sensor: &mut impl SensorPort,
        publisher: &mut impl Publisher,
        sink: &mut impl EventSink,
        now_ms: u64,
    ) -> Detection {
        let reading = match sensor.read_sample() {
            Ok(r) => r,
            Err(e) => {
                self.sensor_failures = self.sensor_failures.saturating_add(1);
                sink.emit(&AppEvent::SensorFailed(e));
                return Detection::Idle;
            }
        };

        self.samples += 1;
        self.last_value = Some(reading.value);
        let detection = self.detector.feed(reading.value);

        if self.debug {
            if let Detection::Rising { streak } = detection {
                debug!("bell: {} (raw {}) streak {}", reading.value, reading.raw, streak);
            }
        }

        if detection == Detection::Ring {
            self.rings = self.rings.saturating_add(1);
            sink.emit(&AppEvent::Ring {
                at_ms: now_ms,
                total: self.rings,
            });

            if let Err(e) = publisher.publish(Message::Ring, now_ms) {
                self.rings_deferred = self.rings_deferred.saturating_add(1);
                sink.emit(&AppEvent::PublishFailed {
                    message: Message::Ring,
                    error: e,
                });
            }
        }

        detection
    }

    /// Emit a statistics snapshot combining detection, session and loop
    /// counters.
    pub fn report(
        &self,
        sink: &mut impl EventSink,
        link: &ConnectivityStats,
        loop_stats: LoopStats,
    ) -> StatsSnapshot {
        let snapshot = self.snapshot(link, loop_stats);
        sink.emit(&AppEvent::Stats(snapshot));
        snapshot
    }

    pub fn snapshot(&self, link: &ConnectivityStats, loop_stats: LoopStats) -> StatsSnapshot {
        StatsSnapshot {
            samples: self.samples,
            rings: self.rings,
            rings_deferred: self.rings_deferred,
            sensor_failures: self.sensor_failures,
            sessions: link.sessions,
            connect_failures: link.connect_failures,
            session_losses: link.session_losses,
            heartbeats: link.heartbeats,
            publish_failures: link.publish_failures,
            scheduler_overruns: loop_stats.scheduler_overruns,
            events_dropped: loop_stats.events_dropped,
            rssi: link.rssi,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn detector_state(&self) -> DetectorState {
        self.detector.state()
    }

    /// Whether the detector is out of cooldown.
    pub fn is_armed(&self) -> bool {
        self.detector.is_armed()
    }

    /// Samples fed to the detector since startup.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn rings(&self) -> u32 {
        self.rings
    }

    pub fn rings_deferred(&self) -> u32 {
        self.rings_deferred
    }

    pub fn sensor_failures(&self) -> u32 {
        self.sensor_failures
    }

    /// Most recent scaled sample.
    pub fn last_value(&self) -> Option<f32> {
        self.last_value
    }
}
