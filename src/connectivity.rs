//! Connectivity manager — keeps a network link and an MQTT session alive.
//!
//! ```text
//!              retry_at reached                 client reports up
//!  Disconnected ────────────────▶ Connecting ───────────────────▶ Connected
//!       ▲   ▲   start failed /        │        publish "connected"     │
//!       │   └──────────────────────────┘        arm heartbeat           │
//!       │        connect timeout                                        │
//!       │                                                               │
//!       └──────── heartbeat failed / client down / link down ───────────┘
//!                 (reconnect after exponential backoff)
//! ```
//!
//! The manager is polled from the control loop and never blocks: the link
//! and MQTT ports are non-blocking and every wait is expressed as a
//! deadline on the caller's monotonic clock.  The heartbeat deadline is
//! the only timeout on an established session.
//!
//! The detection core sees the manager only as a [`Publisher`].  A ring
//! raised while offline is held in a single slot and delivered right after
//! the next `connected` message if it is still fresh.

use log::{debug, info};

use crate::app::events::AppEvent;
use crate::app::messages::Message;
use crate::app::ports::{EventSink, LinkPort, MqttPort, Publisher};
use crate::config::{DoorbellConfig, TopicConfig};
use crate::error::{LinkError, PublishError};

/// Link / session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session.  A new one is attempted once `retry_at_ms` is reached.
    Disconnected { retry_at_ms: u64 },
    /// Session requested; waiting for the client to report it up.
    Connecting { started_ms: u64 },
    /// Session up.  A heartbeat is due at `heartbeat_deadline_ms`.
    Connected { heartbeat_deadline_ms: u64 },
}

/// Session counters since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectivityStats {
    pub connect_attempts: u32,
    pub sessions: u32,
    pub connect_failures: u32,
    pub session_losses: u32,
    pub heartbeats: u32,
    pub publish_failures: u32,
    /// Link signal strength at the time of the snapshot.
    pub rssi: Option<i8>,
}

pub struct ConnectivityManager<L, M> {
    link: L,
    mqtt: M,
    topics: TopicConfig,
    heartbeat_ms: u64,
    connect_timeout_ms: u64,
    backoff_min_ms: u32,
    backoff_max_ms: u32,
    ring_hold_ms: u64,
    state: ConnectionState,
    backoff_ms: u32,
    link_up: bool,
    /// Monotonic timestamp of a ring that could not be published.
    held_ring: Option<u64>,
    stats: ConnectivityStats,
}

impl<L: LinkPort, M: MqttPort> ConnectivityManager<L, M> {
    pub fn new(link: L, mqtt: M, config: &DoorbellConfig) -> Self {
        let t = &config.timing;
        Self {
            link,
            mqtt,
            topics: config.topics.clone(),
            heartbeat_ms: u64::from(t.heartbeat_interval_secs) * 1000,
            connect_timeout_ms: u64::from(t.connect_timeout_ms),
            backoff_min_ms: t.reconnect_backoff_min_ms,
            backoff_max_ms: t.reconnect_backoff_max_ms,
            ring_hold_ms: u64::from(t.ring_hold_ms),
            state: ConnectionState::Disconnected { retry_at_ms: 0 },
            backoff_ms: t.reconnect_backoff_min_ms,
            link_up: false,
            held_ring: None,
            stats: ConnectivityStats::default(),
        }
    }

    /// Kick off the network link.  The link keeps retrying on its own.
    pub fn start(&mut self) -> Result<(), LinkError> {
        self.link.connect()
    }

    /// Service the link and the session.  Call on every link-poll tick.
    pub fn poll(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        self.link.poll(now_ms);
        let link_ok = self.link.is_connected();

        if link_ok != self.link_up {
            self.link_up = link_ok;
            if link_ok {
                sink.emit(&AppEvent::LinkUp { rssi: self.link.rssi() });
            } else {
                sink.emit(&AppEvent::LinkDown);
            }
        }

        if !link_ok {
            if !matches!(self.state, ConnectionState::Disconnected { .. }) {
                // Retry as soon as the link is back; the link has its own backoff.
                self.mqtt.end_session();
                self.stats.session_losses = self.stats.session_losses.saturating_add(1);
                self.state = ConnectionState::Disconnected { retry_at_ms: now_ms };
                sink.emit(&AppEvent::SessionLost { retry_in_ms: 0 });
            }
            return;
        }

        match self.state {
            ConnectionState::Disconnected { retry_at_ms } => {
                if now_ms >= retry_at_ms {
                    self.begin_session(now_ms, sink);
                }
            }
            ConnectionState::Connecting { started_ms } => {
                if self.mqtt.is_connected() {
                    self.establish(now_ms, sink);
                } else if now_ms.saturating_sub(started_ms) >= self.connect_timeout_ms {
                    debug!("MQTT: session not up after {}ms, abandoning", self.connect_timeout_ms);
                    self.mqtt.end_session();
                    self.fail_attempt(now_ms, sink);
                }
            }
            ConnectionState::Connected { heartbeat_deadline_ms } => {
                if !self.mqtt.is_connected() {
                    self.drop_session(now_ms, sink);
                } else if now_ms >= heartbeat_deadline_ms {
                    self.send_heartbeat(now_ms, sink);
                } else if self.held_ring.is_some() {
                    self.flush_held_ring(now_ms, sink);
                }
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_session_up(&self) -> bool {
        matches!(self.state, ConnectionState::Connected { .. })
    }

    pub fn stats(&self) -> ConnectivityStats {
        ConnectivityStats {
            rssi: self.link.rssi(),
            ..self.stats
        }
    }

    /// Delay the next failed attempt will wait.
    pub fn current_backoff_ms(&self) -> u32 {
        self.backoff_ms
    }

    pub fn has_held_ring(&self) -> bool {
        self.held_ring.is_some()
    }

    pub fn rssi(&self) -> Option<i8> {
        self.link.rssi()
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn mqtt(&self) -> &M {
        &self.mqtt
    }

    pub fn mqtt_mut(&mut self) -> &mut M {
        &mut self.mqtt
    }

    // ── Internal ──────────────────────────────────────────────

    fn begin_session(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        self.stats.connect_attempts = self.stats.connect_attempts.saturating_add(1);
        info!("MQTT: starting session (attempt {})", self.stats.connect_attempts);
        match self.mqtt.start_session() {
            Ok(()) => {
                self.state = ConnectionState::Connecting { started_ms: now_ms };
                if self.mqtt.is_connected() {
                    self.establish(now_ms, sink);
                }
            }
            Err(e) => {
                debug!("MQTT: session start failed: {}", e);
                self.fail_attempt(now_ms, sink);
            }
        }
    }

    fn establish(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        if let Err(e) = self.send(Message::Connected) {
            self.stats.publish_failures = self.stats.publish_failures.saturating_add(1);
            sink.emit(&AppEvent::PublishFailed {
                message: Message::Connected,
                error: e,
            });
            self.drop_session(now_ms, sink);
            return;
        }

        self.stats.sessions = self.stats.sessions.saturating_add(1);
        self.backoff_ms = self.backoff_min_ms;
        self.state = ConnectionState::Connected {
            heartbeat_deadline_ms: now_ms + self.heartbeat_ms,
        };
        sink.emit(&AppEvent::SessionEstablished {
            session: self.stats.sessions,
        });

        self.flush_held_ring(now_ms, sink);
    }

    fn send_heartbeat(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        match self.send(Message::Heartbeat) {
            Ok(()) => {
                self.stats.heartbeats = self.stats.heartbeats.saturating_add(1);
                self.state = ConnectionState::Connected {
                    heartbeat_deadline_ms: now_ms + self.heartbeat_ms,
                };
                debug!("MQTT: heartbeat {}", self.stats.heartbeats);
                sink.emit(&AppEvent::HeartbeatSent);
            }
            Err(e) => {
                self.stats.publish_failures = self.stats.publish_failures.saturating_add(1);
                sink.emit(&AppEvent::PublishFailed {
                    message: Message::Heartbeat,
                    error: e,
                });
                self.drop_session(now_ms, sink);
            }
        }
    }

    fn flush_held_ring(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        let Some(raised_ms) = self.held_ring.take() else {
            return;
        };
        let age_ms = now_ms.saturating_sub(raised_ms);
        if age_ms > self.ring_hold_ms {
            sink.emit(&AppEvent::HeldRingExpired { age_ms });
            return;
        }
        match self.send(Message::Ring) {
            Ok(()) => {
                sink.emit(&AppEvent::HeldRingDelivered { age_ms });
            }
            Err(e) => {
                self.held_ring = Some(raised_ms);
                self.stats.publish_failures = self.stats.publish_failures.saturating_add(1);
                sink.emit(&AppEvent::PublishFailed {
                    message: Message::Ring,
                    error: e,
                });
            }
        }
    }

    fn drop_session(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        self.mqtt.end_session();
        self.stats.session_losses = self.stats.session_losses.saturating_add(1);
        let delay = self.schedule_retry(now_ms);
        sink.emit(&AppEvent::SessionLost { retry_in_ms: delay });
    }

    fn fail_attempt(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        self.stats.connect_failures = self.stats.connect_failures.saturating_add(1);
        let delay = self.schedule_retry(now_ms);
        sink.emit(&AppEvent::ConnectFailed { retry_in_ms: delay });
    }

    /// Move to `Disconnected` with the current backoff and double it for
    /// next time.  Returns the delay applied.
    fn schedule_retry(&mut self, now_ms: u64) -> u32 {
        let delay = self.backoff_ms;
        self.state = ConnectionState::Disconnected {
            retry_at_ms: now_ms + u64::from(delay),
        };
        self.backoff_ms = self.backoff_ms.saturating_mul(2).min(self.backoff_max_ms);
        delay
    }

    fn send(&mut self, message: Message) -> Result<(), PublishError> {
        let (topic, payload) = message.route(&self.topics);
        self.mqtt.publish(topic, payload)
    }
}

impl<L: LinkPort, M: MqttPort> Publisher for ConnectivityManager<L, M> {
    fn publish(&mut self, message: Message, now_ms: u64) -> Result<(), PublishError> {
        if !self.is_session_up() || !self.mqtt.is_connected() {
            if message == Message::Ring {
                debug!("MQTT: no session, holding ring");
                self.held_ring = Some(now_ms);
            }
            return Err(PublishError::NotConnected);
        }

        self.send(message).inspect_err(|_| {
            self.stats.publish_failures = self.stats.publish_failures.saturating_add(1);
            if message == Message::Ring {
                self.held_ring = Some(now_ms);
            }
        })
    }
}
