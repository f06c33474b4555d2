//! Mock adapters for integration tests.
//!
//! Each mock records what the domain asked of it so tests can assert on
//! the full history without touching the ADC, the radio or a broker.

use std::collections::VecDeque;

use doorbell::app::events::AppEvent;
use doorbell::app::ports::{EventSink, LinkPort, MqttPort, SensorPort};
use doorbell::error::{LinkError, PublishError, SensorError};
use doorbell::sensors::SampleReading;

// ── MockSensor ────────────────────────────────────────────────

/// Plays back a scripted sequence of scaled samples, then repeats `idle`
/// (or the press level while `now_us` is inside the press window).
pub struct MockSensor {
    script: VecDeque<Result<f32, SensorError>>,
    idle: f32,
    press: Option<(u64, u64, f32)>,
    /// Simulated time of the next read, set by the driving loop.
    pub now_us: u64,
    pub reads: u32,
}

#[allow(dead_code)]
impl MockSensor {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            idle: 0.0,
            press: None,
            now_us: 0,
            reads: 0,
        }
    }

    /// Queue `n` samples of `value`.
    pub fn push(&mut self, value: f32, n: usize) -> &mut Self {
        self.script.extend(std::iter::repeat_n(Ok(value), n));
        self
    }

    /// Read `value` for `from_us <= now_us < to_us` once the script is spent.
    pub fn press(&mut self, from_us: u64, to_us: u64, value: f32) -> &mut Self {
        self.press = Some((from_us, to_us, value));
        self
    }

    pub fn push_error(&mut self, error: SensorError) -> &mut Self {
        self.script.push_back(Err(error));
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Default for MockSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockSensor {
    fn read_sample(&mut self) -> Result<SampleReading, SensorError> {
        self.reads += 1;
        let idle = match self.press {
            Some((from, to, v)) if (from..to).contains(&self.now_us) => v,
            _ => self.idle,
        };
        let value = self.script.pop_front().unwrap_or(Ok(idle))?;
        Ok(SampleReading {
            raw: (value as u16) << 2,
            value,
        })
    }
}

// ── MockLink ──────────────────────────────────────────────────

/// A link whose state the test sets directly.
pub struct MockLink {
    pub up: bool,
    pub connect_calls: u32,
    pub polls: u32,
    pub rssi: Option<i8>,
}

#[allow(dead_code)]
impl MockLink {
    pub fn up() -> Self {
        Self {
            up: true,
            connect_calls: 0,
            polls: 0,
            rssi: Some(-58),
        }
    }

    pub fn down() -> Self {
        Self {
            up: false,
            ..Self::up()
        }
    }
}

impl LinkPort for MockLink {
    fn connect(&mut self) -> Result<(), LinkError> {
        self.connect_calls += 1;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.up = false;
    }

    fn is_connected(&self) -> bool {
        self.up
    }

    fn poll(&mut self, _now_ms: u64) {
        self.polls += 1;
    }

    fn rssi(&self) -> Option<i8> {
        if self.up { self.rssi } else { None }
    }
}

// ── MockMqtt ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
}

/// Broker mock.  Sessions come up on `start_session` unless the broker is
/// unreachable, or on a later poll when `slow_connect` is set.
pub struct MockMqtt {
    pub reachable: bool,
    pub slow_connect: bool,
    pub session_up: bool,
    pub fail_publishes: bool,
    pub sessions_started: u32,
    pub sessions_ended: u32,
    pub published: Vec<Published>,
}

#[allow(dead_code)]
impl MockMqtt {
    pub fn new() -> Self {
        Self {
            reachable: true,
            slow_connect: false,
            session_up: false,
            fail_publishes: false,
            sessions_started: 0,
            sessions_ended: 0,
            published: Vec::new(),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::new()
        }
    }

    /// Simulate the broker dropping the session.
    pub fn drop_session(&mut self) {
        self.session_up = false;
    }

    pub fn payloads_on(&self, topic: &str) -> Vec<&str> {
        self.published
            .iter()
            .filter(|p| p.topic == topic)
            .map(|p| p.payload.as_str())
            .collect()
    }

    pub fn count(&self, topic: &str, payload: &str) -> usize {
        self.published
            .iter()
            .filter(|p| p.topic == topic && p.payload == payload)
            .count()
    }
}

impl Default for MockMqtt {
    fn default() -> Self {
        Self::new()
    }
}

impl MqttPort for MockMqtt {
    fn start_session(&mut self) -> Result<(), PublishError> {
        self.sessions_started += 1;
        if !self.reachable {
            return Err(PublishError::SessionFailed);
        }
        if !self.slow_connect {
            self.session_up = true;
        }
        Ok(())
    }

    fn end_session(&mut self) {
        self.sessions_ended += 1;
        self.session_up = false;
    }

    fn is_connected(&self) -> bool {
        self.session_up
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        if !self.session_up {
            return Err(PublishError::NotConnected);
        }
        if self.fail_publishes {
            return Err(PublishError::Rejected);
        }
        self.published.push(Published {
            topic: topic.to_owned(),
            payload: String::from_utf8_lossy(payload).into_owned(),
        });
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

/// Event sink that records every event.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn rings(&self) -> usize {
        self.count(|e| matches!(e, AppEvent::Ring { .. }))
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
