//! System configuration parameters
//!
//! All tunable parameters for the doorbell publisher.  Built once at boot
//! (defaults, optionally overridden by a JSON document supplied at build
//! time) and passed by reference to every component at construction.
//! Nothing reads configuration from globals.

use core::fmt;
use core::fmt::Write;

use serde::{Deserialize, Serialize};

/// Bounded topic / payload string.
pub type TopicString = heapless::String<64>;
/// Bounded short string (client id, message payloads).
pub type ShortString = heapless::String<32>;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorbellConfig {
    pub broker: BrokerConfig,
    pub topics: TopicConfig,
    pub detector: DetectorConfig,
    pub timing: TimingConfig,
    /// Serial console baud rate (set in sdkconfig; reported at boot).
    pub serial_baud: u32,
    /// Verbose diagnostic logging.
    pub debug: bool,
}

/// MQTT broker endpoint and session parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Static IPv4 address of the broker (no DNS lookup).
    pub ip: [u8; 4],
    pub port: u16,
    pub client_id: ShortString,
    /// MQTT keep-alive negotiated with the broker (seconds).
    pub keep_alive_secs: u16,
}

/// Topic table: which payload goes to which topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    /// Session / liveness topic.
    pub connection: TopicString,
    /// Ring event topic.
    pub doorbell: TopicString,
    pub connected_msg: ShortString,
    pub heartbeat_msg: ShortString,
    pub ring_msg: ShortString,
}

/// Edge detector parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Samples `>=` this value qualify towards a ring.
    pub threshold: f32,
    /// Consecutive qualifying samples needed to fire one ring.
    pub streak_limit: u32,
    /// Samples ignored after a ring fires.
    pub cooldown_samples: u32,
}

/// Loop cadence, heartbeat and reconnect timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Sensor sample interval (milliseconds).
    pub sample_interval_ms: u32,
    /// Heartbeat publish interval (seconds).
    pub heartbeat_interval_secs: u32,
    /// How often the connectivity manager is polled (milliseconds).
    pub link_poll_interval_ms: u32,
    /// Statistics report interval (seconds).
    pub stats_interval_secs: u32,
    /// A session that is not up after this long is abandoned (milliseconds).
    pub connect_timeout_ms: u32,
    /// First reconnect delay; doubles on each failure.
    pub reconnect_backoff_min_ms: u32,
    /// Reconnect delay cap.
    pub reconnect_backoff_max_ms: u32,
    /// Rings raised while offline are delivered on reconnect only if
    /// younger than this (milliseconds).
    pub ring_hold_ms: u32,
}

impl Default for DoorbellConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            topics: TopicConfig::default(),
            detector: DetectorConfig::default(),
            timing: TimingConfig::default(),
            serial_baud: 115_200,
            debug: true,
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            ip: [192, 168, 0, 4],
            port: 1883,
            client_id: bounded("DoorbellPublisher"),
            keep_alive_secs: 15,
        }
    }
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            connection: bounded("doorbell_connection"),
            doorbell: bounded("doorbell"),
            connected_msg: bounded("connected"),
            heartbeat_msg: bounded("heartbeat"),
            ring_msg: bounded("dingdong"),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: 40.0,
            streak_limit: 15,
            cooldown_samples: 800,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 3,       // ~333 Hz
            heartbeat_interval_secs: 5,
            link_poll_interval_ms: 50,
            stats_interval_secs: 60,
            connect_timeout_ms: 10_000,
            reconnect_backoff_min_ms: 1_000,
            reconnect_backoff_max_ms: 30_000,
            ring_hold_ms: 30_000,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Validation / parsing
// ───────────────────────────────────────────────────────────────

/// Errors from building a [`DoorbellConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The JSON override could not be parsed.
    Parse,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "config JSON could not be parsed"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl core::error::Error for ConfigError {}

impl DoorbellConfig {
    /// Configuration baked in at build time: the `DOORBELL_CONFIG` JSON
    /// override if one was set, the defaults otherwise.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        match option_env!("DOORBELL_CONFIG") {
            Some(json) => Self::from_json(json),
            None => Ok(Self::default()),
        }
    }

    /// Parse a (possibly partial) JSON override on top of the defaults and
    /// validate the result.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the firmware misbehave.
    /// Values are never silently clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.detector;
        if !d.threshold.is_finite() {
            return Err(ConfigError::ValidationFailed("detector.threshold must be finite"));
        }
        if d.streak_limit == 0 {
            return Err(ConfigError::ValidationFailed("detector.streak_limit must be >= 1"));
        }

        let t = &self.timing;
        if t.sample_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("timing.sample_interval_ms must be > 0"));
        }
        if t.heartbeat_interval_secs == 0 {
            return Err(ConfigError::ValidationFailed("timing.heartbeat_interval_secs must be > 0"));
        }
        if t.link_poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("timing.link_poll_interval_ms must be > 0"));
        }
        if t.stats_interval_secs == 0 {
            return Err(ConfigError::ValidationFailed("timing.stats_interval_secs must be > 0"));
        }
        if t.reconnect_backoff_min_ms == 0 || t.reconnect_backoff_min_ms > t.reconnect_backoff_max_ms {
            return Err(ConfigError::ValidationFailed(
                "timing.reconnect_backoff_min_ms must be in 1..=reconnect_backoff_max_ms",
            ));
        }

        if self.broker.port == 0 {
            return Err(ConfigError::ValidationFailed("broker.port must be > 0"));
        }
        if self.broker.client_id.is_empty() {
            return Err(ConfigError::ValidationFailed("broker.client_id must not be empty"));
        }
        if self.topics.connection.is_empty() || self.topics.doorbell.is_empty() {
            return Err(ConfigError::ValidationFailed("topics must not be empty"));
        }
        Ok(())
    }

    pub fn broker_url(&self) -> heapless::String<48> {
        self.broker.url()
    }
}

impl BrokerConfig {
    /// Broker URL in the form the MQTT client expects (`mqtt://a.b.c.d:port`).
    pub fn url(&self) -> heapless::String<48> {
        let [a, b, c, d] = self.ip;
        let mut url = heapless::String::new();
        // 28 bytes at most; always fits.
        let _ = write!(url, "mqtt://{}.{}.{}.{}:{}", a, b, c, d, self.port);
        url
    }
}

/// Copy `s` into a bounded string, truncating at capacity.
fn bounded<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for ch in s.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}
