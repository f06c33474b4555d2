//! Outbound MQTT messages and their wire mapping.
//!
//! | Message     | Topic                 | Payload     |
//! |-------------|-----------------------|-------------|
//! | `Connected` | `doorbell_connection` | `connected` |
//! | `Heartbeat` | `doorbell_connection` | `heartbeat` |
//! | `Ring`      | `doorbell`            | `dingdong`  |
//!
//! Topic and payload strings come from [`TopicConfig`], so the table above
//! describes the defaults.

use crate::config::TopicConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// Session established (once per session).
    Connected,
    /// Periodic liveness ping.
    Heartbeat,
    /// Doorbell ring detected.
    Ring,
}

impl Message {
    /// Resolve to the `(topic, payload)` pair published on the wire.
    pub fn route(self, topics: &TopicConfig) -> (&str, &[u8]) {
        match self {
            Self::Connected => (topics.connection.as_str(), topics.connected_msg.as_bytes()),
            Self::Heartbeat => (topics.connection.as_str(), topics.heartbeat_msg.as_bytes()),
            Self::Ring => (topics.doorbell.as_str(), topics.ring_msg.as_bytes()),
        }
    }
}
