//! MQTT client adapter.
//!
//! Implements [`MqttPort`].  The broker protocol is not reimplemented
//! here: on ESP-IDF the adapter drives `esp_idf_svc`'s `EspMqttClient`,
//! whose event callback runs on the client task and only touches an
//! atomic flag.  Publishes use the non-blocking outbox (`enqueue`), QoS 0,
//! never retained.
//!
//! On other targets a simulated broker records every publish so the
//! control loop can run on the host.

#[cfg(target_os = "espidf")]
use std::sync::Arc;
#[cfg(target_os = "espidf")]
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};

use log::{info, warn};

use crate::app::ports::MqttPort;
use crate::config::BrokerConfig;
use crate::error::PublishError;

/// A publish observed by the simulated broker.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimPublish {
    pub topic: String,
    pub payload: Vec<u8>,
}

pub struct MqttAdapter {
    broker: BrokerConfig,
    #[cfg(target_os = "espidf")]
    client: Option<EspMqttClient<'static>>,
    #[cfg(target_os = "espidf")]
    connected: Arc<AtomicBool>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimBroker,
}

#[cfg(not(target_os = "espidf"))]
#[derive(Debug)]
struct SimBroker {
    reachable: bool,
    session_up: bool,
    reject_publishes: bool,
    sessions: u32,
    published: Vec<SimPublish>,
}

impl MqttAdapter {
    pub fn new(broker: BrokerConfig) -> Self {
        Self {
            broker,
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(target_os = "espidf")]
            connected: Arc::new(AtomicBool::new(false)),
            #[cfg(not(target_os = "espidf"))]
            sim: SimBroker {
                reachable: true,
                session_up: false,
                reject_publishes: false,
                sessions: 0,
                published: Vec::new(),
            },
        }
    }

    pub fn broker(&self) -> &BrokerConfig {
        &self.broker
    }

    // ── Simulation hooks ──────────────────────────────────────

    /// Make the broker (un)reachable.  Going unreachable drops the session.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_reachable(&mut self, reachable: bool) {
        self.sim.reachable = reachable;
        if !reachable {
            self.sim.session_up = false;
        }
    }

    /// Make every publish fail with [`PublishError::Rejected`].
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_reject_publishes(&mut self, reject: bool) {
        self.sim.reject_publishes = reject;
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_published(&self) -> &[SimPublish] {
        &self.sim.published
    }

    /// Sessions started against the simulated broker.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_sessions(&self) -> u32 {
        self.sim.sessions
    }
}

// ───────────────────────────────────────────────────────────────
// MqttPort — ESP-IDF
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl MqttPort for MqttAdapter {
    fn start_session(&mut self) -> Result<(), PublishError> {
        self.end_session();

        let url = self.broker.url();
        let conf = MqttClientConfiguration {
            client_id: Some(self.broker.client_id.as_str()),
            keep_alive_interval: Some(core::time::Duration::from_secs(u64::from(
                self.broker.keep_alive_secs,
            ))),
            ..Default::default()
        };

        let connected = Arc::clone(&self.connected);
        let client = EspMqttClient::new_cb(url.as_str(), &conf, move |event| match event.payload() {
            EventPayload::Connected(_) => connected.store(true, Ordering::Release),
            EventPayload::Disconnected => connected.store(false, Ordering::Release),
            EventPayload::Error(e) => {
                connected.store(false, Ordering::Release);
                log::warn!("MQTT: client error: {:?}", e);
            }
            _ => {}
        })
        .map_err(|e| {
            warn!("MQTT: client init failed: {}", e);
            PublishError::SessionFailed
        })?;

        info!("MQTT: client started for {}", url);
        self.client = Some(client);
        Ok(())
    }

    fn end_session(&mut self) {
        if self.client.take().is_some() {
            info!("MQTT: client stopped");
        }
        self.connected.store(false, Ordering::Release);
    }

    fn is_connected(&self) -> bool {
        self.client.is_some() && self.connected.load(Ordering::Acquire)
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        if !self.is_connected() {
            return Err(PublishError::NotConnected);
        }
        let client = self.client.as_mut().ok_or(PublishError::NotConnected)?;
        client
            .enqueue(topic, QoS::AtMostOnce, false, payload)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT: enqueue on '{}' failed: {}", topic, e);
                PublishError::Rejected
            })
    }
}

// ───────────────────────────────────────────────────────────────
// MqttPort — simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl MqttPort for MqttAdapter {
    fn start_session(&mut self) -> Result<(), PublishError> {
        if !self.sim.reachable {
            warn!("MQTT(sim): broker {} unreachable", self.broker.url());
            return Err(PublishError::SessionFailed);
        }
        self.sim.session_up = true;
        self.sim.sessions += 1;
        info!("MQTT(sim): session {} as '{}'", self.sim.sessions, self.broker.client_id);
        Ok(())
    }

    fn end_session(&mut self) {
        self.sim.session_up = false;
    }

    fn is_connected(&self) -> bool {
        self.sim.session_up
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        if !self.sim.session_up {
            return Err(PublishError::NotConnected);
        }
        if self.sim.reject_publishes {
            return Err(PublishError::Rejected);
        }
        self.sim.published.push(SimPublish {
            topic: topic.into(),
            payload: payload.to_vec(),
        });
        Ok(())
    }
}
