//! Integration tests for the ConnectivityManager session lifecycle:
//! announce, heartbeat, reconnect with backoff, held rings.

use doorbell::app::events::AppEvent;
use doorbell::app::messages::Message;
use doorbell::app::ports::Publisher;
use doorbell::config::DoorbellConfig;
use doorbell::connectivity::{ConnectionState, ConnectivityManager};
use doorbell::error::PublishError;

use super::mock_hw::{MockLink, MockMqtt, Published, RecordingSink};

type Manager = ConnectivityManager<MockLink, MockMqtt>;

fn manager(link: MockLink, mqtt: MockMqtt) -> Manager {
    ConnectivityManager::new(link, mqtt, &DoorbellConfig::default())
}

fn connected_count(m: &Manager) -> usize {
    m.mqtt().count("doorbell_connection", "connected")
}

fn retry_at(m: &Manager) -> u64 {
    match m.state() {
        ConnectionState::Disconnected { retry_at_ms } => retry_at_ms,
        other => panic!("expected Disconnected, got {:?}", other),
    }
}

#[test]
fn first_poll_establishes_session_and_announces() {
    let mut m = manager(MockLink::up(), MockMqtt::new());
    let mut sink = RecordingSink::new();

    m.poll(0, &mut sink);

    assert!(m.is_session_up());
    assert_eq!(
        m.mqtt().published,
        vec![Published {
            topic: "doorbell_connection".into(),
            payload: "connected".into(),
        }]
    );
    assert_eq!(
        sink.events,
        vec![
            AppEvent::LinkUp { rssi: Some(-58) },
            AppEvent::SessionEstablished { session: 1 },
        ]
    );
}

#[test]
fn heartbeat_every_interval_and_connected_only_once() {
    let mut m = manager(MockLink::up(), MockMqtt::new());
    let mut sink = RecordingSink::new();

    for now in (0..=20_000).step_by(50) {
        m.poll(now, &mut sink);
    }

    assert_eq!(connected_count(&m), 1);
    assert_eq!(m.mqtt().count("doorbell_connection", "heartbeat"), 4);
    assert_eq!(m.stats().heartbeats, 4);
    assert_eq!(
        m.state(),
        ConnectionState::Connected {
            heartbeat_deadline_ms: 25_000
        }
    );
}

#[test]
fn heartbeat_not_sent_before_deadline() {
    let mut m = manager(MockLink::up(), MockMqtt::new());
    let mut sink = RecordingSink::new();

    m.poll(0, &mut sink);
    m.poll(4_999, &mut sink);
    assert_eq!(m.mqtt().count("doorbell_connection", "heartbeat"), 0);
    m.poll(5_000, &mut sink);
    assert_eq!(m.mqtt().count("doorbell_connection", "heartbeat"), 1);
}

#[test]
fn failed_heartbeat_drops_session_and_reconnects() {
    let mut m = manager(MockLink::up(), MockMqtt::new());
    let mut sink = RecordingSink::new();
    m.poll(0, &mut sink);

    m.mqtt_mut().fail_publishes = true;
    m.poll(5_000, &mut sink);

    assert!(!m.is_session_up());
    assert_eq!(retry_at(&m), 6_000);
    assert!(sink.events.contains(&AppEvent::PublishFailed {
        message: Message::Heartbeat,
        error: PublishError::Rejected,
    }));
    assert!(sink.events.contains(&AppEvent::SessionLost { retry_in_ms: 1_000 }));

    m.mqtt_mut().fail_publishes = false;
    m.poll(5_999, &mut sink);
    assert!(!m.is_session_up());
    m.poll(6_000, &mut sink);
    assert!(m.is_session_up());

    assert_eq!(connected_count(&m), 2);
    let stats = m.stats();
    assert_eq!(stats.sessions, 2);
    assert_eq!(stats.session_losses, 1);
    assert_eq!(stats.publish_failures, 1);
}

#[test]
fn reconnect_backoff_doubles_up_to_cap() {
    let mut m = manager(MockLink::up(), MockMqtt::unreachable());
    let mut sink = RecordingSink::new();

    let mut now = 0;
    let mut delays = Vec::new();
    for _ in 0..7 {
        m.poll(now, &mut sink);
        let next = retry_at(&m);
        delays.push(next - now);
        now = next;
    }
    assert_eq!(delays, vec![1_000, 2_000, 4_000, 8_000, 16_000, 30_000, 30_000]);
    assert_eq!(m.mqtt().sessions_started, 7);
    assert_eq!(m.stats().connect_failures, 7);
    let failed: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::ConnectFailed { retry_in_ms } => Some(*retry_in_ms),
            _ => None,
        })
        .collect();
    assert_eq!(failed, delays.iter().map(|&d| d as u32).collect::<Vec<_>>());

    // Success resets the backoff.
    m.mqtt_mut().reachable = true;
    m.poll(now, &mut sink);
    assert!(m.is_session_up());
    assert_eq!(m.current_backoff_ms(), 1_000);
}

#[test]
fn session_that_never_comes_up_times_out() {
    let mut mqtt = MockMqtt::new();
    mqtt.slow_connect = true;
    let mut m = manager(MockLink::up(), mqtt);
    let mut sink = RecordingSink::new();

    m.poll(0, &mut sink);
    assert_eq!(m.state(), ConnectionState::Connecting { started_ms: 0 });

    m.poll(9_950, &mut sink);
    assert_eq!(m.state(), ConnectionState::Connecting { started_ms: 0 });

    m.poll(10_000, &mut sink);
    assert_eq!(retry_at(&m), 11_000);
    assert_eq!(m.mqtt().sessions_ended, 1);
    assert_eq!(sink.events.last(), Some(&AppEvent::ConnectFailed { retry_in_ms: 1_000 }));
    assert_eq!(m.stats().connect_failures, 1);
    assert_eq!(m.stats().session_losses, 0);

    // Second attempt: the broker answers on the following poll.
    m.poll(11_000, &mut sink);
    assert_eq!(m.state(), ConnectionState::Connecting { started_ms: 11_000 });
    m.mqtt_mut().session_up = true;
    m.poll(11_050, &mut sink);
    assert!(m.is_session_up());
    assert_eq!(connected_count(&m), 1);
}

#[test]
fn link_loss_drops_session_and_recovers_when_link_returns() {
    let mut m = manager(MockLink::up(), MockMqtt::new());
    let mut sink = RecordingSink::new();
    m.poll(0, &mut sink);
    sink.clear();

    m.link_mut().up = false;
    m.poll(100, &mut sink);
    assert_eq!(
        sink.events,
        vec![AppEvent::LinkDown, AppEvent::SessionLost { retry_in_ms: 0 }]
    );
    assert!(!m.is_session_up());

    // No session attempts while the link is down.
    m.poll(5_000, &mut sink);
    assert_eq!(m.mqtt().sessions_started, 1);

    m.link_mut().up = true;
    m.poll(5_050, &mut sink);
    assert!(m.is_session_up());
    assert_eq!(connected_count(&m), 2);
}

#[test]
fn client_reported_disconnect_schedules_reconnect() {
    let mut m = manager(MockLink::up(), MockMqtt::new());
    let mut sink = RecordingSink::new();
    m.poll(0, &mut sink);

    m.mqtt_mut().drop_session();
    m.poll(50, &mut sink);

    assert_eq!(retry_at(&m), 1_050);
    assert!(sink.events.contains(&AppEvent::SessionLost { retry_in_ms: 1_000 }));
    assert_eq!(m.mqtt().sessions_ended, 1);
}

#[test]
fn ring_while_connected_is_published_immediately() {
    let mut m = manager(MockLink::up(), MockMqtt::new());
    let mut sink = RecordingSink::new();
    m.poll(0, &mut sink);

    assert_eq!(m.publish(Message::Ring, 10), Ok(()));
    assert_eq!(m.mqtt().payloads_on("doorbell"), vec!["dingdong"]);
    assert!(!m.has_held_ring());
}

#[test]
fn offline_ring_is_delivered_right_after_connected() {
    let mut m = manager(MockLink::down(), MockMqtt::new());
    let mut sink = RecordingSink::new();
    m.poll(0, &mut sink);

    assert_eq!(m.publish(Message::Ring, 1_000), Err(PublishError::NotConnected));
    assert!(m.has_held_ring());

    m.link_mut().up = true;
    m.poll(2_000, &mut sink);

    let published: Vec<&str> = m.mqtt().published.iter().map(|p| p.payload.as_str()).collect();
    assert_eq!(published, vec!["connected", "dingdong"]);
    assert!(sink.events.contains(&AppEvent::HeldRingDelivered { age_ms: 1_000 }));
    assert!(!m.has_held_ring());
}

#[test]
fn stale_held_ring_is_dropped() {
    let mut m = manager(MockLink::down(), MockMqtt::new());
    let mut sink = RecordingSink::new();

    let _ = m.publish(Message::Ring, 0);
    m.link_mut().up = true;
    m.poll(40_000, &mut sink);

    assert!(m.mqtt().payloads_on("doorbell").is_empty());
    assert!(sink.events.contains(&AppEvent::HeldRingExpired { age_ms: 40_000 }));
    assert!(!m.has_held_ring());
}

#[test]
fn rejected_ring_is_retried_on_next_poll() {
    let mut m = manager(MockLink::up(), MockMqtt::new());
    let mut sink = RecordingSink::new();
    m.poll(0, &mut sink);

    m.mqtt_mut().fail_publishes = true;
    assert_eq!(m.publish(Message::Ring, 100), Err(PublishError::Rejected));
    assert!(m.has_held_ring());

    m.mqtt_mut().fail_publishes = false;
    m.poll(150, &mut sink);
    assert_eq!(m.mqtt().payloads_on("doorbell"), vec!["dingdong"]);
    assert!(sink.events.contains(&AppEvent::HeldRingDelivered { age_ms: 50 }));
}

#[test]
fn stats_carry_link_rssi() {
    let mut m = manager(MockLink::up(), MockMqtt::new());
    let mut sink = RecordingSink::new();
    m.poll(0, &mut sink);
    assert_eq!(m.stats().rssi, Some(-58));

    m.link_mut().up = false;
    assert_eq!(m.stats().rssi, None);
}
