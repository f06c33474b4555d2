//! Integration tests for the DoorbellService → EdgeDetector → Publisher
//! chain, using the real ConnectivityManager over mock ports.

use doorbell::app::events::{AppEvent, LoopStats};
use doorbell::app::service::DoorbellService;
use doorbell::config::DoorbellConfig;
use doorbell::connectivity::ConnectivityManager;
use doorbell::detector::{Detection, DetectorState};
use doorbell::error::SensorError;

use super::mock_hw::{MockLink, MockMqtt, MockSensor, RecordingSink};

type Manager = ConnectivityManager<MockLink, MockMqtt>;

struct Rig {
    app: DoorbellService,
    sensor: MockSensor,
    link: Manager,
    sink: RecordingSink,
    now_ms: u64,
}

impl Rig {
    fn online() -> Self {
        Self::with_link(MockLink::up())
    }

    fn with_link(link: MockLink) -> Self {
        let config = DoorbellConfig::default();
        let mut rig = Self {
            app: DoorbellService::new(&config),
            sensor: MockSensor::new(),
            link: ConnectivityManager::new(link, MockMqtt::new(), &config),
            sink: RecordingSink::new(),
            now_ms: 0,
        };
        rig.app.start(&mut rig.sink);
        rig.link.poll(0, &mut rig.sink);
        rig
    }

    /// Feed `n` samples of `value`, 3 ms apart.  Returns rings detected.
    fn feed(&mut self, value: f32, n: usize) -> usize {
        self.sensor.push(value, n);
        let mut rings = 0;
        for _ in 0..n {
            self.now_ms += 3;
            let d = self
                .app
                .on_sample(&mut self.sensor, &mut self.link, &mut self.sink, self.now_ms);
            if d == Detection::Ring {
                rings += 1;
            }
        }
        rings
    }

    fn dingdongs(&self) -> usize {
        self.link.mqtt().count("doorbell", "dingdong")
    }
}

#[test]
fn start_emits_started() {
    let rig = Rig::online();
    assert_eq!(rig.sink.events.first(), Some(&AppEvent::Started));
}

#[test]
fn sustained_signal_fires_once_and_enters_cooldown() {
    let mut rig = Rig::online();

    assert_eq!(rig.feed(50.0, 15), 1);
    assert_eq!(rig.dingdongs(), 1);
    assert_eq!(
        rig.app.detector_state(),
        DetectorState {
            streak: 0,
            cooldown: 800
        }
    );

    // 799 more qualifying samples: all swallowed by cooldown.
    assert_eq!(rig.feed(50.0, 799), 0);
    assert_eq!(rig.app.detector_state().cooldown, 1);

    // The 800th consumes the last cooldown sample and re-arms.
    assert_eq!(rig.feed(50.0, 1), 0);
    assert_eq!(rig.app.detector_state(), DetectorState::REST);
    assert!(rig.app.is_armed());

    // The next one starts a new streak.
    assert_eq!(rig.feed(50.0, 1), 0);
    assert_eq!(rig.app.detector_state().streak, 1);
    assert_eq!(rig.dingdongs(), 1);
}

#[test]
fn fourteen_then_low_resets_streak_without_event() {
    let mut rig = Rig::online();

    assert_eq!(rig.feed(40.0, 14), 0);
    assert_eq!(rig.app.detector_state().streak, 14);
    assert_eq!(rig.feed(39.9, 1), 0);

    assert_eq!(rig.app.detector_state(), DetectorState::REST);
    assert_eq!(rig.dingdongs(), 0);
    assert_eq!(rig.sink.rings(), 0);
}

#[test]
fn long_press_still_fires_once_per_cooldown_cycle() {
    let mut rig = Rig::online();

    // 15 to fire + 800 cooldown + 15 to fire again.
    assert_eq!(rig.feed(60.0, 830), 2);
    assert_eq!(rig.dingdongs(), 2);
    assert_eq!(rig.app.rings(), 2);
}

#[test]
fn sensor_error_skips_tick_without_breaking_streak() {
    let mut rig = Rig::online();

    assert_eq!(rig.feed(50.0, 7), 0);
    rig.sensor.push_error(SensorError::AdcReadFailed(263));
    rig.now_ms += 3;
    let d = rig
        .app
        .on_sample(&mut rig.sensor, &mut rig.link, &mut rig.sink, rig.now_ms);
    assert_eq!(d, Detection::Idle);
    assert_eq!(rig.app.detector_state().streak, 7);

    assert_eq!(rig.feed(50.0, 8), 1);
    assert_eq!(rig.app.sensor_failures(), 1);
    assert_eq!(rig.app.samples(), 15);
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::SensorFailed(SensorError::AdcReadFailed(263)))
    );
}

#[test]
fn ring_while_offline_is_deferred_then_delivered() {
    let mut rig = Rig::with_link(MockLink::down());

    assert_eq!(rig.feed(50.0, 15), 1);
    assert_eq!(rig.app.rings_deferred(), 1);
    assert_eq!(rig.dingdongs(), 0);

    rig.link.link_mut().up = true;
    rig.link.poll(rig.now_ms + 50, &mut rig.sink);
    assert_eq!(rig.dingdongs(), 1);
    assert_eq!(rig.link.mqtt().payloads_on("doorbell_connection"), vec!["connected"]);
}

#[test]
fn report_snapshot_reflects_all_counters() {
    let mut rig = Rig::online();
    rig.feed(50.0, 15);
    rig.link.poll(5_000, &mut rig.sink);

    let snap = rig.app.report(
        &mut rig.sink,
        &rig.link.stats(),
        LoopStats {
            scheduler_overruns: 0,
            events_dropped: 0,
        },
    );

    assert_eq!(snap.samples, 15);
    assert_eq!(snap.rings, 1);
    assert_eq!(snap.rings_deferred, 0);
    assert_eq!(snap.sessions, 1);
    assert_eq!(snap.heartbeats, 1);
    assert_eq!(snap.rssi, Some(-58));
    assert_eq!(rig.sink.events.last(), Some(&AppEvent::Stats(snap)));
}
