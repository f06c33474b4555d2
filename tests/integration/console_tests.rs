//! Console output of the service and the connectivity manager when wired
//! to the serial [`LogEventSink`]: each application event is printed once.

use std::cell::RefCell;
use std::sync::Once;

use log::{Level, LevelFilter, Log, Metadata, Record};

use doorbell::adapters::log_sink::LogEventSink;
use doorbell::app::service::DoorbellService;
use doorbell::config::DoorbellConfig;
use doorbell::connectivity::ConnectivityManager;

use super::mock_hw::{MockLink, MockMqtt, MockSensor};

thread_local! {
    static LINES: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Collects info-and-above lines per test thread.
struct Capture;

impl Log for Capture {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            LINES.with(|l| l.borrow_mut().push(record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture;
static INSTALL: Once = Once::new();

fn capture() {
    INSTALL.call_once(|| {
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(LevelFilter::Info);
    });
    LINES.with(|l| l.borrow_mut().clear());
}

fn lines() -> Vec<String> {
    LINES.with(|l| l.borrow().clone())
}

fn count(needle: &str) -> usize {
    lines().iter().filter(|l| l.contains(needle)).count()
}

#[test]
fn link_and_session_events_print_once() {
    capture();
    let config = DoorbellConfig::default();
    let mut link = ConnectivityManager::new(MockLink::up(), MockMqtt::new(), &config);
    let mut sink = LogEventSink::new();

    link.poll(0, &mut sink);
    assert!(link.is_session_up());

    assert_eq!(count("up, rssi"), 1);
    assert_eq!(count("established"), 1);

    link.link_mut().up = false;
    link.poll(50, &mut sink);
    assert_eq!(count("down"), 1);
    assert_eq!(count("session lost"), 1);
}

#[test]
fn ring_prints_once() {
    capture();
    let config = DoorbellConfig::default();
    let mut app = DoorbellService::new(&config);
    let mut sensor = MockSensor::new();
    let mut link = ConnectivityManager::new(MockLink::up(), MockMqtt::new(), &config);
    let mut sink = LogEventSink::new();
    link.poll(0, &mut sink);

    sensor.push(50.0, 15);
    let before = lines().len();
    for i in 0..15 {
        app.on_sample(&mut sensor, &mut link, &mut sink, i * 3);
    }

    assert_eq!(app.rings(), 1);
    assert_eq!(lines()[before..], ["RING  | #1 at 42ms".to_string()]);
}

#[test]
fn stalled_broker_prints_once() {
    capture();
    let config = DoorbellConfig::default();
    let mut mqtt = MockMqtt::new();
    mqtt.slow_connect = true;
    let mut link = ConnectivityManager::new(MockLink::up(), mqtt, &config);
    let mut sink = LogEventSink::new();

    link.poll(0, &mut sink);
    link.poll(10_000, &mut sink);

    assert_eq!(count("session not established"), 1);
    assert_eq!(link.stats().connect_failures, 1);
}
