//! Doorbell Publisher — Main Entry Point
//!
//! Hexagonal architecture with a deadline-driven control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   WifiAdapter   MqttAdapter    │
//! │  (SensorPort)      (EventSink)    (LinkPort)    (MqttPort)     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌──────────────────────────┐   ┌──────────────────────────┐   │
//! │  │ DoorbellService          │──▶│ ConnectivityManager      │   │
//! │  │ EdgeDetector · stats     │   │ (Publisher) session ·    │   │
//! │  └──────────────────────────┘   │ heartbeat · backoff      │   │
//! │                                 └──────────────────────────┘   │
//! │  Scheduler (delegate-driven) ──▶ EventQueue ──▶ dispatch       │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::EspWifi;
use log::{info, warn, LevelFilter};

use doorbell::adapters::hardware::HardwareAdapter;
use doorbell::adapters::log_sink::LogEventSink;
use doorbell::adapters::mqtt::MqttAdapter;
use doorbell::adapters::time::Esp32TimeAdapter;
use doorbell::adapters::wifi::{self, WifiAdapter};
use doorbell::app::events::LoopStats;
use doorbell::app::ports::{SchedulerDelegate, TaskKind};
use doorbell::app::service::DoorbellService;
use doorbell::config::DoorbellConfig;
use doorbell::connectivity::ConnectivityManager;
use doorbell::error::Error;
use doorbell::events::{Event, EventQueue};
use doorbell::scheduler::Scheduler;
use doorbell::sensors::BellSensor;
use doorbell::drivers::hw_timer;
use doorbell::{drivers, pins};

/// Upper bound on one wait, so the slower tasks still run if the sample
/// timer stops.
const IDLE_WAIT_LIMIT_MS: u32 = 50;

// ── Scheduler delegate ────────────────────────────────────────
//
// Bridges the scheduler (which knows nothing about the event system)
// to the loop's event queue.

struct EventQueueDelegate<'a> {
    queue: &'a mut EventQueue,
}

impl SchedulerDelegate for EventQueueDelegate<'_> {
    fn on_task_due(&mut self, task: TaskKind) {
        let event = match task {
            TaskKind::Sample => Event::SampleTick,
            TaskKind::LinkPoll => Event::LinkPoll,
            TaskKind::StatsReport => Event::StatsReport,
        };
        self.queue.push(event);
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_sys::link_patches();
    esp_idf_logger::init()?;

    // ── 2. Configuration ──────────────────────────────────────
    let config = DoorbellConfig::from_build_env().map_err(Error::from)?;
    log::set_max_level(if config.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });

    info!("╔══════════════════════════════════════╗");
    info!("║  Doorbell Publisher v{}           ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");
    info!(
        "Broker {} as '{}', console {} baud",
        config.broker_url(),
        config.broker.client_id,
        config.serial_baud
    );

    // ── 3. Hardware ───────────────────────────────────────────
    drivers::hw_init::init_peripherals()?;
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // ── 4. Adapters ───────────────────────────────────────────
    let mut wifi = WifiAdapter::new(EspWifi::new(peripherals.modem, sysloop, Some(nvs))?);
    match wifi::env_credentials() {
        Some((ssid, password)) => wifi.set_credentials(ssid, password).map_err(Error::from)?,
        None => warn!("WiFi: no credentials baked in (set WIFI_SSID / WIFI_PASS)"),
    }
    let mqtt = MqttAdapter::new(config.broker.clone());
    let mut link = ConnectivityManager::new(wifi, mqtt, &config);
    if let Err(e) = link.start() {
        warn!("WiFi: {}", e);
    }

    let mut hw = HardwareAdapter::new(BellSensor::new(pins::BELL_ADC_CHANNEL));
    let mut log_sink = LogEventSink::new();

    // ── 5. App service + tick source ──────────────────────────
    let mut app = DoorbellService::new(&config);
    app.start(&mut log_sink);

    let clock = Esp32TimeAdapter::new();
    let mut sched = Scheduler::from_config(&config, clock.uptime_ms());
    let mut queue = EventQueue::new();

    // Sampling is paced by the esp_timer; the scheduler keeps the slower tasks.
    sched.set_enabled(TaskKind::Sample, false, clock.uptime_ms());
    hw_timer::start_sample_timer(config.timing.sample_interval_ms)?;
    let mut samples_skipped: u32 = 0;

    info!("System ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    loop {
        // Sleeps until the next sample tick; the idle task and the IDF
        // tasks (WiFi, MQTT) run meanwhile.
        hw_timer::wait_for_tick(IDLE_WAIT_LIMIT_MS);

        if let Some(skipped) = hw_timer::SAMPLE_TICKS.take_due() {
            samples_skipped = samples_skipped.saturating_add(skipped);
            queue.push(Event::SampleTick);
        }
        sched.tick(clock.uptime_ms(), &mut EventQueueDelegate { queue: &mut queue });

        while let Some(event) = queue.pop() {
            let now_ms = clock.uptime_ms();
            match event {
                Event::SampleTick => {
                    app.on_sample(&mut hw, &mut link, &mut log_sink, now_ms);
                }
                Event::LinkPoll => link.poll(now_ms, &mut log_sink),
                Event::StatsReport => {
                    let loop_stats = LoopStats {
                        scheduler_overruns: sched.overruns().saturating_add(samples_skipped),
                        events_dropped: queue.dropped(),
                    };
                    app.report(&mut log_sink, &link.stats(), loop_stats);
                }
            }
        }
    }
}
