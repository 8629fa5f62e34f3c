//! Smart Garden firmware main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  ZoneBank          LogEventSink   ConfigStore<NvsRegion>       │
//! │  (Valve+Moisture)  (EventSink)    (ConfigPort)                 │
//! │  MqttLink          Esp32Time      Esp32Device   WifiAdapter    │
//! │  (PublishPort)     (ClockPort)    (DevicePort)                 │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Safety sweep · Sequencer FSM · Schedule               │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler (control 10 s · telemetry 5 min · online ping)      │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One cooperative loop: drain inbound commands, then run whatever
//! cadence is due.  Commands never overlap a control tick.
#![deny(unused_must_use)]

use anyhow::{Context, Result};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::AnyIOPin;
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::sntp::EspSntp;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{debug, error, info, warn};

use smartgarden::adapters::device::Esp32Device;
use smartgarden::adapters::hardware::ZoneBank;
use smartgarden::adapters::log_sink::LogEventSink;
use smartgarden::adapters::mqtt::{MqttLink, SessionWatch, announce_online};
use smartgarden::adapters::nvs::NvsRegion;
use smartgarden::adapters::time::Esp32TimeAdapter;
use smartgarden::adapters::wifi::WifiAdapter;
use smartgarden::app::ports::{ClockPort, DevicePort};
use smartgarden::app::service::AppService;
use smartgarden::config_store::{CONFIG_REGION_SIZE, ConfigStore};
use smartgarden::pins;
use smartgarden::rpc::channels;
use smartgarden::rpc::engine::{CommandDispatcher, DispatchPorts};
use smartgarden::scheduler::Scheduler;
use smartgarden::telemetry::TelemetryReporter;

/// Idle time between loop passes.
const LOOP_PERIOD_MS: u32 = 100;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Smart Garden v{}                 ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let region = NvsRegion::open(CONFIG_REGION_SIZE).unwrap_or_else(|e| {
        warn!("NVS open failed ({}), starting from a blank region", e);
        NvsRegion::new(CONFIG_REGION_SIZE)
    });
    let mut store = ConfigStore::new(region);
    let config = store.seed();

    // ── 3. I/O expander ───────────────────────────────────────
    let peripherals = Peripherals::take().context("peripherals already taken")?;
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        unsafe { AnyIOPin::new(pins::I2C_SDA_GPIO) },
        unsafe { AnyIOPin::new(pins::I2C_SCL_GPIO) },
        &I2cConfig::new().baudrate(Hertz(pins::I2C_BAUDRATE_HZ)),
    )
    .context("I2C init failed")?;

    let mut zones = match ZoneBank::discover(i2c) {
        Ok(z) => z,
        Err(e) => {
            // Nothing can be watered without the expander.
            error!("Expander: {}, halting", e);
            loop {
                FreeRtos::delay_ms(1_000);
            }
        }
    };

    // ── 4. Network ────────────────────────────────────────────
    let mut clock = Esp32TimeAdapter::new(config.utc_offset_secs);
    let sysloop = EspSystemEventLoop::take()?;
    let esp_wifi = EspWifi::new(peripherals.modem, sysloop.clone(), None)?;
    let mut wifi = WifiAdapter::new(BlockingWifi::wrap(esp_wifi, sysloop)?);
    if let Err(e) = wifi.connect(&config, clock.uptime_ms()) {
        warn!("WiFi: {} (will keep retrying)", e);
    }

    let _sntp = EspSntp::new_default().context("failed to start SNTP")?;
    info!("SNTP started");

    let mut mqtt = MqttLink::connect(&config).context("MQTT client init failed")?;
    let mut session_watch = SessionWatch::new();

    // ── 5. Application core ───────────────────────────────────
    let mut sink = LogEventSink::new();
    let mut app = AppService::new(config);
    app.start(&mut sink);

    let mut dispatcher = CommandDispatcher::new();
    let mut telemetry = TelemetryReporter::new();
    let mut scheduler = Scheduler::new(clock.uptime_ms());
    let mut device = Esp32Device::new();

    info!("System ready. Entering main loop.");

    // ── 6. Main loop ──────────────────────────────────────────
    loop {
        let now = clock.uptime_ms();

        wifi.poll(now);
        if session_watch.poll(mqtt.link()) {
            if let Err(e) = mqtt.subscribe_commands() {
                warn!("MQTT: subscribe failed: {}", e);
            }
            scheduler.on_connected(now);
        }

        // Transport step: every queued command runs to completion here.
        while let Some(msg) = channels::dequeue() {
            let mut ports = DispatchPorts {
                hw: &mut zones,
                config: &mut store,
                publisher: &mut mqtt,
                device: &mut device,
                clock: &clock,
            };
            // Rejections are already logged by the dispatcher.
            if let Err(e) = dispatcher.handle(&msg.payload, &mut app, &mut ports, &mut sink) {
                debug!("Loop: command not applied: {}", e);
            }
        }
        clock.set_utc_offset(app.config().utc_offset_secs);

        let due = scheduler.poll(now);
        if due.control {
            app.tick(&mut zones, &clock, &mut sink);
        }
        if due.telemetry {
            if let Err(e) = telemetry.report(&app, &mut zones, &mut mqtt, &mut sink) {
                warn!("Telemetry: publish failed: {}", e);
            }
        }
        if due.online_ping {
            announce_online(&mut mqtt);
        }

        device.feed_watchdog();
        FreeRtos::delay_ms(LOOP_PERIOD_MS);
    }
}
