//! Airwatch Firmware: Main Entry Point
//!
//! Hexagonal architecture around one cooperative scheduler loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter    UartChannel    LogEventSink   NvsAdapter   │
//! │  (Sensor+Actuator+  (ByteChannel)  (EventSink)    (Config)     │
//! │   Display+Notifier)                                            │
//! │  WifiAdapter        HTTP server ──▶ channels ──▶ CommandSource │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Co2Driver · PeriodicPoller · AlertPolicy · Display    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::cell::RefCell;

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::rmt::TxRmtDriver;
use esp_idf_hal::rmt::config::TransmitConfig;
use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use embedded_hal_bus::i2c::RefCellDevice;
use log::{error, info};

use airwatch::adapters::display::OledPanel;
use airwatch::adapters::hardware::HardwareAdapter;
use airwatch::adapters::log_sink::LogEventSink;
use airwatch::adapters::notify::{self, HttpNotifier};
use airwatch::adapters::nvs::{NvsAdapter, load_or_default};
use airwatch::adapters::time::SystemClock;
use airwatch::adapters::uart::UartChannel;
use airwatch::adapters::web;
use airwatch::adapters::wifi::{RetryPolicy, WifiAdapter, build_credentials};
use airwatch::app::ports::DisplayPort;
use airwatch::app::service::AppService;
use airwatch::channels::{self, ChannelCommandSource};
use airwatch::config::SystemConfig;
use airwatch::display::DisplayFrame;
use airwatch::drivers::led::OnboardLed;
use airwatch::drivers::relay::Relay;
use airwatch::drivers::watchdog::Watchdog;
use airwatch::drivers::ws2812::Ws2812;
use airwatch::drivers::hw_init;
use airwatch::pins;
use airwatch::sensors::SensorHub;
use airwatch::sensors::battery::BatterySensor;
use airwatch::sensors::climate::ClimateSensor;

/// Park forever after an unrecoverable bring-up failure.
fn halt() -> ! {
    loop {
        FreeRtos::delay_ms(1_000);
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Airwatch v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    if let Err(e) = hw_init::init_peripherals() {
        error!("HAL init failed: {}, halting", e);
        halt();
    }

    // ── 2. Config from NVS (or defaults) ──────────────────────
    let nvs = NvsAdapter::new()
        .inspect_err(|e| log::warn!("NVS init failed ({}), running with defaults", e))
        .ok();
    let config = nvs.as_ref().map_or_else(SystemConfig::default, load_or_default);

    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;

    // CO2 sensor on UART1 (TX=GPIO21, RX=GPIO20).
    let uart = UartDriver::new(
        peripherals.uart1,
        peripherals.pins.gpio21,
        peripherals.pins.gpio20,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(pins::CO2_UART_BAUD)),
    )?;
    info!("UART1 up at {} baud (TX={}, RX={})", pins::CO2_UART_BAUD, pins::CO2_UART_TX_GPIO, pins::CO2_UART_RX_GPIO);

    // Shared I²C bus (SDA=GPIO5, SCL=GPIO6): SHT4x + SSD1306.
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio5,
        peripherals.pins.gpio6,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_FREQ_HZ)),
    )?;
    let bus: &'static RefCell<I2cDriver<'static>> = Box::leak(Box::new(RefCell::new(i2c)));

    // WS2812 data on GPIO7.
    let rmt = TxRmtDriver::new(
        peripherals.rmt.channel0,
        peripherals.pins.gpio7,
        &TransmitConfig::new().clock_divider(1),
    )?;

    let mut panel = OledPanel::new(RefCellDevice::new(bus));
    panel.render(&DisplayFrame::splash("Connecting", "WiFi..."));

    // ── 4. WiFi (bounded retry, fatal on failure) ─────────────
    let mut wifi = WifiAdapter::new(BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), None)?,
        sysloop,
    )?);
    let (ssid, pass) = build_credentials();
    let connected = wifi.set_credentials(ssid, pass).and_then(|()| {
        wifi.connect_with_retry(RetryPolicy::new(config.wifi_max_attempts), FreeRtos::delay_ms)
    });
    let ip = match connected {
        Ok(ip) => ip,
        Err(e) => {
            error!("WiFi bring-up failed: {}", e);
            panel.render(&DisplayFrame::splash("WiFi FAIL", "Check serial"));
            halt();
        }
    };

    // ── 5. Web server ─────────────────────────────────────────
    let _server = web::start_server(nvs)?;

    // ── 6. Adapters + application service ─────────────────────
    let sensors = SensorHub::new(
        ClimateSensor::new(RefCellDevice::new(bus), FreeRtos),
        BatterySensor::new(pins::BATTERY_ADC_CHANNEL),
    );
    let mut hw = HardwareAdapter::new(
        sensors,
        OnboardLed::new(),
        Relay::new(),
        Ws2812::new(rmt),
        panel,
        HttpNotifier::new(notify::topic_url(), &config.device_name)
            .with_timeout_ms(config.notify_timeout_ms),
    );
    let mut sink = LogEventSink::new();
    let mut commands = ChannelCommandSource;
    let clock = SystemClock::new();
    let idle_ms = config.loop_idle_ms;
    // Subscribed only after WiFi: association retries outlast the budget.
    let mut watchdog = Watchdog::for_loop(&config);

    let mut app = AppService::new(config, UartChannel::new(uart), clock.now_ms());
    app.set_status_line(&ip);
    app.start(clock.now_ms(), &mut hw, &mut sink);
    app.announce_online(&ip, &mut hw);
    channels::publish(app.device_state());

    // ── 7. Scheduler loop ─────────────────────────────────────
    info!("Entering scheduler loop (idle {} ms)", idle_ms);
    loop {
        app.tick(clock.now_ms(), &mut commands, &mut hw, &mut sink);
        channels::publish(app.device_state());
        watchdog.feed(clock.now_ms(), app.pass_count());
        FreeRtos::delay_ms(idle_ms);
    }
}
