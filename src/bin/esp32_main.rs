//! ESP32-C3 SuperMini pH meter.
//!
//! Reads the probe on GPIO3 and logs pH, voltage, slope, temperature and
//! probe status every update interval.
//!
//! Calibration is driven from the serial console, one command per line:
//!
//! ```text
//! mode on
//! calibrate_ph7
//! calibrate_ph4
//! calibrate_ph10
//! reset_calibration
//! mode off
//! ```
//!
//! # Build
//!
//! ```bash
//! cargo build --release --features esp32 --bin esp32_main
//! espflash flash --monitor target/riscv32imc-esp-espidf/release/esp32_main
//! ```

use esp_idf_hal::adc::oneshot::AdcDriver;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::log::EspLogger;
use ph_meter::hal::esp32::{adc, Esp32AnalogPin, Esp32Clock};
use ph_meter::hal::LogSink;
use ph_meter::traits::Clock;
use ph_meter::{
    CalibrationAction, Config, FixedTemperature, MeterConfig, NativeAdcSource, Outputs, PhMeter,
    TickOutcome,
};
use std::io::BufRead;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Main loop interval in milliseconds
const LOOP_INTERVAL_MS: u64 = 50;

/// A line typed on the serial console.
enum ConsoleCommand {
    Mode(bool),
    Action(CalibrationAction),
}

fn parse_console(line: &str) -> Option<ConsoleCommand> {
    let line = line.trim();
    match line.strip_prefix("mode") {
        Some(rest) => match rest.trim() {
            "on" => Some(ConsoleCommand::Mode(true)),
            "off" => Some(ConsoleCommand::Mode(false)),
            _ => None,
        },
        None => CalibrationAction::from_name(line)
            .ok()
            .map(ConsoleCommand::Action),
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_hal::sys::link_patches();
    EspLogger::initialize_default();

    log::info!("ph-meter starting");

    // =========================================================================
    // Configuration
    // =========================================================================
    let config =
        Config::default().with_meter(MeterConfig::default().with_input(adc::PROBE_INPUT));
    config.meter.validate()?;

    let peripherals = Peripherals::take()?;

    // =========================================================================
    // Initialize Probe Input (ADC1 on GPIO3)
    // =========================================================================
    let adc1 = AdcDriver::new(peripherals.adc1)?;
    let pin = Esp32AnalogPin::new(&adc1, peripherals.pins.gpio3)?;
    let source = NativeAdcSource::from_config(pin, &config.meter.input)?;
    log::info!("probe input initialized: {:?}", config.meter.input);

    // =========================================================================
    // Initialize Meter
    // =========================================================================
    let outputs = Outputs::new(LogSink::new("ph"))
        .with_raw_voltage(LogSink::new("voltage_mv"))
        .with_slope(LogSink::new("slope_mv_per_ph"))
        .with_temperature(LogSink::new("temperature"))
        .with_status(LogSink::new("status"));

    let temperature = FixedTemperature(config.meter.default_temperature_c);
    let mut meter = PhMeter::new(&config.meter, source, temperature, outputs)?;
    let clock = Esp32Clock::new();

    // =========================================================================
    // Serial Console
    // =========================================================================
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines().map_while(Result::ok) {
            match parse_console(&line) {
                Some(cmd) => {
                    if tx.send(cmd).is_err() {
                        break;
                    }
                }
                None => log::warn!("unknown command: {}", line.trim()),
            }
        }
    });

    log::info!(
        "measuring every {} ms",
        config.meter.update_interval_ms
    );

    // =========================================================================
    // Main Loop
    // =========================================================================
    loop {
        let now = clock.now_ms();

        while let Ok(cmd) = rx.try_recv() {
            match cmd {
                ConsoleCommand::Mode(enabled) => meter.set_calibration_mode(enabled, now),
                ConsoleCommand::Action(action) => match meter.dispatch(action, now) {
                    Ok(c) => log::info!(
                        "{} ok: slope {:.2} mV/pH, intercept {:.1} mV",
                        action,
                        c.slope_mv_per_ph,
                        c.intercept_mv
                    ),
                    Err(e) => log::warn!("{} failed: {}", action, e),
                },
            }
        }

        if let Some(TickOutcome::Skipped(e)) = meter.poll(now) {
            log::warn!("tick skipped: {}", e);
        }

        thread::sleep(Duration::from_millis(LOOP_INTERVAL_MS));
    }
}
