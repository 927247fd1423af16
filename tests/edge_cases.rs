//! Edge case and boundary condition tests for the pH meter

use ph_meter::{
    acquisition::MuxAdcSource,
    hal::{MockAdc, MockSensor, MockText},
    AdcChannel, AnySource, BufferSolutions, CalibrationAction, ConfigurationError, Error,
    FixedTemperature, InputConfig, InputRange, MeterConfig, Outputs, PhMeter, ProbeHealthMonitor,
    ProbeStatus,
};

type TestMeter = PhMeter<MuxAdcSource<MockAdc>, FixedTemperature, MockSensor, MockText>;

fn meter(config: MeterConfig, mv: f32) -> TestMeter {
    let mut adc = MockAdc::new();
    adc.set_channel_mv(AdcChannel::A0, mv);
    PhMeter::new(
        &config,
        MuxAdcSource::new(adc, AdcChannel::A0),
        FixedTemperature::default(),
        Outputs::new(MockSensor::new()).with_status(MockText::new()),
    )
    .unwrap()
}

fn set_mv(meter: &mut TestMeter, mv: f32) {
    meter
        .source_mut()
        .adc_mut()
        .set_channel_mv(AdcChannel::A0, mv);
}

fn statuses(meter: &TestMeter) -> Vec<String> {
    meter.outputs().status.as_ref().unwrap().texts.clone()
}

// ============================================================================
// Probe Health
// ============================================================================

#[test]
fn ph_above_14_is_out_of_range() {
    // pH 14.5 at factory coefficients
    let mut meter = meter(MeterConfig::default(), -244.4);
    meter.tick(0);

    assert_eq!(statuses(&meter), ["out_of_range"]);
    // Published unclamped
    assert!(meter.outputs().ph.last().unwrap() > 14.0);
}

#[test]
fn ph_below_0_is_out_of_range() {
    let mut meter = meter(MeterConfig::default(), 650.0);
    meter.tick(0);

    assert_eq!(meter.state().status, ProbeStatus::OutOfRange);
    assert!(meter.outputs().ph.last().unwrap() < 0.0);
}

#[test]
fn ph_at_bounds_is_normal() {
    let mut monitor = ProbeHealthMonitor::default();
    let range = InputRange::bipolar(4096.0);
    assert_eq!(monitor.record_reading(500.0, range, 0.0), ProbeStatus::Normal);
    assert_eq!(monitor.record_reading(500.0, range, 14.0), ProbeStatus::Normal);
}

#[test]
fn rail_reading_debounced_to_disconnected() {
    let config = MeterConfig::default().with_smoothing_window(1);
    let mut meter = meter(config, 4095.0);

    meter.tick(0);
    meter.tick(10_000);
    assert_ne!(meter.state().status, ProbeStatus::Disconnected);

    meter.tick(20_000);
    assert_eq!(
        statuses(&meter),
        ["out_of_range", "out_of_range", "disconnected"]
    );
}

#[test]
fn negative_rail_counts_toward_disconnect() {
    let config = MeterConfig::default().with_smoothing_window(1);
    let mut meter = meter(config, -4095.0);

    for t in 0..3 {
        meter.tick(t * 10_000);
    }
    assert_eq!(meter.state().status, ProbeStatus::Disconnected);
}

#[test]
fn steady_reading_near_zero_stays_normal() {
    // pH 10.34 at factory coefficients, mid-range for a signed converter
    let mut meter = meter(MeterConfig::default(), 2.0);

    for t in 0..5 {
        meter.tick(t * 10_000);
    }
    assert_eq!(statuses(&meter), ["normal"; 5]);
    assert_eq!(meter.pipeline().monitor().consecutive_faults(), 0);
}

#[test]
fn good_reading_clears_disconnect() {
    let config = MeterConfig::default().with_smoothing_window(1);
    let mut meter = meter(config, -4095.0);
    for t in 0..3 {
        meter.tick(t * 10_000);
    }

    set_mv(&mut meter, 199.3);
    meter.tick(30_000);

    assert_eq!(meter.state().status, ProbeStatus::Normal);
    assert_eq!(meter.pipeline().monitor().consecutive_faults(), 0);
}

#[test]
fn interrupted_rail_run_restarts_count() {
    let config = MeterConfig::default().with_smoothing_window(1);
    let mut meter = meter(config, -4095.0);

    meter.tick(0);
    meter.tick(10_000);
    set_mv(&mut meter, 199.3);
    meter.tick(20_000);
    set_mv(&mut meter, -4095.0);
    meter.tick(30_000);
    meter.tick(40_000);

    assert_ne!(meter.state().status, ProbeStatus::Disconnected);
}

#[test]
fn bus_errors_reach_disconnected() {
    let mut meter = meter(MeterConfig::default(), 199.3);
    meter.source_mut().adc_mut().fail_next(3);

    for t in 0..3 {
        meter.tick(t * 10_000);
    }

    assert_eq!(meter.state().status, ProbeStatus::Disconnected);
    assert!(statuses(&meter).is_empty());
}

#[test]
fn debounce_of_zero_acts_as_one() {
    let config = MeterConfig::default().with_disconnect_debounce(0);
    let mut meter = meter(config, 199.3);
    meter.source_mut().adc_mut().fail_next(1);
    meter.tick(0);

    assert_eq!(meter.state().status, ProbeStatus::Disconnected);
}

// ============================================================================
// Calibration Mode Gating
// ============================================================================

#[test]
fn stage_capture_refused_without_mode() {
    let mut meter = meter(MeterConfig::default(), 199.3);

    for action in [
        CalibrationAction::CalibratePh4,
        CalibrationAction::CalibratePh7,
        CalibrationAction::CalibratePh10,
    ] {
        assert_eq!(
            meter.dispatch(action, 0),
            Err(Error::Configuration(
                ConfigurationError::CalibrationModeInactive
            ))
        );
    }
    assert_eq!(meter.state().points, 0);
    // Refused actions do not read the probe
    assert_eq!(meter.source().adc().reads, 0);
}

#[test]
fn calibration_mode_expires() {
    let config = MeterConfig::default().with_calibration_timeout_ms(1_000);
    let mut meter = meter(config, 199.3);
    meter.set_calibration_mode(true, 0);

    assert!(meter.dispatch(CalibrationAction::CalibratePh7, 999).is_ok());
    assert!(meter.dispatch(CalibrationAction::CalibratePh7, 1_000).is_err());
    assert!(!meter.calibration_mode());
}

#[test]
fn zero_timeout_never_expires() {
    let config = MeterConfig::default().with_calibration_timeout_ms(0);
    let mut meter = meter(config, 199.3);
    meter.set_calibration_mode(true, 0);

    meter.poll(u64::MAX / 2);
    assert!(meter.calibration_mode());
}

#[test]
fn unknown_action_names_refused() {
    let mut meter = meter(MeterConfig::default(), 199.3);
    meter.set_calibration_mode(true, 0);

    for name in ["", "calibrate_ph5", "CALIBRATE", "reset"] {
        assert_eq!(
            meter.dispatch_name(name, 0),
            Err(Error::Configuration(ConfigurationError::UnknownAction))
        );
    }
    assert!(meter.dispatch_name(" calibrate_ph7 ", 0).is_ok());
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn invalid_configs_refused() {
    let cases = [
        (
            MeterConfig::default().with_update_interval_ms(0),
            ConfigurationError::InvalidInterval,
        ),
        (
            MeterConfig::default().with_smoothing_window(0),
            ConfigurationError::InvalidSmoothingWindow,
        ),
        (
            MeterConfig::default().with_smoothing_window(17),
            ConfigurationError::InvalidSmoothingWindow,
        ),
        (
            MeterConfig::default().with_buffers(BufferSolutions::new(7.0, 7.0, 10.0)),
            ConfigurationError::DuplicateBufferValues,
        ),
        (
            MeterConfig::default().with_buffers(BufferSolutions::new(4.0, 7.0, 15.0)),
            ConfigurationError::BufferOutOfRange,
        ),
        (
            MeterConfig::default().with_input(InputConfig::multiplexed(4)),
            ConfigurationError::InvalidChannel(4),
        ),
    ];

    for (config, expected) in cases {
        let result = PhMeter::new(
            &config,
            MuxAdcSource::new(MockAdc::new(), AdcChannel::A0),
            FixedTemperature::default(),
            Outputs::<MockSensor, MockText>::new(MockSensor::new()),
        );
        assert_eq!(result.err(), Some(expected));
    }
}

#[test]
fn any_source_rejects_mismatched_input() {
    let native = InputConfig::native_pin(34);
    let result = AnySource::<MockAdc, ph_meter::hal::MockAnalogPin>::multiplexed(
        MockAdc::new(),
        &native,
    );
    assert_eq!(result.err(), Some(ConfigurationError::InputModeMismatch));

    let result = AnySource::<MockAdc, _>::native(ph_meter::hal::MockAnalogPin::new(3), &native);
    assert_eq!(
        result.err(),
        Some(ConfigurationError::PinMismatch {
            configured: 34,
            actual: 3
        })
    );
}

// ============================================================================
// Polling
// ============================================================================

#[test]
fn poll_at_interval_boundary() {
    let mut meter = meter(MeterConfig::default(), 199.3);

    assert!(meter.poll(5).is_some());
    assert!(meter.poll(10_004).is_none());
    assert!(meter.poll(10_005).is_some());
}

#[test]
fn clock_going_backwards_does_not_tick() {
    let mut meter = meter(MeterConfig::default(), 199.3);
    meter.poll(50_000);
    assert!(meter.poll(0).is_none());
}
