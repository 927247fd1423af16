//! Measurement tick tests: smoothing, compensation and publication

use ph_meter::{
    acquisition::{MuxAdcSource, NativeAdcSource},
    hal::{MockAdc, MockAnalogPin, MockSensor, MockText, MockThermometer},
    AdcChannel, CalibrationAction, FixedTemperature, MeterConfig, Outputs, PhMeter, ProbeStatus,
    SensorTemperature, TemperatureProvider, TemperatureUnit, TickOutcome, VoltageSource,
};

fn full_outputs() -> Outputs<MockSensor, MockText> {
    Outputs::new(MockSensor::new())
        .with_raw_voltage(MockSensor::new())
        .with_slope(MockSensor::new())
        .with_temperature(MockSensor::new())
        .with_status(MockText::new())
}

fn mux_meter<P: TemperatureProvider>(
    config: MeterConfig,
    mv: f32,
    temperature: P,
) -> PhMeter<MuxAdcSource<MockAdc>, P, MockSensor, MockText> {
    let mut adc = MockAdc::new();
    adc.set_channel_mv(AdcChannel::A2, mv);
    PhMeter::new(
        &config,
        MuxAdcSource::new(adc, AdcChannel::A2),
        temperature,
        full_outputs(),
    )
    .unwrap()
}

// ============================================================================
// Publication
// ============================================================================

#[test]
fn neutral_voltage_reads_ph7() {
    let mut meter = mux_meter(MeterConfig::default(), 199.3, FixedTemperature::default());
    meter.tick(0);

    let out = meter.outputs();
    assert_eq!(out.ph.last(), Some(7.0));
    assert_eq!(out.raw_voltage.as_ref().unwrap().last(), Some(199.3));
    assert_eq!(out.slope.as_ref().unwrap().last(), Some(59.16));
    assert_eq!(out.temperature.as_ref().unwrap().last(), Some(25.0));
    assert_eq!(out.status.as_ref().unwrap().last(), Some("normal"));
}

#[test]
fn values_are_rounded_per_output() {
    let mut meter = mux_meter(MeterConfig::default(), 123.456, FixedTemperature(21.37));
    meter.tick(0);

    let out = meter.outputs();
    assert_eq!(out.raw_voltage.as_ref().unwrap().last(), Some(123.5));
    assert_eq!(out.temperature.as_ref().unwrap().last(), Some(21.4));

    let ph = out.ph.last().unwrap();
    assert_eq!(ph, (ph * 100.0).round() / 100.0);
}

#[test]
fn only_configured_outputs_publish() {
    let mut adc = MockAdc::new();
    adc.set_channel_mv(AdcChannel::A0, 199.3);
    let outputs: Outputs<MockSensor, MockText> = Outputs::new(MockSensor::new());
    let mut meter = PhMeter::new(
        &MeterConfig::default(),
        MuxAdcSource::new(adc, AdcChannel::A0),
        FixedTemperature::default(),
        outputs,
    )
    .unwrap();

    meter.tick(0);

    let out = meter.outputs();
    assert_eq!(out.ph.values, [7.0]);
    assert!(out.raw_voltage.is_none());
    assert!(out.slope.is_none());
    assert!(out.temperature.is_none());
    assert!(out.status.is_none());
}

#[test]
fn fahrenheit_temperature_output() {
    let config = MeterConfig::default().with_temperature_unit(TemperatureUnit::Fahrenheit);
    let mut meter = mux_meter(config, 199.3, FixedTemperature(25.0));
    meter.tick(0);

    assert_eq!(
        meter.outputs().temperature.as_ref().unwrap().last(),
        Some(77.0)
    );
    assert_eq!(meter.state().temperature_unit, TemperatureUnit::Fahrenheit);
}

// ============================================================================
// Calibration Scenario
// ============================================================================

#[test]
fn two_point_calibration_midpoint_reads_5_5() {
    let mut meter = mux_meter(MeterConfig::default(), 199.3, FixedTemperature::default());
    meter.set_calibration_mode(true, 0);
    meter.dispatch(CalibrationAction::CalibratePh7, 0).unwrap();

    meter
        .source_mut()
        .adc_mut()
        .set_channel_mv(AdcChannel::A2, 354.8);
    meter.dispatch(CalibrationAction::CalibratePh4, 0).unwrap();

    // Bursts did not touch the tick window; first tick sees only 277.05
    meter
        .source_mut()
        .adc_mut()
        .set_channel_mv(AdcChannel::A2, 277.05);
    meter.tick(0);

    assert_eq!(meter.outputs().ph.last(), Some(5.5));
    assert_eq!(meter.outputs().slope.as_ref().unwrap().last(), Some(51.83));
}

// ============================================================================
// Smoothing and Compensation
// ============================================================================

#[test]
fn rolling_average_across_ticks() {
    let config = MeterConfig::default().with_smoothing_window(2);
    let mut meter = mux_meter(config, 100.0, FixedTemperature::default());

    meter.tick(0);
    meter
        .source_mut()
        .adc_mut()
        .set_channel_mv(AdcChannel::A2, 200.0);
    let outcome = meter.tick(10_000);

    let reading = outcome.reading().unwrap();
    assert_eq!(reading.raw_mv, 200.0);
    assert_eq!(reading.averaged_mv, 150.0);
    // Raw voltage output is the unsmoothed sample
    assert_eq!(meter.outputs().raw_voltage.as_ref().unwrap().last(), Some(200.0));
}

#[test]
fn warmer_solution_has_steeper_slope() {
    let mut meter = mux_meter(MeterConfig::default(), 199.3, FixedTemperature(50.0));
    let reading = *meter.tick(0).reading().unwrap();

    // 59.16 * 323.15 / 298.15
    assert!((reading.slope_mv_per_ph - 64.12).abs() < 0.01);
    // At the intercept the slope does not matter
    assert!((reading.ph - 7.0).abs() < 1e-4);
}

#[test]
fn temperature_sensor_falls_back_until_reading() {
    let sensor = SensorTemperature::new(MockThermometer::new());
    let mut meter = mux_meter(MeterConfig::default(), 199.3, sensor);

    meter.tick(0);
    assert_eq!(meter.state().temperature, Some(25.0));

    meter.temperature_mut().sensor_mut().set(18.0);
    meter.tick(10_000);
    assert_eq!(meter.state().temperature, Some(18.0));
}

#[test]
fn absolute_zero_sensor_reading_uses_fallback() {
    let sensor = SensorTemperature::new(MockThermometer::new());
    let mut meter = mux_meter(MeterConfig::default(), 258.46, sensor);
    meter.temperature_mut().sensor_mut().set(-273.15);

    let reading = *meter.tick(0).reading().unwrap();

    assert_eq!(reading.temperature_c, 25.0);
    assert_eq!(meter.outputs().ph.last(), Some(6.0));
    assert_eq!(meter.outputs().slope.as_ref().unwrap().last(), Some(59.16));
}

#[test]
fn ph_smoothing_follows_slowly() {
    let config = MeterConfig::default()
        .with_smoothing_window(1)
        .with_ph_smoothing(0.5);
    let mut meter = mux_meter(config, 199.3, FixedTemperature::default());
    meter.tick(0);

    // pH 4 at factory coefficients
    meter
        .source_mut()
        .adc_mut()
        .set_channel_mv(AdcChannel::A2, 376.78);
    meter.tick(10_000);

    assert_eq!(meter.outputs().ph.last(), Some(5.5));
}

// ============================================================================
// Failed Ticks
// ============================================================================

#[test]
fn failed_tick_publishes_nothing_then_resumes() {
    let mut meter = mux_meter(MeterConfig::default(), 199.3, FixedTemperature::default());
    meter.source_mut().adc_mut().fail_next(1);

    let outcome = meter.tick(0);
    assert!(matches!(outcome, TickOutcome::Skipped(_)));
    assert!(meter.outputs().ph.values.is_empty());
    assert!(meter.outputs().status.as_ref().unwrap().texts.is_empty());
    assert_eq!(meter.state().ph, None);

    meter.tick(10_000);
    assert_eq!(meter.outputs().ph.values, [7.0]);
}

#[test]
fn failed_tick_keeps_last_state() {
    let mut meter = mux_meter(MeterConfig::default(), 199.3, FixedTemperature::default());
    meter.tick(0);
    meter.source_mut().adc_mut().fail_next(1);
    meter.tick(10_000);

    assert_eq!(meter.state().ph, Some(7.0));
    assert_eq!(meter.outputs().ph.values.len(), 1);
}

// ============================================================================
// Native Pin Input
// ============================================================================

#[test]
fn native_pin_source_scales_counts() {
    // 3300 mV reference, 12 bits: 248 counts is about 199.8 mV
    let pin = MockAnalogPin::new(34).with_raw(248);
    let mut source = NativeAdcSource::new(pin);
    let mv = source.read_mv().unwrap();
    assert!((mv - 199.85).abs() < 0.1);

    let mut meter = PhMeter::new(
        &MeterConfig::default(),
        source,
        FixedTemperature::default(),
        full_outputs(),
    )
    .unwrap();
    meter.tick(0);
    assert_eq!(
        meter.outputs().status.as_ref().unwrap().last(),
        Some(ProbeStatus::Normal.as_str())
    );
}
