use approx::assert_abs_diff_eq;

use super::{FlightSimulator, init_logger};
use crate::{
    AnyWindEstimator, FlightStateComputer, WindEkfGlue, WindEstimator, WindResult, WindZigZag,
    blackboard::{DerivedInfo, NmeaInfo},
    units::{bearing_delta, mps_to_kmh},
};

const WIND_SPEED: f32 = 20.0 / 3.6;
const WIND_FROM: f32 = 270.0;
const TRUE_AIRSPEED: f32 = 100.0 / 3.6;

fn assert_wind(result: &WindResult, kmh_tolerance: f32, degree_tolerance: f32) {
    assert!(result.is_valid(), "{:?}", result);
    assert_abs_diff_eq!(mps_to_kmh(result.wind.norm), 20.0, epsilon = kmh_tolerance);
    assert!(
        bearing_delta(WIND_FROM, result.wind.bearing).abs() < degree_tolerance,
        "bearing {}",
        result.wind.bearing
    );
}

/// Feeds a sample and returns the last valid result seen so far.
fn feed(
    estimator: &mut impl WindEstimator,
    last: &mut Option<WindResult>,
    sample: &(NmeaInfo, DerivedInfo),
) -> WindResult {
    let result = estimator.update(&sample.0, &sample.1);
    if result.is_valid() {
        *last = Some(result);
    }
    result
}

fn update_with(estimator: &mut impl WindEstimator, sample: (NmeaInfo, DerivedInfo)) -> WindResult {
    estimator.update(&sample.0, &sample.1)
}

#[test]
fn ekf_converges_within_120_samples() {
    init_logger();
    let mut sim = FlightSimulator::new(WIND_SPEED, WIND_FROM, TRUE_AIRSPEED);
    let mut ekf = WindEkfGlue::default();
    let mut last = None;

    for i in 0..120u32 {
        let heading = ((i * 37) % 360) as f32;
        feed(&mut ekf, &mut last, &sim.straight(heading));
    }

    let last = last.unwrap();
    assert!(last.quality >= 2);
    assert_abs_diff_eq!(last.wind.norm, WIND_SPEED, epsilon = 0.05 * WIND_SPEED);
    assert!(bearing_delta(WIND_FROM, last.wind.bearing).abs() < 5.0);
}

#[test]
fn circle_then_straight_legs() {
    init_logger();
    let mut sim = FlightSimulator::new(WIND_SPEED, WIND_FROM, TRUE_AIRSPEED);
    let mut ekf = AnyWindEstimator::Ekf(WindEkfGlue::default());
    let mut zigzag = AnyWindEstimator::ZigZag(WindZigZag::default());
    let mut last_ekf = None;
    let mut last_zigzag = None;

    for i in 0..20 {
        let sample = sim.circling(i as f32 * 18.0);
        feed(&mut ekf, &mut last_ekf, &sample);
        feed(&mut zigzag, &mut last_zigzag, &sample);
    }

    let after_circle = last_ekf.unwrap();
    assert_wind(&after_circle, 2.0, 5.0);
    let after_circle = last_zigzag.unwrap();
    assert_wind(&after_circle, 2.0, 5.0);
    // circling halves the zigzag quality
    assert!(after_circle.quality <= 2);

    for leg in 0..10 {
        let heading = (leg * 50 + 25) as f32;
        for _ in 0..10 {
            let sample = sim.straight(heading);
            feed(&mut ekf, &mut last_ekf, &sample);
            feed(&mut zigzag, &mut last_zigzag, &sample);
        }
    }

    let ekf_result = last_ekf.unwrap();
    assert_wind(&ekf_result, 1.0, 5.0);
    assert!(ekf_result.quality >= 3);
    let zigzag_result = last_zigzag.unwrap();
    assert_wind(&zigzag_result, 1.0, 2.0);
    assert!(zigzag_result.quality >= 3);
}

#[test]
fn g_load_blackout_suppresses_updates() {
    init_logger();
    let mut sim = FlightSimulator::new(WIND_SPEED, WIND_FROM, TRUE_AIRSPEED);
    let mut ekf = WindEkfGlue::default();

    let mut last_quality = 0;
    for i in 0..30u32 {
        let result = update_with(&mut ekf, sim.straight((i * 23 % 360) as f32));
        if result.is_valid() {
            last_quality = result.quality;
        }
    }
    assert_eq!(ekf.sample_count(), 30);

    let (mut basic, derived) = sim.straight(0.0);
    basic.acceleration.g_load = 1.5;
    assert_eq!(ekf.update(&basic, &derived).quality, 0);

    let blackout_start = sim.clock();
    while sim.clock() + 1.0 < blackout_start + 3.0 {
        let result = update_with(&mut ekf, sim.straight(45.0));
        assert_eq!(result.quality, 0);
    }
    assert_eq!(ekf.sample_count(), 30);

    let mut resumed = None;
    for i in 0..10u32 {
        let result = update_with(&mut ekf, sim.straight((i * 41 % 360) as f32));
        if result.is_valid() {
            resumed = Some(result);
        }
    }
    assert_eq!(ekf.sample_count(), 40);
    assert!(resumed.unwrap().quality >= last_quality);
}

#[test]
fn reset_is_idempotent() {
    let mut sim = FlightSimulator::new(WIND_SPEED, WIND_FROM, TRUE_AIRSPEED);
    let warmup: Vec<_> = (0..25).map(|i| sim.straight(i as f32 * 29.0)).collect();
    let after: Vec<_> = (0..60).map(|i| sim.straight(i as f32 * 31.0)).collect();

    let makers: [fn() -> AnyWindEstimator; 2] = [
        || AnyWindEstimator::Ekf(WindEkfGlue::default()),
        || AnyWindEstimator::ZigZag(WindZigZag::default()),
    ];
    for make in makers {
        let mut once = make();
        let mut twice = make();
        for (basic, derived) in &warmup {
            once.update(basic, derived);
            twice.update(basic, derived);
        }

        once.reset();
        twice.reset();
        twice.reset();

        for (basic, derived) in &after {
            assert_eq!(once.update(basic, derived), twice.update(basic, derived));
        }
    }
}

#[test]
fn derived_flags_from_flight_state_computer() {
    init_logger();
    let mut sim = FlightSimulator::new(WIND_SPEED, WIND_FROM, TRUE_AIRSPEED);
    let mut computer = FlightStateComputer::new();
    let mut ekf = WindEkfGlue::default();
    let mut derived = DerivedInfo::default();
    let mut last = None;

    for i in 0..300u32 {
        let heading = ((i / 10) * 70 % 360) as f32;
        let (basic, _) = sim.straight(heading);
        computer.update(&basic, &mut derived);
        let result = ekf.update(&basic, &derived);
        if result.is_valid() {
            last = Some(result);
        }
    }

    assert!(derived.flight.flying);
    assert!(!derived.circling);
    assert_wind(&last.unwrap(), 1.0, 5.0);
}
