//! Unit conversions and angle helpers. Everything inside the crate is SI:
//! metres, metres per second, pascal, degrees for bearings.

pub const METERS_PER_NAUTICAL_MILE: f32 = 1852.0;
pub const KNOTS_TO_MPS: f32 = METERS_PER_NAUTICAL_MILE / 3600.0;
pub const KMH_TO_MPS: f32 = 1.0 / 3.6;
pub const FEET_TO_METERS: f32 = 0.3048;

#[inline]
pub fn knots_to_mps(knots: f32) -> f32 {
    knots * KNOTS_TO_MPS
}

#[inline]
pub fn mps_to_knots(mps: f32) -> f32 {
    mps / KNOTS_TO_MPS
}

#[inline]
pub fn kmh_to_mps(kmh: f32) -> f32 {
    kmh * KMH_TO_MPS
}

#[inline]
pub fn mps_to_kmh(mps: f32) -> f32 {
    mps * 3.6
}

/// One flight level is 100 ft.
#[inline]
pub fn flight_level_to_meters(flight_level: f32) -> f32 {
    flight_level * 100.0 * FEET_TO_METERS
}

#[inline]
pub fn hectopascal_to_pascal(hpa: f32) -> f32 {
    hpa * 100.0
}

/// Maps any finite angle in degrees onto `[0, 360)`.
pub fn normalize_bearing(degrees: f32) -> f32 {
    let mut b = degrees % 360.0;
    if b < 0.0 {
        b += 360.0;
    }
    // -1e-7 % 360 + 360 rounds to exactly 360 in f32
    if b >= 360.0 { 0.0 } else { b }
}

/// Signed shortest difference between two bearings, in `(-180, 180]`.
pub fn bearing_delta(from: f32, to: f32) -> f32 {
    let d = normalize_bearing(to - from);
    if d > 180.0 { d - 360.0 } else { d }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn knots_are_converted_exactly_enough() {
        assert!((knots_to_mps(1.0) - 0.514444).abs() < 1e-6);
        assert_relative_eq!(mps_to_knots(knots_to_mps(37.0)), 37.0, epsilon = 1e-4);
    }

    #[test]
    fn kmh_and_flight_level() {
        assert_relative_eq!(kmh_to_mps(36.0), 10.0, epsilon = 1e-5);
        assert_relative_eq!(mps_to_kmh(10.0), 36.0, epsilon = 1e-5);
        assert_relative_eq!(flight_level_to_meters(1.0), 30.48, epsilon = 1e-4);
        assert_relative_eq!(hectopascal_to_pascal(1013.25), 101325.0, epsilon = 1e-2);
    }

    #[test]
    fn bearings_wrap_into_range() {
        assert_relative_eq!(normalize_bearing(-90.0), 270.0);
        assert_relative_eq!(normalize_bearing(720.0), 0.0);
        assert_relative_eq!(normalize_bearing(359.5), 359.5);
        assert!(normalize_bearing(-1e-7) < 360.0);
    }

    #[test]
    fn bearing_delta_takes_the_short_way() {
        assert_relative_eq!(bearing_delta(350.0, 10.0), 20.0, epsilon = 1e-4);
        assert_relative_eq!(bearing_delta(10.0, 350.0), -20.0, epsilon = 1e-4);
        assert_relative_eq!(bearing_delta(0.0, 180.0), 180.0, epsilon = 1e-4);
    }
}
